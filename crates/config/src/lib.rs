//! Layered configuration for treesnap.
//!
//! Values are merged in increasing order of precedence:
//!
//! 1. built-in defaults,
//! 2. a config file (TOML, YAML or JSON, chosen by extension), either given
//!    explicitly or found in the platform config directory,
//! 3. environment variables prefixed with `TREESNAP_`, e.g.
//!    `TREESNAP_CONCURRENCY=8`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{ResultExt, bail};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use treesnap_library::{DEFAULT_CONCURRENCY, DEFAULT_IGNORE_FILE, Pattern, ScanOptions};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "TREESNAP_";
/// File name looked up in the platform config directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Glob used when none is configured.
pub const DEFAULT_PATTERN: &str = "**/*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob selecting which files are scanned, relative to the scan root.
    pub pattern: String,
    /// Ignore-rules file looked up at the scan root.
    pub ignore_file: String,
    /// Maximum number of files hashed or copied at the same time.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// With `path`, that file must exist. Without it, the platform default
    /// (see [`Config::default_path`]) is used if present and skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) if !path.is_file() => bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = merge_file(figment, path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => figment = merge_file(figment, &path)?,
                Some(path) => tracing::debug!(path = %path.display(), "No config file, using defaults"),
                None => tracing::debug!("No config directory for this platform"),
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// `$XDG_CONFIG_HOME/treesnap/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "treesnap").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.ignore_file.trim().is_empty() {
            bail!(ErrorKind::Invalid("ignore_file must not be empty".to_string()));
        }
        Pattern::new(&self.pattern).or_raise(|| ErrorKind::Invalid(format!("bad pattern {:?}", self.pattern)))?;
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
            .with_ignore_file(self.ignore_file.clone())
            .with_concurrency(self.concurrency)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let figment = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(path = %path.display(), "Merged config file");
    Ok(figment)
}
