use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Component, Path, PathBuf};

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// A compiled glob pattern, matched against root-relative paths.
///
/// `*` and `?` never cross a `/`; `**` spans any number of directories.
/// Hidden entries (path components starting with `.`) are invisible to
/// wildcards: a hidden component only matches when the pattern has a segment
/// that itself starts with `.` and matches that name. So `.config/*` sees
/// `.config/app.toml` but not `.config/.secret`, and `**/.*` sees dot-files at
/// any depth.
#[derive(Debug, Clone)]
pub struct Pattern {
    glob: String,
    matcher: GlobMatcher,
    hidden: Vec<GlobMatcher>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = pattern.strip_prefix("./").unwrap_or(pattern).to_string();
        let matcher = compile(&glob).or_raise(|| ErrorKind::Pattern(pattern.to_string()))?;
        // A segment that only compiles as part of the whole glob (a brace
        // group spanning `/`) can't name a hidden entry on its own.
        let hidden = glob
            .split('/')
            .filter(|segment| segment.starts_with('.') && *segment != "." && *segment != "..")
            .filter_map(|segment| compile(segment).ok())
            .collect();
        Ok(Self { glob, matcher, hidden })
    }

    /// Whether hidden files and directories can match at all.
    pub fn admits_hidden(&self) -> bool {
        !self.hidden.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.visible(path) && self.matcher.is_match(path)
    }

    /// Whether anything below the directory `dir` could be visible to this
    /// pattern. Hidden directories the pattern doesn't name are not.
    pub fn may_enter(&self, dir: &Path) -> bool {
        self.visible(dir)
    }

    fn visible(&self, path: &Path) -> bool {
        path.components().all(|component| match component {
            Component::Normal(name) if name.as_encoded_bytes().first() == Some(&b'.') => {
                self.hidden.iter().any(|segment| segment.is_match(name))
            },
            _ => true,
        })
    }

    /// The leading directories of the pattern that contain no glob syntax.
    /// Every match lives below this prefix, so a walk can start there.
    ///
    /// `src/**/*.rs` gives `src`, `*.txt` gives nothing.
    pub fn literal_prefix(&self) -> Option<PathBuf> {
        let mut segments: Vec<&str> = self.glob.split('/').collect();
        // The last segment names files, not a directory to walk.
        segments.pop();
        let prefix: PathBuf = segments
            .into_iter()
            .take_while(|segment| !segment.contains(GLOB_META))
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        match prefix.as_os_str().is_empty() {
            true => None,
            false => Some(prefix),
        }
    }
}

fn compile(glob: &str) -> std::result::Result<GlobMatcher, globset::Error> {
    let glob = GlobBuilder::new(glob).literal_separator(true).backslash_escape(true).build()?;
    Ok(glob.compile_matcher())
}
