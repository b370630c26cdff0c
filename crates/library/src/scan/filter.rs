use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use treesnap_storage::BackendHandle;

/// Accept/reject predicate built from gitignore-style rules.
///
/// Paths are root-relative. A path is rejected when it, or any directory above
/// it, matches a rule (negations with `!` work as they do in git).
pub struct IgnoreFilter {
    matcher: Gitignore,
}

impl IgnoreFilter {
    /// A filter with no rules; accepts everything.
    pub fn empty() -> Self {
        Self { matcher: Gitignore::empty() }
    }

    /// Build from the raw text of an ignore file. Lines that fail to parse are
    /// logged and skipped rather than invalidating the whole file.
    pub fn from_rules(rules: &str) -> Self {
        let mut builder = GitignoreBuilder::new("");
        for line in rules.lines() {
            if let Err(e) = builder.add_line(None, line) {
                tracing::warn!(rule = line, error = %e, "Skipping unparseable ignore rule");
            }
        }
        match builder.build() {
            Ok(matcher) => Self { matcher },
            Err(e) => {
                tracing::warn!(error = %e, "Ignore rules could not be compiled; ignoring none");
                Self::empty()
            },
        }
    }

    /// Load the rules in `file_name` at the backend root.
    ///
    /// Never fails: a missing or unreadable ignore file simply means there are
    /// no additional rules.
    pub async fn load(backend: &BackendHandle, file_name: &str) -> Self {
        match backend.read(Path::new(file_name)).await {
            Ok(bytes) => Self::from_rules(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::debug!(backend = backend.name(), file = file_name, error = ?e, "No ignore rules loaded");
                Self::empty()
            },
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        !self.matcher.matched_path_or_any_parents(path, false).is_ignore()
    }

    /// Like [`accepts()`](Self::accepts) for a directory, so that
    /// directory-only rules such as `node_modules/` apply.
    pub fn accepts_dir(&self, path: &Path) -> bool {
        !self.matcher.matched_path_or_any_parents(path, true).is_ignore()
    }
}
