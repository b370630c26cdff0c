//! Path validation and normalization.
//!
//! Every path handed to a [`StorageBackend`](crate::StorageBackend) is
//! relative to the backend root and must never escape it.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a relative storage path.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes on Unix, non-UTF8 bytes,
/// >           or platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use treesnap_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("src/main.rs").is_ok());
/// assert!(validate_path("a/../file.txt").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././correct//./file.txt/").unwrap(),
///     Path::new("correct/file.txt")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Render a relative path with forward-slash separators regardless of
/// platform, the form used for [`FileDescriptor::path`](crate::FileDescriptor).
///
/// A listing path has to name the file it was scanned from, so a component
/// that isn't valid UTF-8 is an [`InvalidPath`](ErrorKind::InvalidPath)
/// rather than being replaced lossily.
///
/// ```
/// use std::path::Path;
/// use treesnap_storage::to_slash;
/// assert_eq!(to_slash(Path::new("a/b/c.txt")).unwrap(), "a/b/c.txt");
/// ```
pub fn to_slash(path: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        if let Component::Normal(s) = component {
            let Some(segment) = s.to_str() else {
                exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
            };
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("src/main.rs", "src/main.rs")]
    #[case("a/b/c/file.txt", "a/b/c/file.txt")]
    #[case("simple.txt", "simple.txt")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    #[case("dir/", "dir")]
    #[case("dir///", "dir")]
    fn test_valid_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(Path::new(input)).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("../..")]
    #[case("a\0b")]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    fn test_invalid_paths(#[case] input: &str) {
        assert!(validate(Path::new(input)).is_err());
    }

    #[cfg(windows)]
    #[test]
    fn test_backslash_normalization() {
        assert_eq!(to_slash(&validate(Path::new("a\\b\\c")).unwrap()).unwrap(), "a/b/c");
    }

    #[test]
    fn test_to_slash_drops_non_normal_components() {
        assert_eq!(to_slash(Path::new("./a/b.txt")).unwrap(), "a/b.txt");
        assert_eq!(to_slash(Path::new("nested/dir/file")).unwrap(), "nested/dir/file");
    }

    #[cfg(unix)]
    #[test]
    fn test_to_slash_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let path = Path::new("dir").join(OsStr::from_bytes(b"bad\xff.txt"));
        let err = to_slash(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(p) if *p == path));
    }
}
