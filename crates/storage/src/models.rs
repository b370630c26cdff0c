//! Snapshot models.
//!
//! [`FileMeta`] is what a backend knows about a file without reading it.
//! Hashing its content turns it into a [`FileDescriptor`], the immutable
//! point-in-time record that listings are built from.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::PathBuf;
use time::UtcDateTime;

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileMeta {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Last modified timestamp as milliseconds since the Unix epoch.
    pub fn modified_millis(&self) -> i64 {
        // Saturates; an i64 of milliseconds covers every date `time` can represent.
        i64::try_from(self.modified.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }

    /// Attach a content hash, producing the descriptor for this file.
    ///
    /// Fails with [`InvalidPath`](crate::error::ErrorKind::InvalidPath) when
    /// the path has no exact UTF-8 form.
    pub fn with_hash(self, hash: impl Into<String>) -> Result<FileDescriptor> {
        Ok(FileDescriptor {
            path: crate::to_slash(&self.path)?,
            content_hash: hash.into(),
            modified: self.modified_millis(),
        })
    }
}

/// One regular file as observed at scan time.
///
/// Serializes as `{"path": .., "md5": .., "mtime": ..}` so that listings
/// cached to disk stay readable by tools expecting that shape; the `md5` key
/// carries whatever digest produced the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Forward-slash path relative to the scan root.
    pub path: String,
    /// Hex digest of the full content. Empty means "not computed".
    #[serde(rename = "md5", default)]
    pub content_hash: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "mtime")]
    pub modified: i64,
}
impl FileDescriptor {
    pub fn new(path: impl Into<String>, content_hash: impl Into<String>, modified: i64) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            modified,
        }
    }

    /// Content equality. A missing hash never equals anything, not even
    /// another missing hash.
    pub fn same_content(&self, other: &FileDescriptor) -> bool {
        !self.content_hash.is_empty() && self.content_hash == other.content_hash
    }
}

/// An unordered set of [`FileDescriptor`]s; one side of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(Vec<FileDescriptor>);
impl Listing {
    /// Sort by path. Scans complete in arbitrary order; this gives callers a
    /// stable order for display and comparison.
    pub fn sorted(mut self) -> Self {
        self.0.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }
}
impl Deref for Listing {
    type Target = [FileDescriptor];
    fn deref(&self) -> &[FileDescriptor] {
        &self.0
    }
}
impl From<Vec<FileDescriptor>> for Listing {
    fn from(files: Vec<FileDescriptor>) -> Self {
        Self(files)
    }
}
impl FromIterator<FileDescriptor> for Listing {
    fn from_iter<I: IntoIterator<Item = FileDescriptor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl Extend<FileDescriptor> for Listing {
    fn extend<I: IntoIterator<Item = FileDescriptor>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}
impl IntoIterator for Listing {
    type Item = FileDescriptor;
    type IntoIter = std::vec::IntoIter<FileDescriptor>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl<'a> IntoIterator for &'a Listing {
    type Item = &'a FileDescriptor;
    type IntoIter = std::slice::Iter<'a, FileDescriptor>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("h1", "h1", true)]
    #[case("h1", "h2", false)]
    #[case("", "", false)]
    #[case("", "h1", false)]
    #[case("h1", "", false)]
    fn test_same_content(#[case] left: &str, #[case] right: &str, #[case] expected: bool) {
        let a = FileDescriptor::new("a", left, 1);
        let b = FileDescriptor::new("a", right, 1);
        assert_eq!(a.same_content(&b), expected);
    }

    #[test]
    fn test_with_hash_uses_forward_slashes_and_millis() {
        let modified = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let meta = FileMeta::new(PathBuf::from("dir").join("sub").join("file.txt"), 3, modified);
        let descriptor = meta.with_hash("abc").unwrap();
        assert_eq!(descriptor.path, "dir/sub/file.txt");
        assert_eq!(descriptor.content_hash, "abc");
        assert_eq!(descriptor.modified, 1_700_000_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn test_with_hash_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let meta = FileMeta::new(OsStr::from_bytes(b"caf\xe9.txt"), 1, UtcDateTime::from_unix_timestamp(0).unwrap());
        let err = meta.with_hash("abc").unwrap_err();
        assert!(matches!(&*err, crate::error::ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_serialize_shape() {
        let descriptor = FileDescriptor::new("path/to/file", "d41d8cd98f00b204e9800998ecf8427e", 1234567890);
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"path":"path/to/file","md5":"d41d8cd98f00b204e9800998ecf8427e","mtime":1234567890}"#);
    }

    #[test]
    fn test_deserialize_missing_hash() {
        let listing: Listing = serde_json::from_str(r#"[{"path":"a","mtime":5}]"#).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].content_hash, "");
        assert_eq!(listing[0].modified, 5);
    }

    #[test]
    fn test_listing_sorted() {
        let listing: Listing =
            [FileDescriptor::new("b", "", 0), FileDescriptor::new("a", "", 0)].into_iter().collect();
        let paths: Vec<_> = listing.sorted().iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, ["a", "b"]);
    }
}
