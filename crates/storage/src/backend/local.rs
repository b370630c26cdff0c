//! Local filesystem storage backend.
//!
//! Files live in a configured directory and are accessed using standard
//! filesystem operations via `tokio::fs` for async I/O.

use crate::backend::{BoxSyncRead, BoxSyncWrite, DirFilter, FileMetaStream};
use crate::error::ErrorKind;
use crate::{FileMeta, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileMeta),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use treesnap_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/path/to/project")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a backend over an existing (or not yet existing) directory.
    ///
    /// Nothing is created on disk; listing a root that doesn't exist yields
    /// no files.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() && !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Same as [`new()`](Self::new), but creates the root directory if it is
    /// missing. Used for targets that are about to be written into.
    pub fn create(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let backend = Self::new(name, root)?;
        if !backend.root.exists() {
            // Use non-async here; it only happens once per backend and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&backend.root).map_err(|e| ErrorKind::io(e, &backend.root))?;
            tracing::debug!(backend = %backend.name, root = %backend.root.display(), "Created storage root");
        }
        Ok(backend)
    }

    /// Get the absolute path for a relative storage path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    /// Re-use same data collection from file metadata for both list and stat functions
    fn metadata(path: &Path, metadata: Metadata) -> Result<FileMeta> {
        let modified = metadata.modified().map_err(|e| ErrorKind::io(e, path))?.into();
        Ok(FileMeta::new(path, metadata.len(), modified))
    }

    /// Keeps the walk loop free of error plumbing: every failure here is
    /// yielded by the caller and the walk moves on.
    async fn process_entry(
        &self,
        entry: DirEntry,
        prefix: Option<&Path>,
        filter: Option<DirFilter<'_>>,
    ) -> Result<WalkEntry> {
        let path = entry.path();
        let relative = self.relative_path(&path)?;
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
            && !pfx.starts_with(&relative)
        {
            return Ok(WalkEntry::Skip);
        }
        let mut metadata = entry.metadata().await.map_err(|e| ErrorKind::io(e, &relative))?;
        if metadata.is_symlink() {
            // Follow links to files. Links to directories are not descended
            // into so that a cycle can't turn the walk infinite.
            metadata = match fs::metadata(&path).await {
                Ok(target) if target.is_file() => target,
                _ => {
                    tracing::trace!(path = %relative.display(), "Skipping symlink");
                    return Ok(WalkEntry::Skip);
                },
            };
        }
        if metadata.is_dir() {
            if filter.is_some_and(|enter| !enter(&relative)) {
                tracing::trace!(path = %relative.display(), "Pruned directory");
                return Ok(WalkEntry::Skip);
            }
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() && prefix.is_none_or(|pfx| relative.starts_with(pfx)) {
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        // Sockets, fifos, broken symlinks, or a file above the prefix.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn walk<'a>(&'a self, prefix: Option<&'a Path>, filter: Option<DirFilter<'a>>) -> FileMetaStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A directory that doesn't exist lists as empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::io(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(ErrorKind::io(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref(), filter).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::io(e, path))?;
        }
        let file = fs::File::create(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| ErrorKind::io(e, path))?;
        Self::metadata(&validate_path(path)?, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::{Read, Write};

    fn backend(dir: &tempfile::TempDir) -> LocalBackend {
        LocalBackend::new("test", dir.path()).unwrap()
    }

    fn write(dir: &tempfile::TempDir, path: &str, data: &[u8]) {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "file.txt", b"data");
        assert!(LocalBackend::new("name", temp_dir.path().join("file.txt")).is_err());
    }

    #[test]
    fn test_new_does_not_create_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("missing");
        LocalBackend::new("name", &root).unwrap();
        assert!(!root.exists());
        LocalBackend::create("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = backend(&temp_dir);
        let expected = temp_dir.path().join("src/main.rs");
        assert_eq!(backend.absolute_path(Path::new("src/main.rs")).unwrap(), expected);
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
    }

    #[test]
    fn test_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = backend(&temp_dir);
        let abs = temp_dir.path().join("src/main.rs");
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("src/main.rs"));
        assert!(backend.relative_path(Path::new("/other/file.txt")).is_err());
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(backend(&temp_dir).list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path().join("missing")).unwrap();
        assert!(backend.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_files_not_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "a.txt", b"a");
        write(&temp_dir, "dir/b.txt", b"bb");
        write(&temp_dir, "dir/nested/c.txt", b"ccc");
        std::fs::create_dir_all(temp_dir.path().join("empty")).unwrap();
        let mut files = backend(&temp_dir).list(None).await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("a.txt"), PathBuf::from("dir/b.txt"), PathBuf::from("dir/nested/c.txt")]);
        assert_eq!(files[2].size, 3);
    }

    #[tokio::test]
    async fn test_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "src/sub/file.rs", b"data");
        write(&temp_dir, "src/subdir/file.rs", b"data");
        write(&temp_dir, "src/subfile.rs", b"data");
        write(&temp_dir, "top.rs", b"data");
        let mut files = backend(&temp_dir).list(Some(Path::new("src/sub"))).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.pop().unwrap().path, Path::new("src/sub/file.rs"));
    }

    #[tokio::test]
    async fn test_list_nonexistent_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "a.txt", b"a");
        let files = backend(&temp_dir).list(Some(Path::new("nonexistent/"))).await.unwrap();
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_follows_file_symlinks_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "real/file.txt", b"data");
        std::os::unix::fs::symlink(temp_dir.path().join("real/file.txt"), temp_dir.path().join("link.txt")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("real"), temp_dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), temp_dir.path().join("broken")).unwrap();
        let mut files = backend(&temp_dir).list(None).await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("link.txt"), PathBuf::from("real/file.txt")]);
    }

    /// Nests directories until the innermost path is longer than the OS will
    /// accept, so reading it fails even with root privileges. Built in three
    /// pieces because creating it in one go would hit the same limit.
    #[cfg(unix)]
    fn unreadable_tree(dir: &Path) {
        let chain: PathBuf = std::iter::repeat_n("d".repeat(200), 8).collect();
        for part in ["c", "b", "a"] {
            std::fs::create_dir_all(dir.join(part).join(&chain)).unwrap();
        }
        std::fs::rename(dir.join("c"), dir.join("b").join(&chain).join("c")).unwrap();
        std::fs::rename(dir.join("b"), dir.join("a").join(&chain).join("b")).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_never_reads_filtered_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "keep.txt", b"keep");
        write(&temp_dir, "src/lib.rs", b"lib");
        let vendor = temp_dir.path().join("src/vendor");
        std::fs::create_dir_all(&vendor).unwrap();
        unreadable_tree(&vendor);
        let backend = backend(&temp_dir);

        assert!(backend.list(None).await.is_err());

        let skip_vendor = |dir: &Path| dir != Path::new("src/vendor");
        let mut files: Vec<FileMeta> = backend.walk(None, Some(&skip_vendor)).try_collect().await.unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("keep.txt"), PathBuf::from("src/lib.rs")]);
    }

    #[tokio::test]
    async fn test_walk_filter_sees_relative_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "a/b/c.txt", b"c");
        write(&temp_dir, "a/d.txt", b"d");
        let seen = std::sync::Mutex::new(Vec::new());
        let record = |dir: &Path| {
            seen.lock().unwrap().push(dir.to_path_buf());
            dir != Path::new("a/b")
        };
        let files: Vec<FileMeta> = backend(&temp_dir).walk(None, Some(&record)).try_collect().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, Path::new("a/d.txt"));
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, [PathBuf::from("a"), PathBuf::from("a/b")]);
    }

    #[tokio::test]
    async fn test_reader_streams_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "file.txt", b"0123456789");
        let mut reader = backend(&temp_dir).reader(Path::new("file.txt")).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"0123456789");
    }

    #[tokio::test]
    async fn test_reader_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = backend(&temp_dir).reader(Path::new("missing.txt")).await;
        let err = result.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_writer_creates_directories_and_truncates() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "a/b/c/file.txt", b"a much longer original");
        let backend = backend(&temp_dir);
        let mut writer = backend.writer(Path::new("a/b/c/file.txt")).await.unwrap();
        writer.write_all(b"short").unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(backend.read(Path::new("a/b/c/file.txt")).await.unwrap(), b"short");

        let mut writer = backend.writer(Path::new("x/y/new.txt")).await.unwrap();
        writer.write_all(b"new").unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert!(backend.exists(Path::new("x/y/new.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_dir_all_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = backend(&temp_dir);
        backend.create_dir_all(Path::new("a/b/c")).await.unwrap();
        backend.create_dir_all(Path::new("a/b/c")).await.unwrap();
        assert!(temp_dir.path().join("a/b/c").is_dir());
    }

    #[tokio::test]
    async fn test_stat() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(&temp_dir, "dir/file.txt", b"Hello, world!");
        let info = backend(&temp_dir).stat(Path::new("dir/./file.txt")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("dir/file.txt"));
        assert_eq!(info.size, 13);
        assert!(info.modified_millis() > 0);
    }

    #[tokio::test]
    async fn test_stat_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = backend(&temp_dir).stat(Path::new("nope.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = backend(&temp_dir);
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.read(Path::new("etc/../../passwd")).await.is_err());
        assert!(backend.writer(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.create_dir_all(Path::new("../../dir")).await.is_err());
    }
}
