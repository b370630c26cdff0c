//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the filesystem
//! collaborator the scanner and materializer are written against.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::FileMeta;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::{Read, Write};
use std::path::Path;
use std::pin::Pin;

pub type FileMetaStream<'a> = Pin<Box<dyn Stream<Item = Result<FileMeta>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;
pub type BoxSyncWrite = Box<dyn Write + Send + 'static>;
/// Decides, from its root-relative path, whether a walk enters a directory.
/// A rejected directory is never read, so nothing below it can fail the walk.
pub type DirFilter<'a> = &'a (dyn Fn(&Path) -> bool + Send + Sync);

/// Unified interface over a directory tree.
///
/// All operations are asynchronous; byte streams are handed out as `'static`
/// boxed [`Read`]/[`Write`] handles so that hashing and copying can happen in
/// a [`spawn_blocking`](tokio::task::spawn_blocking) task.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use treesnap_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_hardcoded_file(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = PathBuf::from("path/to/file.txt");
///     if backend.exists(&path).await? {
///         Ok(backend.stat(&path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List all regular files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileMeta>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream metadata for every regular file under the root.
    ///
    /// Directories are walked, never yielded. If a prefix is provided only
    /// files whose paths start with it (component-wise) are returned; a
    /// prefix that doesn't exist yields an empty stream, not an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use treesnap_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("src")));
    /// while let Some(meta) = stream.try_next().await? {
    ///     println!("{}: {} bytes", meta.path.display(), meta.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileMetaStream<'a> {
        self.walk(prefix, None)
    }

    /// Same as [`list_stream()`](Self::list_stream), but only descends into
    /// directories accepted by `filter`.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use treesnap_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let skip_vendor = |dir: &Path| !dir.ends_with("vendor");
    /// let files: Vec<_> = backend.walk(None, Some(&skip_vendor)).try_collect().await?;
    /// # Ok(())
    /// # }
    /// ```
    fn walk<'a>(&'a self, prefix: Option<&'a Path>, filter: Option<DirFilter<'a>>) -> FileMetaStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read the complete contents of a (small) file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a file for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). The async setup
    /// (opening the file) happens before returning.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use treesnap_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut reader = backend.reader(Path::new("big.bin")).await?;
    /// let bytes = tokio::task::spawn_blocking(move || {
    ///     std::io::copy(&mut reader, &mut std::io::sink())
    /// }).await.unwrap();
    /// # Ok(())
    /// # }
    /// ```
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Open a file for streaming writes, truncating any existing file.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    /// - Callers should call `flush()` before dropping to ensure data is
    ///   written and errors are propagated.
    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite>;

    /// Create a directory and all of its parents. Succeeds if it already
    /// exists.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileMeta>;
}
