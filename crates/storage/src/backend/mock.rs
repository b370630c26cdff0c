//! In-memory storage backend for testing.

use super::{BoxSyncRead, BoxSyncWrite, DirFilter, FileMetaStream};
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{FileMeta, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use time::UtcDateTime;

type Files = Arc<RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>>;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Paths registered
/// with [`with_vanished()`](Self::with_vanished) are listed but fail every
/// read and stat with [`NotFound`](ErrorKind::NotFound), imitating a file
/// deleted between discovery and hashing. Directories registered with
/// [`with_unreadable_dirs()`](Self::with_unreadable_dirs) fail the walk
/// unless its filter prunes them first.
///
/// # Examples
///
/// ```
/// use treesnap_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("src/lib.rs", b"pub fn f() {}"),
/// ]);
/// assert!(backend.exists(Path::new("src/lib.rs")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: Files,
    vanished: HashSet<PathBuf>,
    unreadable: Vec<PathBuf>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        Self::with_timed_files(files.into_iter().map(|(path, data)| (path, now, data)))
    }

    /// Create a mock backend pre-populated with files that carry explicit
    /// modification times.
    pub fn with_timed_files(
        files: impl IntoIterator<Item = (impl Into<PathBuf>, UtcDateTime, impl Into<Vec<u8>>)>,
    ) -> Self {
        let mut map = HashMap::new();
        for (path, modified, data) in files {
            map.insert(Self::validated(path.into()), (modified, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: Arc::new(RwLock::new(map)),
            vanished: HashSet::new(),
            unreadable: Vec::new(),
        }
    }

    /// Fail the walk with [`PermissionDenied`](ErrorKind::PermissionDenied)
    /// whenever it enters one of these directories.
    pub fn with_unreadable_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.unreadable.extend(dirs.into_iter().map(|d| Self::validated(d.into())));
        self
    }

    /// Keep listing these paths, but fail any attempt to stat or read them.
    pub fn with_vanished(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.vanished.extend(paths.into_iter().map(|p| Self::validated(p.into())));
        self
    }

    /// Snapshot of the stored bytes at `path`, for assertions.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = validate_path(path.as_ref()).ok()?;
        self.files().get(&path).map(|(_, data)| data.clone())
    }

    fn validated(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    fn files(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, (UtcDateTime, Vec<u8>)>> {
        // A poisoned lock means another test thread already panicked.
        self.storage.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, path: &Path) -> Result<(PathBuf, UtcDateTime, Vec<u8>)> {
        let path = validate_path(path)?;
        if self.vanished.contains(&path) {
            exn::bail!(ErrorKind::NotFound(path));
        }
        let Some((modified, data)) = self.files().get(&path).cloned() else {
            exn::bail!(ErrorKind::NotFound(path));
        };
        Ok((path, modified, data))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

/// Whether a walk honoring `filter` would enter every one of `dirs`. The
/// empty path is the root, which is always entered.
fn descends<'p>(mut dirs: impl Iterator<Item = &'p Path>, filter: Option<DirFilter<'_>>) -> bool {
    let Some(enter) = filter else {
        return true;
    };
    dirs.all(|dir| dir.as_os_str().is_empty() || enter(dir))
}

/// Buffers everything written and commits it to the shared map on flush.
struct MockWriter {
    path: PathBuf,
    buffer: Vec<u8>,
    storage: Files,
}
impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut guard = self.storage.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(self.path.clone(), (UtcDateTime::now(), self.buffer.clone()));
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn walk<'a>(&'a self, prefix: Option<&'a Path>, filter: Option<DirFilter<'a>>) -> FileMetaStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            for dir in &self.unreadable {
                let reached = match &validated_prefix {
                    Some(pfx) => dir.starts_with(pfx) || pfx.starts_with(dir),
                    None => true,
                };
                if reached && descends(dir.ancestors(), filter) {
                    yield Err(exn::Exn::from(ErrorKind::PermissionDenied(dir.clone())));
                }
            }
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<FileMeta> = {
                let guard = self.files();
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .filter(|(path, _)| descends(path.ancestors().skip(1), filter))
                    .map(|(path, (modified, data))| FileMeta::new(path.clone(), data.len() as u64, *modified))
                    .collect()
            };
            for meta in entries {
                yield Ok(meta);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files().contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let (_, _, data) = self.lookup(path)?;
        Ok(data)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        let (_, _, data) = self.lookup(path)?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let path = validate_path(path)?;
        Ok(Box::new(MockWriter {
            path,
            buffer: Vec::new(),
            storage: Arc::clone(&self.storage),
        }))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        // Directories are implicit in a flat map of paths.
        validate_path(path)?;
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        let (path, modified, data) = self.lookup(path)?;
        Ok(FileMeta::new(path, data.len() as u64, modified))
    }
}
