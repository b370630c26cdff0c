use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result as ScanResult};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use treesnap_storage::{BackendHandle, FileDescriptor};

/// Stats and hashes a single file, producing its [`FileDescriptor`].
///
/// The content is streamed through an incremental BLAKE3 hasher on the
/// blocking pool, so memory use doesn't depend on file size. The file handle
/// lives inside the blocking task and is closed when it ends, whether or not
/// hashing succeeded.
pub async fn scan_file(backend: &BackendHandle, path: impl AsRef<Path>) -> LibraryResult<FileDescriptor> {
    scan_file_inner(backend, path.as_ref().to_path_buf()).await.or_raise(|| LibraryErrorKind::Scan)
}

pub(crate) async fn scan_file_inner(backend: &BackendHandle, path: PathBuf) -> ScanResult<FileDescriptor> {
    let meta = backend.stat(&path).await.or_raise(|| ErrorKind::Storage)?;
    let mut reader = backend.reader(&path).await.or_raise(|| ErrorKind::Storage)?;
    let hash = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(hasher.finalize().to_hex().to_string())
    })
    .await
    .or_raise(|| ErrorKind::Task)?
    .or_raise(|| ErrorKind::Read(meta.path.clone()))?;
    tracing::debug!(backend = backend.name(), path = %meta.path.display(), hash = %hash, "Hashed file");
    meta.with_hash(hash).or_raise(|| ErrorKind::Path(path.clone()))
}
