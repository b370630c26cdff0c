use crate::materialize::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::Write;
use std::path::Path;
use treesnap_storage::BackendHandle;

/// Copies one file from `source` to the same relative path in `target`,
/// creating the parent directories first and overwriting whatever is there.
pub(crate) async fn copy_file(source: &BackendHandle, target: &BackendHandle, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        target.create_dir_all(parent).await.or_raise(|| ErrorKind::Storage)?;
    }
    let mut reader = source.reader(path).await.or_raise(|| ErrorKind::Storage)?;
    let mut writer = target.writer(path).await.or_raise(|| ErrorKind::Storage)?;
    let bytes = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
        let bytes = std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(bytes)
    })
    .await
    .or_raise(|| ErrorKind::Task)?
    .or_raise(|| ErrorKind::Transfer(path.to_path_buf()))?;
    tracing::debug!(source = source.name(), target = target.name(), path = %path.display(), bytes, "Copied file");
    Ok(bytes)
}
