//! Tree materialization.
//!
//! [`copy`] replays a [`Listing`] from a source backend onto a target backend:
//! every referenced file is streamed to the same relative path under the
//! target, intermediate directories are created as needed, and existing files
//! are overwritten without checks.
//!
//! Files are copied concurrently. The first failure fails the whole call;
//! anything already copied stays where it is.

pub mod error;
mod file;

use crate::ScanOptions;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::materialize::error::{ErrorKind, Result as CopyResult};
use crate::materialize::file::copy_file;
use crate::scan::{local_backend, scan_inner};
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt};
use std::path::Path;
use tracing::instrument;
use treesnap_storage::backend::LocalBackend;
use treesnap_storage::{BackendHandle, Listing};

/// Which files [`copy`] should materialize.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Exactly the files in this listing.
    Listing(&'a Listing),
    /// Whatever a scan of the source with this glob finds.
    Pattern(&'a str),
}
impl<'a> From<&'a Listing> for Selection<'a> {
    fn from(listing: &'a Listing) -> Self {
        Self::Listing(listing)
    }
}
impl<'a> From<&'a str> for Selection<'a> {
    fn from(pattern: &'a str) -> Self {
        Self::Pattern(pattern)
    }
}

/// Copies the selected files from `source` into `target`.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use treesnap_library::{ScanOptions, copy};
/// use treesnap_storage::{BackendHandle, backend::LocalBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source: BackendHandle = Arc::new(LocalBackend::new("build", "/tmp/build")?);
/// let target: BackendHandle = Arc::new(LocalBackend::create("www", "/srv/www")?);
/// copy(&source, "**/*.html", &target, &ScanOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn copy<'a>(
    source: &BackendHandle,
    selection: impl Into<Selection<'a>>,
    target: &BackendHandle,
    options: &ScanOptions,
) -> LibraryResult<()> {
    copy_inner(source, selection.into(), target, options).await.or_raise(|| LibraryErrorKind::Copy)
}

/// Copies the selected files from the local directory `root` into the local
/// directory `target` (created if missing), with default [`ScanOptions`].
pub async fn copy_dir<'a>(
    root: impl AsRef<Path>,
    selection: impl Into<Selection<'a>>,
    target: impl AsRef<Path>,
) -> LibraryResult<()> {
    let source = local_backend("source", root.as_ref()).or_raise(|| LibraryErrorKind::Copy)?;
    let target = std::path::absolute(target.as_ref()).or_raise(|| LibraryErrorKind::Copy)?;
    let target: BackendHandle =
        std::sync::Arc::new(LocalBackend::create("target", target).or_raise(|| LibraryErrorKind::Copy)?);
    copy(&source, selection, &target, &ScanOptions::default()).await
}

#[instrument(skip_all, fields(source = source.name(), target = target.name()))]
async fn copy_inner(
    source: &BackendHandle,
    selection: Selection<'_>,
    target: &BackendHandle,
    options: &ScanOptions,
) -> CopyResult<()> {
    let scanned;
    let listing = match selection {
        Selection::Listing(listing) => listing,
        Selection::Pattern(pattern) => {
            scanned = scan_inner(source, pattern, options).await.or_raise(|| ErrorKind::Scan)?;
            &scanned
        },
    };

    let bytes: u64 = futures::stream::iter(listing.iter())
        .map(|file| copy_file(source, target, Path::new(&file.path)))
        .buffer_unordered(options.limit())
        .try_fold(0, |total, bytes| async move { Ok(total + bytes) })
        .await?;

    tracing::info!(files = listing.len(), bytes, "Copy complete");
    Ok(())
}
