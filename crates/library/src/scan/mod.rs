//! Directory snapshots.
//!
//! [`scan`] walks a backend's root, keeps the files that match the glob
//! [`Pattern`] and survive the root's [`IgnoreFilter`], then stats and hashes
//! the survivors concurrently into a [`Listing`]. Directories that are ignored,
//! or hidden without the pattern naming them, are never entered.
//!
//! A scan either returns a complete listing or fails with the first error
//! encountered; there are no partial results. Hash tasks that are already
//! running when a sibling fails are left to finish and their output dropped.

pub mod error;
mod file;
mod filter;
mod pattern;

pub use self::file::scan_file;
pub(crate) use self::file::scan_file_inner;
pub use self::filter::IgnoreFilter;
pub use self::pattern::Pattern;
use crate::ScanOptions;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result as ScanResult};
use exn::ResultExt;
use futures::future::ready;
use futures::{StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use treesnap_storage::backend::LocalBackend;
use treesnap_storage::{BackendHandle, Listing};

/// Scans `backend` for files matching `pattern`.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use treesnap_library::{ScanOptions, scan};
/// use treesnap_storage::{BackendHandle, backend::LocalBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend: BackendHandle = Arc::new(LocalBackend::new("site", "/srv/site")?);
/// let listing = scan(&backend, "**/*.html", &ScanOptions::default()).await?;
/// for file in listing.iter() {
///     println!("{} {} {}", file.path, file.content_hash, file.modified);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn scan(backend: &BackendHandle, pattern: &str, options: &ScanOptions) -> LibraryResult<Listing> {
    scan_inner(backend, pattern, options).await.or_raise(|| LibraryErrorKind::Scan)
}

/// Scans the local directory `root` with default [`ScanOptions`].
pub async fn scan_dir(root: impl AsRef<Path>, pattern: &str) -> LibraryResult<Listing> {
    let backend = local_backend("local", root.as_ref()).or_raise(|| LibraryErrorKind::Scan)?;
    scan(&backend, pattern, &ScanOptions::default()).await
}

#[instrument(skip_all, fields(backend = backend.name(), pattern = pattern))]
pub(crate) async fn scan_inner(backend: &BackendHandle, pattern: &str, options: &ScanOptions) -> ScanResult<Listing> {
    let pattern = Pattern::new(pattern)?;
    let filter = IgnoreFilter::load(backend, &options.ignore_file).await;
    let prefix = pattern.literal_prefix();

    let enter = |dir: &Path| pattern.may_enter(dir) && filter.accepts_dir(dir);

    let listing: Listing = backend
        .walk(prefix.as_deref(), Some(&enter))
        .map(|meta| meta.or_raise(|| ErrorKind::Storage))
        .try_filter(|meta| ready(pattern.matches(&meta.path) && filter.accepts(&meta.path)))
        .map_ok(|meta| scan_file_inner(backend, meta.path))
        .try_buffer_unordered(options.limit())
        .try_collect()
        .await?;

    tracing::info!(files = listing.len(), "Scan complete");
    Ok(listing)
}

/// Resolve a possibly-relative directory against the working directory and
/// wrap it in a [`LocalBackend`].
pub(crate) fn local_backend(name: &str, root: &Path) -> ScanResult<BackendHandle> {
    let root = std::path::absolute(root).or_raise(|| ErrorKind::Storage)?;
    let backend = LocalBackend::new(name, root).or_raise(|| ErrorKind::Storage)?;
    Ok(Arc::new(backend))
}
