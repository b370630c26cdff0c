//! On-disk listings, so a scan can be kept and compared against later.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;
use treesnap_storage::Listing;

/// Writes `listing` to `path` as a JSON array of `{path, md5, mtime}`
/// objects, replacing any existing file.
#[instrument(skip_all, fields(path = %path.as_ref().display(), files = listing.len()))]
pub async fn save_listing(path: impl AsRef<Path>, listing: &Listing) -> Result<()> {
    let json = serde_json::to_vec_pretty(listing).or_raise(|| ErrorKind::Listing)?;
    tokio::fs::write(path.as_ref(), json).await.or_raise(|| ErrorKind::Listing)?;
    tracing::debug!("Saved listing");
    Ok(())
}

/// Reads a listing previously written by [`save_listing`] (or by anything
/// else producing the same shape).
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_listing(path: impl AsRef<Path>) -> Result<Listing> {
    let json = tokio::fs::read(path.as_ref()).await.or_raise(|| ErrorKind::Listing)?;
    let listing: Listing = serde_json::from_slice(&json).or_raise(|| ErrorKind::Listing)?;
    tracing::debug!(files = listing.len(), "Loaded listing");
    Ok(listing)
}
