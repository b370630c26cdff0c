//! Directory snapshots and the reconciliation between them.
//!
//! - [`scan`] walks a [backend](treesnap_storage) and produces a hashed
//!   [`Listing`] of the files matching a glob, minus anything the root's
//!   ignore file excludes.
//! - [`diff`] compares a local and a remote listing and classifies every file,
//!   deciding which side's copy should win.
//! - [`copy`] replays a listing (or a freshly scanned pattern) from one backend
//!   onto another.
//!
//! ```no_run
//! use treesnap_library::{Listing, Selection, copy_dir, diff, scan_dir};
//!
//! # async fn example() -> treesnap_library::error::Result<()> {
//! let local = scan_dir("/srv/site", "**/*").await?;
//! let remote = scan_dir("/mnt/deployed", "**/*").await?;
//! let plan = diff(&local, &remote);
//! let outgoing: Listing = plan.local.newer.iter().cloned().collect();
//! copy_dir("/srv/site", Selection::Listing(&outgoing), "/mnt/deployed").await?;
//! # Ok(())
//! # }
//! ```

mod diff;
pub mod error;
mod listing;
pub mod materialize;
pub mod scan;

pub use crate::diff::{Classification, Direction, diff};
pub use crate::listing::{load_listing, save_listing};
pub use crate::materialize::{Selection, copy, copy_dir};
pub use crate::scan::{IgnoreFilter, Pattern, scan, scan_dir, scan_file};
pub use treesnap_storage::{FileDescriptor, Listing};

/// Name of the ignore-rules file looked up at the scan root by default.
pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";
/// Default number of files hashed or copied at the same time.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Knobs shared by [`scan`] and [`copy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Ignore-rules file, relative to the scanned root.
    pub ignore_file: String,
    /// Maximum number of files processed concurrently.
    pub concurrency: usize,
}
impl ScanOptions {
    pub fn with_ignore_file(mut self, ignore_file: impl Into<String>) -> Self {
        self.ignore_file = ignore_file.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Concurrency limit as used by the fan-out; zero would never make
    /// progress, so it's treated as one.
    pub(crate) fn limit(&self) -> usize {
        self.concurrency.max(1)
    }
}
impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
