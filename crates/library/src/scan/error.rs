//! Error types for the [`scan`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a scan failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Pattern`]
/// - [`ErrorKind::Path`]
/// - [`ErrorKind::Read`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Task`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The glob pattern could not be compiled.
    #[display("invalid glob pattern: {_0}")]
    Pattern(#[error(not(source))] String),
    /// Listing, stat, or opening a file via the storage backend failed.
    Storage,
    /// Streaming a file's content through the hasher failed part-way.
    #[display("failed reading {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// A path with no exact UTF-8 form can't be recorded in a listing.
    #[display("path is not valid UTF-8: {}", _0.display())]
    Path(#[error(not(source))] PathBuf),
    /// The blocking hash task panicked or was cancelled.
    Task,
}
