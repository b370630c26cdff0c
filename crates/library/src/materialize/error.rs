//! Error types for the [`materialize`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A copy error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for copy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a copy failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Transfer`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Scan`] - resolving a pattern selection into a listing failed.
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Task`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Resolving a pattern selection into a listing failed; nothing was
    /// copied.
    #[display("could not resolve the files to copy")]
    Scan,
    /// Opening the source, opening the destination, or creating a directory
    /// via the storage backend failed.
    Storage,
    /// Streaming bytes from source to destination failed part-way.
    #[display("failed copying {}", _0.display())]
    Transfer(#[error(not(source))] PathBuf),
    /// The blocking copy task panicked or was cancelled.
    Task,
}
