//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Each operation raises its own
//! [`ErrorKind`] on top of the module-level error tree describing the cause.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Building a listing failed; no partial listing is returned.
    #[display("scan failed")]
    Scan,
    /// Materializing files into the target failed. Files copied before the
    /// failure are left in place.
    #[display("copy failed")]
    Copy,
    /// A cached listing could not be written or read back.
    #[display("listing could not be saved or loaded")]
    Listing,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Always `false`: nothing here retries on its own, and whether re-running
    /// a whole scan or copy makes sense is the caller's call.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
