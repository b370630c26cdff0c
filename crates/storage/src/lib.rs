//! Filesystem access for treesnap.
//!
//! The [`StorageBackend`] trait is the only way the scanner and materializer
//! touch a directory tree: listing, stat, streaming reads and writes, and
//! directory creation. [`FileDescriptor`] and [`Listing`] are the snapshot
//! values produced from it.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{FileDescriptor, FileMeta, Listing};
pub use crate::path::{to_slash, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
