//! Listing comparison.
//!
//! [`diff`] treats `local` as authoritative and classifies it against
//! `remote`. Each local file is matched against the first not-yet-matched
//! remote file with the same path; whatever remote files are left over were
//! removed locally.
//!
//! When content differs, timestamps decide the direction: a local edit at the
//! same millisecond as, or later than, the remote one is `dirty` (local wins);
//! a strictly later remote edit is `updated` (remote wins).

use std::collections::{HashMap, VecDeque};
use treesnap_storage::FileDescriptor;

/// The files one side has that the other side should adopt (`newer`), and
/// the files that side lacks (`missing`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Direction {
    pub newer: Vec<FileDescriptor>,
    pub missing: Vec<FileDescriptor>,
}

/// Result of [`diff`].
///
/// `unmodified` and `modified` hold the remote descriptors of matched pairs,
/// `dirty` holds the local descriptor (it's the copy to push) and `updated`
/// the remote one (it's the copy to pull).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Exists locally, not remotely.
    pub added: Vec<FileDescriptor>,
    /// Exists remotely, not locally.
    pub removed: Vec<FileDescriptor>,
    /// Exists on both sides with different (or unknown) content.
    pub modified: Vec<FileDescriptor>,
    /// Exists on both sides with identical content.
    pub unmodified: Vec<FileDescriptor>,
    /// Modified, and the remote edit is strictly newer.
    pub updated: Vec<FileDescriptor>,
    /// Modified, and the local edit is newer or simultaneous.
    pub dirty: Vec<FileDescriptor>,
    /// `newer`: added + dirty. `missing`: removed.
    pub local: Direction,
    /// `newer`: removed + updated. `missing`: added.
    pub remote: Direction,
}

impl Classification {
    /// Whether the two listings differ at all.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }
}

/// Compare two listings. Pure and infallible; duplicate paths and missing
/// hashes are classified by the usual rules rather than rejected.
pub fn diff(local: &[FileDescriptor], remote: &[FileDescriptor]) -> Classification {
    // Queue per path so duplicates pair up in input order, first match first.
    let mut index: HashMap<&str, VecDeque<usize>> = HashMap::with_capacity(remote.len());
    for (position, file) in remote.iter().enumerate() {
        index.entry(file.path.as_str()).or_default().push_back(position);
    }
    let mut matched = vec![false; remote.len()];
    let mut result = Classification::default();

    for file in local {
        let Some(position) = index.get_mut(file.path.as_str()).and_then(VecDeque::pop_front) else {
            result.added.push(file.clone());
            continue;
        };
        matched[position] = true;
        let other = &remote[position];
        if file.same_content(other) {
            result.unmodified.push(other.clone());
            continue;
        }
        result.modified.push(other.clone());
        if file.modified >= other.modified {
            result.dirty.push(file.clone());
        } else {
            result.updated.push(other.clone());
        }
    }

    result.removed = remote.iter().zip(&matched).filter(|(_, matched)| !**matched).map(|(f, _)| f.clone()).collect();
    result.local = Direction {
        newer: [result.added.as_slice(), result.dirty.as_slice()].concat(),
        missing: result.removed.clone(),
    };
    result.remote = Direction {
        newer: [result.removed.as_slice(), result.updated.as_slice()].concat(),
        missing: result.added.clone(),
    };
    result
}
