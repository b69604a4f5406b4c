//! Types persisted in and returned by the index store.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::{ContentHash, HashAlgorithm};

/// Monotonic scan marker, in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(i64);

impl Generation {
    /// Wrap a raw generation value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw value as stored.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Generation for a scan starting now.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Generation for a scan starting now that is strictly greater than `last`.
    ///
    /// Covers two scans within one millisecond and clocks that stepped back.
    #[must_use]
    pub fn next_after(last: Option<Generation>) -> Self {
        Self::next_after_at(last, Self::now())
    }

    fn next_after_at(last: Option<Generation>, now: Generation) -> Self {
        match last {
            Some(last) if last >= now => Self(last.0.saturating_add(1)),
            _ => now,
        }
    }

    /// Wall-clock time this generation corresponds to, if representable.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What [`super::ScanTransaction::store`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// No row existed for the path.
    Added,
    /// The existing row for the path was replaced.
    Updated,
}

/// A row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Content digest
    pub content_hash: ContentHash,
    /// Canonical path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Change timestamp (ns since epoch)
    pub change_timestamp: i64,
    /// Last generation that saw this file
    pub generation: Generation,
}

/// Live records sharing one content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Shared content digest
    pub hash: ContentHash,
    /// Size of each copy in bytes
    pub size: u64,
    /// Paths in byte-wise lexicographic order
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of files in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Bytes freed by keeping a single copy.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size
            .saturating_mul(self.paths.len().saturating_sub(1) as u64)
    }
}

/// Summary of the store contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Digest algorithm of this database
    pub algorithm: HashAlgorithm,
    /// Number of live records
    pub records: u64,
    /// Number of distinct content hashes
    pub distinct_hashes: u64,
    /// Number of hashes shared by two or more records
    pub duplicate_groups: u64,
    /// Sum of all record sizes
    pub total_bytes: u64,
    /// Generation of the last completed scan
    pub last_generation: Option<Generation>,
}
