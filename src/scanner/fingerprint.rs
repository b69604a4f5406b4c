//! File fingerprints: the cheap identity of a file plus its content hash.
//!
//! [`identify`] only stats the file. [`compute_hash`] reads the whole file
//! and is the expensive step the indexer tries to avoid.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use super::hasher::{ContentHash, Hasher};
use super::path_utils::expand_user;
use super::FingerprintError;

/// Last-known identity of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintRecord {
    /// Content digest; `None` until [`compute_hash`] has run.
    pub content_hash: Option<ContentHash>,
    /// Absolute, `~`-expanded, symlink-resolved path.
    pub path: PathBuf,
    /// Size in bytes at observation time.
    pub size: u64,
    /// Change timestamp in nanoseconds since the Unix epoch.
    pub change_timestamp: i64,
}

impl FingerprintRecord {
    /// Create an unhashed record.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, change_timestamp: i64) -> Self {
        Self {
            content_hash: None,
            path,
            size,
            change_timestamp,
        }
    }

    /// Attach a content hash.
    #[must_use]
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.content_hash = Some(hash);
        self
    }

    /// Whether the content hash has been computed.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        self.content_hash.is_some()
    }
}

/// Resolve a user-supplied path to its absolute, canonical form.
///
/// # Errors
///
/// Returns [`FingerprintError::NotFound`] if the path does not exist.
pub fn resolve_path(path: &Path) -> Result<PathBuf, FingerprintError> {
    let expanded = expand_user(path);
    expanded
        .canonicalize()
        .map_err(|e| FingerprintError::from_io(path, e))
}

/// Stat a file and build its unhashed fingerprint.
///
/// # Errors
///
/// - [`FingerprintError::NotFound`] if the path does not resolve
/// - [`FingerprintError::NotAFile`] for directories, devices, sockets and FIFOs
/// - [`FingerprintError::PermissionDenied`] / [`FingerprintError::Io`] otherwise
pub fn identify(path: &Path) -> Result<FingerprintRecord, FingerprintError> {
    let resolved = resolve_path(path)?;
    let metadata =
        std::fs::metadata(&resolved).map_err(|e| FingerprintError::from_io(&resolved, e))?;

    if !metadata.is_file() {
        return Err(FingerprintError::NotAFile(resolved));
    }

    Ok(FingerprintRecord::new(
        resolved,
        metadata.len(),
        change_timestamp(&metadata),
    ))
}

/// Read the file and fill in its content hash.
///
/// The size recorded during [`identify`] is kept even if the file changed
/// since; the next scan will see the new size and rehash again.
///
/// # Errors
///
/// Returns a [`FingerprintError`] if the file cannot be read.
pub fn compute_hash(
    record: FingerprintRecord,
    hasher: &Hasher,
) -> Result<FingerprintRecord, FingerprintError> {
    let (hash, bytes) = hasher
        .hash_file(&record.path)
        .map_err(|e| FingerprintError::from_io(&record.path, e))?;

    if bytes != record.size {
        log::debug!(
            "Size changed while hashing {} ({} -> {} bytes)",
            record.path.display(),
            record.size,
            bytes
        );
    }

    Ok(record.with_hash(hash))
}

/// Inode change time on Unix, modification time elsewhere.
#[cfg(unix)]
fn change_timestamp(metadata: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata
        .ctime()
        .saturating_mul(1_000_000_000)
        .saturating_add(metadata.ctime_nsec())
}

#[cfg(not(unix))]
fn change_timestamp(metadata: &Metadata) -> i64 {
    use std::time::UNIX_EPOCH;
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
}
