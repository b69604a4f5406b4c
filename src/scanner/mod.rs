//! Scanner module for file discovery and content fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential, sorted directory walking using walkdir
//! - Metadata fingerprints (path, size, change timestamp)
//! - Streaming content hashing (SHA-1, SHA-256 or BLAKE3)
//! - Native path encoding for storage
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`fingerprint`]: Cheap `stat`-based identity records
//! - [`hasher`]: Chunked content hashing
//! - [`path_utils`]: `~` expansion and opaque path bytes
//!
//! # Example
//!
//! ```no_run
//! use findex::scanner::{compute_hash, identify, Hasher, HashAlgorithm, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let hasher = Hasher::new(HashAlgorithm::Sha1);
//! for entry in walker.walk() {
//!     let Ok(path) = entry else { continue };
//!     let record = identify(&path).unwrap();
//!     let record = compute_hash(record, &hasher).unwrap();
//!     println!("{} {}", record.content_hash.unwrap(), record.path.display());
//! }
//! ```

pub mod fingerprint;
pub mod hasher;
pub mod path_utils;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use fingerprint::{compute_hash, identify, resolve_path, FingerprintRecord};
pub use hasher::{ContentHash, HashAlgorithm, Hasher, READ_BUFFER_SIZE};
pub use walker::Walker;

/// Configuration for directory walking.
///
/// Controls filtering and symlink handling during traversal.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Symlink cycles are reported as walk errors.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to exclude (gitignore-style), relative to the root.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool, skip_hidden: bool, ignore_patterns: Vec<String>) -> Self {
        Self {
            follow_symlinks,
            skip_hidden,
            ignore_patterns,
        }
    }
}

/// Errors that can occur while fingerprinting a single file.
///
/// All variants are recoverable at the indexer boundary: the file is
/// skipped and the scan continues.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The path does not exist (or vanished mid-scan).
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FingerprintError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::NotAFile(path) | Self::PermissionDenied(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

/// Per-file errors collected during a scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A directory entry could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file was discovered but could not be fingerprinted or hashed.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

impl ScanError {
    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) => path,
            Self::Io { path, .. } => path,
            Self::Fingerprint(err) => err.path(),
        }
    }
}
