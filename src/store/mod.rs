//! Persistent file index.
//!
//! This module stores one fingerprint per live file in a single-file SQLite
//! database and answers duplicate-content queries against it.
//!
//! # Architecture
//!
//! * [`database`]: connection handling, schema, the exclusive scan
//!   transaction and read queries.
//! * [`record`]: generations, stored rows and query result types.
//!
//! # Liveness
//!
//! Every row carries the generation of the last scan that saw the file.
//! A scan stamps each file it visits with its own generation, either by a
//! cheap *touch* (path, size and change timestamp unchanged) or by a full
//! rehash and upsert. When the scan ends, every row still carrying an older
//! generation is purged.
//!
//! # Trust boundary
//!
//! An unchanged `(path, size, change_timestamp)` triple is taken to mean
//! unchanged content. A write that preserves both size and timestamp (for
//! example, a timestamp restored by a backup tool) is not detected.

pub mod database;
pub mod record;

use std::path::PathBuf;

use crate::scanner::HashAlgorithm;

pub use database::{IndexStore, ScanTransaction, StoreOptions};
pub use record::{DuplicateGroup, Generation, StoreOutcome, StoreStats, StoredRecord};

/// Errors raised by the index store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database file could not be opened or created.
    #[error("Cannot open index database {path}: {source}")]
    Open {
        /// Database path
        path: PathBuf,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A fingerprint without a content hash was handed to `store`.
    #[error("Refusing to store unhashed record for {0}")]
    UnhashedRecord(PathBuf),

    /// Another connection holds a conflicting lock.
    #[error("Index database {0} is locked by another process")]
    LockConflict(PathBuf),

    /// The database does not have the expected layout.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The database was built with a different hash algorithm.
    #[error("Index uses {stored} hashes, but {requested} was requested")]
    AlgorithmMismatch {
        /// Algorithm recorded in the database
        stored: HashAlgorithm,
        /// Algorithm requested by the caller
        requested: HashAlgorithm,
    },

    /// Any other SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
