//! Incremental indexer.
//!
//! A scan walks the root, and for every regular file either *touches* the
//! stored record (cheap: only the generation changes) or rehashes the file
//! and upserts it. Records the scan did not stamp are then purged and the
//! secondary indexes rebuilt, all inside one exclusive transaction:
//!
//! ```text
//! START -> lock acquired -> INDEXING -> PURGING -> FINALIZED (committed)
//! ```
//!
//! Content is read only for files that are new or whose
//! `(path, size, change_timestamp)` differs from the stored record.
//!
//! # Example
//!
//! ```no_run
//! use findex::indexer::{Indexer, IndexerConfig, NullObserver};
//! use findex::store::{Generation, IndexStore, StoreOptions};
//! use std::path::Path;
//!
//! let mut store = IndexStore::open(Path::new("files.db"), &StoreOptions::default()).unwrap();
//! let generation = Generation::next_after(store.last_generation().unwrap());
//! let summary = Indexer::new(IndexerConfig::default())
//!     .index(&mut store, Path::new("."), generation, &mut NullObserver)
//!     .unwrap();
//! println!("{} added, {} deleted", summary.added, summary.deleted);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::scanner::{
    compute_hash, identify, resolve_path, FingerprintError, Hasher, ScanError, Walker,
    WalkerConfig,
};
use crate::store::{Generation, IndexStore, ScanTransaction, StoreError, StoreOutcome};

/// Change applied to the index for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// First time this path was indexed.
    Added,
    /// The path was known but its content was rehashed.
    Updated,
    /// The path was not seen by this scan and was purged.
    Deleted,
}

impl FileAction {
    /// Single-letter code used in scan output.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Updated => 'U',
            Self::Deleted => 'D',
        }
    }
}

/// Receives per-file events while a scan runs.
///
/// Unchanged files produce no event.
pub trait ScanObserver {
    /// A file was added, rehashed or purged.
    fn on_file(&mut self, action: FileAction, path: &Path);

    /// A file could not be indexed and was skipped.
    fn on_error(&mut self, _error: &ScanError) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ScanObserver for NullObserver {
    fn on_file(&mut self, _action: FileAction, _path: &Path) {}
}

/// Observer that records every event, useful for tests and reports.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    /// Events in the order they were emitted
    pub events: Vec<(FileAction, PathBuf)>,
    /// Paths of skipped files
    pub errors: Vec<PathBuf>,
}

impl RecordingObserver {
    /// Paths that received `action`.
    #[must_use]
    pub fn paths(&self, action: FileAction) -> Vec<&Path> {
        self.events
            .iter()
            .filter(|(a, _)| *a == action)
            .map(|(_, p)| p.as_path())
            .collect()
    }
}

impl ScanObserver for RecordingObserver {
    fn on_file(&mut self, action: FileAction, path: &Path) {
        self.events.push((action, path.to_path_buf()));
    }

    fn on_error(&mut self, error: &ScanError) {
        self.errors.push(error.path().to_path_buf());
    }
}

/// Errors that abort a scan.
///
/// Per-file problems never surface here; they are collected in
/// [`IndexSummary::errors`].
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The scan root could not be resolved.
    #[error("Cannot index root: {0}")]
    Root(#[source] FingerprintError),

    /// The requested generation does not advance past the last scan.
    #[error("Generation {requested} is not newer than the last indexed generation {last}")]
    StaleGeneration {
        /// Generation passed to the indexer
        requested: Generation,
        /// Generation of the last committed scan
        last: Generation,
    },

    /// A store, lock or schema failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Shutdown was requested; the scan was rolled back.
    #[error("Indexing interrupted; no changes were committed")]
    Interrupted,
}

/// Counters for one completed scan.
#[derive(Debug)]
pub struct IndexSummary {
    /// Generation stamped by this scan
    pub generation: Generation,
    /// Regular files discovered
    pub files_seen: usize,
    /// Unchanged files (generation bumped only)
    pub touched: usize,
    /// Newly indexed paths
    pub added: usize,
    /// Known paths that were rehashed
    pub updated: usize,
    /// Purged paths
    pub deleted: usize,
    /// Files whose content was read
    pub hashed_files: usize,
    /// Bytes of content hashed
    pub hashed_bytes: u64,
    /// Files skipped because of an error
    pub errors: Vec<ScanError>,
    /// Wall-clock duration of the scan
    pub duration: Duration,
}

impl IndexSummary {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            files_seen: 0,
            touched: 0,
            added: 0,
            updated: 0,
            deleted: 0,
            hashed_files: 0,
            hashed_bytes: 0,
            errors: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Whether any file was skipped.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Configuration for the [`Indexer`].
#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    /// Traversal options
    pub walker: WalkerConfig,
    /// Shared flag; when set, the scan stops and rolls back.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl IndexerConfig {
    /// Create a configuration with the given traversal options.
    #[must_use]
    pub fn new(walker: WalkerConfig) -> Self {
        Self {
            walker,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

/// Runs incremental scans against an [`IndexStore`].
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    /// Create an indexer.
    #[must_use]
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Scan `root` (a directory or a single file) as `generation`.
    ///
    /// On success every live record carries `generation`, records for
    /// files not seen are purged, and the transaction is committed.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Root`] if `root` does not resolve
    /// - [`IndexError::StaleGeneration`] if `generation` does not advance
    /// - [`IndexError::Store`] for lock conflicts and database failures
    /// - [`IndexError::Interrupted`] if the shutdown flag was raised
    pub fn index(
        &self,
        store: &mut IndexStore,
        root: &Path,
        generation: Generation,
        observer: &mut dyn ScanObserver,
    ) -> Result<IndexSummary, IndexError> {
        let started = Instant::now();
        let root = resolve_path(root).map_err(IndexError::Root)?;
        let mut summary = IndexSummary::new(generation);
        let scope = ScanScope {
            hasher: Hasher::new(store.algorithm()),
            generation,
            // The database and its journal change during every scan.
            database_files: store.database_files(),
        };

        let tx = store.begin_exclusive()?;
        if let Some(last) = tx.last_generation()? {
            if generation <= last {
                return Err(IndexError::StaleGeneration {
                    requested: generation,
                    last,
                });
            }
        }

        log::info!("Indexing {} (generation {})", root.display(), generation);
        tx.drop_secondary_indexes()?;

        let walker = Walker::new(&root, self.config.walker.clone());
        for entry in walker.walk() {
            if self.is_shutdown_requested() {
                log::warn!("Shutdown requested, rolling back scan");
                tx.abort()?;
                return Err(IndexError::Interrupted);
            }

            match entry {
                Ok(path) if scope.database_files.contains(&path) => {
                    log::debug!("Skipping index database file {}", path.display());
                }
                Ok(path) => {
                    summary.files_seen += 1;
                    let outcome =
                        self.process_file(&tx, &scope, &path, &mut summary, observer)?;
                    if let Err(e) = outcome {
                        record_error(&mut summary, observer, e.into());
                    }
                }
                Err(e) => record_error(&mut summary, observer, e),
            }
        }

        let deleted = tx.purge(generation)?;
        for path in &deleted {
            observer.on_file(FileAction::Deleted, path);
        }
        summary.deleted = deleted.len();

        tx.rebuild_indexes(generation)?;
        summary.duration = started.elapsed();

        log::info!(
            "Indexed {} files: {} unchanged, {} added, {} updated, {} deleted, {} skipped ({} hashed, {} bytes) in {:.2?}",
            summary.files_seen,
            summary.touched,
            summary.added,
            summary.updated,
            summary.deleted,
            summary.errors.len(),
            summary.hashed_files,
            summary.hashed_bytes,
            summary.duration
        );
        Ok(summary)
    }

    /// Touch or hash-and-store one file.
    ///
    /// The outer result carries fatal store errors; the inner one carries
    /// per-file failures the scan recovers from.
    fn process_file(
        &self,
        tx: &ScanTransaction<'_>,
        scope: &ScanScope,
        path: &Path,
        summary: &mut IndexSummary,
        observer: &mut dyn ScanObserver,
    ) -> Result<Result<(), FingerprintError>, StoreError> {
        let record = match identify(path) {
            Ok(record) => record,
            Err(e) => return Ok(Err(e)),
        };
        // Reached through a link.
        if scope.database_files.contains(&record.path) {
            log::debug!("Skipping index database file {}", record.path.display());
            return Ok(Ok(()));
        }

        if tx.touch(&record, scope.generation)? {
            log::trace!("Unchanged: {}", record.path.display());
            summary.touched += 1;
            return Ok(Ok(()));
        }

        let record = match compute_hash(record, &scope.hasher) {
            Ok(record) => record,
            Err(e) => return Ok(Err(e)),
        };
        summary.hashed_files += 1;
        summary.hashed_bytes += record.size;

        let action = match tx.store(&record, scope.generation)? {
            StoreOutcome::Added => {
                summary.added += 1;
                FileAction::Added
            }
            StoreOutcome::Updated => {
                summary.updated += 1;
                FileAction::Updated
            }
        };
        log::trace!("{:?}: {}", action, record.path.display());
        observer.on_file(action, &record.path);
        Ok(Ok(()))
    }
}

/// Per-scan values shared by every file.
struct ScanScope {
    hasher: Hasher,
    generation: Generation,
    database_files: Vec<PathBuf>,
}

fn record_error(summary: &mut IndexSummary, observer: &mut dyn ScanObserver, error: ScanError) {
    log::debug!("Skipping {}: {}", error.path().display(), error);
    observer.on_error(&error);
    summary.errors.push(error);
}
