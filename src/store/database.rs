//! SQLite-backed index database.
//!
//! # Schema
//!
//! ```sql
//! files (hash TEXT, path BLOB UNIQUE, size INTEGER, ctime INTEGER, generation INTEGER)
//! meta  (key TEXT PRIMARY KEY, value TEXT)
//! files_hash_idx ON files (hash)
//! files_stat_idx ON files (path, size, ctime)
//! ```
//!
//! Paths are stored as native path bytes (see
//! [`crate::scanner::path_utils`]). The database stays in rollback-journal
//! mode so that the exclusive scan lock also keeps readers out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::ffi::ErrorCode;
use rusqlite::{
    params, Connection, OpenFlags, OptionalExtension, Row, Transaction, TransactionBehavior,
};

use super::record::{DuplicateGroup, Generation, StoreOutcome, StoreStats, StoredRecord};
use super::{StoreError, StoreResult};
use crate::scanner::path_utils::{path_from_bytes, path_to_bytes};
use crate::scanner::{ContentHash, FingerprintRecord, HashAlgorithm};

const SCHEMA_VERSION: u32 = 1;

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        hash       TEXT    NOT NULL,
        path       BLOB    NOT NULL UNIQUE,
        size       INTEGER NOT NULL,
        ctime      INTEGER NOT NULL,
        generation INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const CREATE_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS files_hash_idx ON files (hash);
    CREATE INDEX IF NOT EXISTS files_stat_idx ON files (path, size, ctime);
";

const DROP_INDEXES: &str = "
    DROP INDEX IF EXISTS files_hash_idx;
    DROP INDEX IF EXISTS files_stat_idx;
";

const DUPLICATES_QUERY: &str = "
    SELECT f.hash, f.path, f.size
    FROM files f
    JOIN (SELECT hash FROM files GROUP BY hash HAVING COUNT(*) > 1) d ON d.hash = f.hash
    ORDER BY f.hash, f.path
";

/// Files SQLite keeps next to the database while it is open.
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

const META_ALGORITHM: &str = "algorithm";
const META_LAST_GENERATION: &str = "last_generation";
const META_SCHEMA_VERSION: &str = "schema_version";

/// Options for opening an [`IndexStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Algorithm to use. `None` adopts the database's algorithm, or the
    /// default for a new database.
    pub algorithm: Option<HashAlgorithm>,
    /// How long to wait for a conflicting lock before failing.
    pub lock_timeout: Duration,
    /// Create the database file if it does not exist.
    pub create: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            algorithm: None,
            lock_timeout: Duration::ZERO,
            create: true,
        }
    }
}

impl StoreOptions {
    /// Options for commands that only read an existing index.
    #[must_use]
    pub fn existing() -> Self {
        Self {
            create: false,
            ..Self::default()
        }
    }

    /// Set the hash algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the lock wait timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// Persistent index of file fingerprints.
#[derive(Debug)]
pub struct IndexStore {
    conn: Connection,
    path: PathBuf,
    requested: Option<HashAlgorithm>,
    algorithm: HashAlgorithm,
}

impl IndexStore {
    /// Open (or create) the index database at `path`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Open`] if the file cannot be opened
    /// - [`StoreError::LockConflict`] if a scan holds the database
    /// - [`StoreError::Schema`] / [`StoreError::AlgorithmMismatch`] for
    ///   incompatible databases
    pub fn open(path: &Path, options: &StoreOptions) -> StoreResult<Self> {
        let flags = if options.create {
            OpenFlags::default()
        } else {
            OpenFlags::default() & !OpenFlags::SQLITE_OPEN_CREATE
        };
        let conn = Connection::open_with_flags(path, flags).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, path.to_path_buf(), options)
    }

    /// Open a private in-memory index.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory(options: &StoreOptions) -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn, PathBuf::from(":memory:"), options)
    }

    fn from_connection(conn: Connection, path: PathBuf, options: &StoreOptions) -> StoreResult<Self> {
        conn.busy_timeout(options.lock_timeout)?;

        let mut store = Self {
            conn,
            path,
            requested: options.algorithm,
            algorithm: options.algorithm.unwrap_or_default(),
        };
        store.ensure_schema()?;

        log::debug!(
            "Opened index {} ({} hashes)",
            store.path.display(),
            store.algorithm
        );
        Ok(store)
    }

    /// Create tables and indexes if missing and validate the metadata.
    ///
    /// Safe to call on every open.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created or does not match.
    pub fn ensure_schema(&mut self) -> StoreResult<()> {
        let db_path = self.path.clone();
        let lock = |e: rusqlite::Error| classify(e, &db_path);

        self.conn.execute_batch(CREATE_SCHEMA).map_err(lock)?;
        self.conn.execute_batch(CREATE_INDEXES).map_err(lock)?;

        self.conn
            .prepare("SELECT hash, path, size, ctime, generation FROM files LIMIT 0")
            .map_err(|e| StoreError::Schema(format!("files table has an unexpected layout: {e}")))?;

        match get_meta(&self.conn, META_SCHEMA_VERSION).map_err(lock)? {
            None => set_meta(&self.conn, META_SCHEMA_VERSION, &SCHEMA_VERSION.to_string())
                .map_err(lock)?,
            Some(version) if version == SCHEMA_VERSION.to_string() => {}
            Some(version) => {
                return Err(StoreError::Schema(format!(
                    "unsupported schema version {version} (expected {SCHEMA_VERSION})"
                )))
            }
        }

        match get_meta(&self.conn, META_ALGORITHM).map_err(lock)? {
            None => {
                set_meta(&self.conn, META_ALGORITHM, self.algorithm.name()).map_err(lock)?;
            }
            Some(name) => {
                let stored: HashAlgorithm = name
                    .parse()
                    .map_err(StoreError::Schema)?;
                match self.requested {
                    Some(requested) if requested != stored => {
                        return Err(StoreError::AlgorithmMismatch { stored, requested })
                    }
                    _ => self.algorithm = stored,
                }
            }
        }

        Ok(())
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical paths of the database file and its SQLite sidecars.
    ///
    /// Sidecars are listed whether or not they currently exist. Empty for
    /// in-memory stores.
    #[must_use]
    pub fn database_files(&self) -> Vec<PathBuf> {
        let Ok(canonical) = self.path.canonicalize() else {
            return Vec::new();
        };
        let mut files = Vec::with_capacity(SIDECAR_SUFFIXES.len() + 1);
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = canonical.clone().into_os_string();
            sidecar.push(suffix);
            files.push(PathBuf::from(sidecar));
        }
        files.push(canonical);
        files
    }

    /// Hash algorithm used by this database.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Start a scan: take the exclusive write lock and open the transaction
    /// that all scan writes go through.
    ///
    /// The returned transaction rolls back if dropped before
    /// [`ScanTransaction::rebuild_indexes`] commits it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockConflict`] if another connection holds a lock.
    pub fn begin_exclusive(&mut self) -> StoreResult<ScanTransaction<'_>> {
        let db_path = self.path.as_path();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(|e| classify(e, db_path))?;
        log::debug!("Acquired exclusive lock on {}", db_path.display());
        Ok(ScanTransaction { tx, db_path })
    }

    /// Generation of the last committed scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn last_generation(&self) -> StoreResult<Option<Generation>> {
        read_last_generation(&self.conn).map_err(|e| classify(e, &self.path))
    }

    /// Stream duplicate groups to `visit`, ordered by hash then path.
    ///
    /// Groups are assembled row by row from a single read snapshot; only
    /// one group is held in memory at a time.
    ///
    /// # Errors
    ///
    /// Returns store errors (converted into `E`) or the first error
    /// returned by `visit`.
    pub fn for_each_duplicate_group<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnMut(DuplicateGroup) -> Result<(), E>,
    {
        let lock = |e: rusqlite::Error| classify(e, &self.path);
        let snapshot = self.conn.unchecked_transaction().map_err(lock)?;
        {
            let mut stmt = snapshot.prepare(DUPLICATES_QUERY).map_err(lock)?;
            let mut rows = stmt.query([]).map_err(lock)?;
            let mut current: Option<DuplicateGroup> = None;

            while let Some(row) = rows.next().map_err(lock)? {
                let hash: String = row.get(0).map_err(lock)?;
                let path: Vec<u8> = row.get(1).map_err(lock)?;
                let size: i64 = row.get(2).map_err(lock)?;
                let path = path_from_bytes(&path);

                match current.as_mut() {
                    Some(group) if group.hash.as_str() == hash => group.paths.push(path),
                    _ => {
                        let next = DuplicateGroup {
                            hash: ContentHash::from_hex(hash),
                            size: size_from_sql(size),
                            paths: vec![path],
                        };
                        if let Some(done) = current.replace(next) {
                            visit(done)?;
                        }
                    }
                }
            }

            if let Some(done) = current {
                visit(done)?;
            }
        }
        snapshot.commit().map_err(lock)?;
        Ok(())
    }

    /// All duplicate groups, ordered by hash then path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the database is locked.
    pub fn duplicate_groups(&self) -> StoreResult<Vec<DuplicateGroup>> {
        let mut groups = Vec::new();
        self.for_each_duplicate_group(|group| {
            groups.push(group);
            Ok::<(), StoreError>(())
        })?;
        Ok(groups)
    }

    /// All live records, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the database is locked.
    pub fn records(&self) -> StoreResult<Vec<StoredRecord>> {
        let lock = |e: rusqlite::Error| classify(e, &self.path);
        let mut stmt = self
            .conn
            .prepare("SELECT hash, path, size, ctime, generation FROM files ORDER BY path")
            .map_err(lock)?;
        let records = stmt
            .query_map([], stored_record_from_row)
            .map_err(lock)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(lock)?;
        Ok(records)
    }

    /// Summary counts for the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the database is locked.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let lock = |e: rusqlite::Error| classify(e, &self.path);
        let snapshot = self.conn.unchecked_transaction().map_err(lock)?;

        let (records, distinct_hashes, total_bytes): (i64, i64, i64) = snapshot
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT hash), COALESCE(SUM(size), 0) FROM files",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(lock)?;
        let duplicate_groups: i64 = snapshot
            .query_row(
                "SELECT COUNT(*) FROM (SELECT hash FROM files GROUP BY hash HAVING COUNT(*) > 1)",
                [],
                |row| row.get(0),
            )
            .map_err(lock)?;
        let last_generation = read_last_generation(&snapshot).map_err(lock)?;
        snapshot.commit().map_err(lock)?;

        Ok(StoreStats {
            algorithm: self.algorithm,
            records: size_from_sql(records),
            distinct_hashes: size_from_sql(distinct_hashes),
            duplicate_groups: size_from_sql(duplicate_groups),
            total_bytes: size_from_sql(total_bytes),
            last_generation,
        })
    }
}

/// The single write transaction of a scan.
///
/// Holds the exclusive lock until it is committed by
/// [`rebuild_indexes`](Self::rebuild_indexes) or dropped (rolled back).
pub struct ScanTransaction<'a> {
    tx: Transaction<'a>,
    db_path: &'a Path,
}

impl ScanTransaction<'_> {
    /// Drop both secondary indexes ahead of the bulk write phase.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects the statements.
    pub fn drop_secondary_indexes(&self) -> StoreResult<()> {
        self.tx.execute_batch(DROP_INDEXES)?;
        log::trace!("Dropped secondary indexes");
        Ok(())
    }

    /// Generation of the last committed scan, read under the scan lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn last_generation(&self) -> StoreResult<Option<Generation>> {
        Ok(read_last_generation(&self.tx)?)
    }

    /// Stamp an unchanged record with `generation`.
    ///
    /// Matches on `(path, size, change_timestamp)` only; the stored hash is
    /// left untouched. Returns whether a row matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn touch(&self, record: &FingerprintRecord, generation: Generation) -> StoreResult<bool> {
        let path = path_to_bytes(&record.path);
        let changed = self
            .tx
            .prepare_cached(
                "UPDATE files SET generation = ?1 WHERE path = ?2 AND size = ?3 AND ctime = ?4",
            )?
            .execute(params![
                generation.value(),
                path.as_ref(),
                size_to_sql(record.size),
                record.change_timestamp
            ])?;
        Ok(changed > 0)
    }

    /// Insert or replace the row for `record.path`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnhashedRecord`] if the record has no content hash
    /// - [`StoreError::Database`] if the write fails
    pub fn store(
        &self,
        record: &FingerprintRecord,
        generation: Generation,
    ) -> StoreResult<StoreOutcome> {
        let hash = record
            .content_hash
            .as_ref()
            .ok_or_else(|| StoreError::UnhashedRecord(record.path.clone()))?;
        let path = path_to_bytes(&record.path);

        let existed = self
            .tx
            .prepare_cached("SELECT 1 FROM files WHERE path = ?1")?
            .exists(params![path.as_ref()])?;

        self.tx
            .prepare_cached(
                "INSERT INTO files (hash, path, size, ctime, generation)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(path) DO UPDATE SET
                     hash = excluded.hash,
                     size = excluded.size,
                     ctime = excluded.ctime,
                     generation = excluded.generation",
            )?
            .execute(params![
                hash.as_str(),
                path.as_ref(),
                size_to_sql(record.size),
                record.change_timestamp,
                generation.value()
            ])?;

        Ok(if existed {
            StoreOutcome::Updated
        } else {
            StoreOutcome::Added
        })
    }

    /// Delete every record not stamped with `generation`.
    ///
    /// Returns the deleted paths in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn purge(&self, generation: Generation) -> StoreResult<Vec<PathBuf>> {
        let mut stmt = self
            .tx
            .prepare("DELETE FROM files WHERE generation <> ?1 RETURNING path")?;
        let mut deleted = stmt
            .query_map(params![generation.value()], |row| row.get::<_, Vec<u8>>(0))?
            .map(|bytes| bytes.map(|b| path_from_bytes(&b)))
            .collect::<Result<Vec<_>, _>>()?;
        deleted.sort();
        log::debug!("Purged {} stale records", deleted.len());
        Ok(deleted)
    }

    /// Recreate the secondary indexes, record `generation` as the last
    /// completed scan and commit.
    ///
    /// # Errors
    ///
    /// Returns an error if index creation or the commit fails; the
    /// transaction is rolled back in that case.
    pub fn rebuild_indexes(self, generation: Generation) -> StoreResult<()> {
        self.tx.execute_batch(CREATE_INDEXES)?;
        set_meta(
            &self.tx,
            META_LAST_GENERATION,
            &generation.value().to_string(),
        )?;
        self.tx.commit()?;
        log::debug!("Committed generation {}", generation);
        Ok(())
    }

    /// Roll back every write of this scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub fn abort(self) -> StoreResult<()> {
        let db_path = self.db_path;
        self.tx.rollback()?;
        log::debug!("Rolled back scan on {}", db_path.display());
        Ok(())
    }
}

impl std::fmt::Debug for ScanTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanTransaction")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

/// Map busy/locked failures to [`StoreError::LockConflict`].
fn classify(err: rusqlite::Error, db_path: &Path) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked,
                ..
            },
            _,
        ) => StoreError::LockConflict(db_path.to_path_buf()),
        other => StoreError::Database(other),
    }
}

fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn read_last_generation(conn: &Connection) -> rusqlite::Result<Option<Generation>> {
    Ok(get_meta(conn, META_LAST_GENERATION)?
        .and_then(|value| value.parse::<i64>().ok())
        .map(Generation::new))
}

fn stored_record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let hash: String = row.get(0)?;
    let path: Vec<u8> = row.get(1)?;
    Ok(StoredRecord {
        content_hash: ContentHash::from_hex(hash),
        path: path_from_bytes(&path),
        size: size_from_sql(row.get(2)?),
        change_timestamp: row.get(3)?,
        generation: Generation::new(row.get(4)?),
    })
}

fn size_to_sql(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn size_from_sql(size: i64) -> u64 {
    u64::try_from(size).unwrap_or_default()
}
