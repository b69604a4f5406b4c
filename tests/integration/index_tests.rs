use findex::indexer::{FileAction, IndexError, Indexer, IndexerConfig, RecordingObserver};
use findex::scanner::{HashAlgorithm, Hasher, WalkerConfig};
use findex::store::{Generation, IndexStore, StoreOptions, StoredRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

/// Data directory plus a separate directory for the database.
struct Fixture {
    data: TempDir,
    db_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            data: tempdir().unwrap(),
            db_dir: tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.data.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn canonical(&self, name: &str) -> PathBuf {
        self.data.path().join(name).canonicalize().unwrap()
    }

    fn db_path(&self) -> PathBuf {
        self.db_dir.path().join("files.db")
    }

    fn open(&self) -> IndexStore {
        IndexStore::open(&self.db_path(), &StoreOptions::default()).unwrap()
    }

    fn scan(
        &self,
        store: &mut IndexStore,
        generation: i64,
    ) -> (findex::indexer::IndexSummary, RecordingObserver) {
        self.scan_with(store, generation, WalkerConfig::default())
    }

    fn scan_with(
        &self,
        store: &mut IndexStore,
        generation: i64,
        walker: WalkerConfig,
    ) -> (findex::indexer::IndexSummary, RecordingObserver) {
        let mut observer = RecordingObserver::default();
        let summary = Indexer::new(IndexerConfig::new(walker))
            .index(
                store,
                self.data.path(),
                Generation::new(generation),
                &mut observer,
            )
            .unwrap();
        (summary, observer)
    }
}

fn find<'a>(records: &'a [StoredRecord], path: &Path) -> &'a StoredRecord {
    records
        .iter()
        .find(|r| r.path == path)
        .unwrap_or_else(|| panic!("no record for {}", path.display()))
}

#[test]
fn test_hello_world_scenario() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    fx.write("c.txt", b"world");
    let mut store = fx.open();

    let (summary, observer) = fx.scan(&mut store, 1);

    assert_eq!(summary.added, 3);
    assert_eq!(summary.deleted, 0);
    assert!(!summary.has_errors());
    assert_eq!(
        observer.paths(FileAction::Added),
        vec![fx.canonical("a.txt"), fx.canonical("b.txt"), fx.canonical("c.txt")]
    );

    let groups = store.duplicate_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].hash.as_str(), HELLO_SHA1);
    assert_eq!(groups[0].size, 5);
    assert_eq!(
        groups[0].paths,
        vec![fx.canonical("a.txt"), fx.canonical("b.txt")]
    );
}

#[test]
fn test_rescan_is_idempotent() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    fx.write("sub/c.txt", b"world");
    let mut store = fx.open();

    fx.scan(&mut store, 1);
    let before = store.records().unwrap();

    let (summary, observer) = fx.scan(&mut store, 2);
    let after = store.records().unwrap();

    assert_eq!(summary.touched, 3);
    assert_eq!(summary.hashed_files, 0);
    assert_eq!(summary.hashed_bytes, 0);
    assert!(observer.events.is_empty());

    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.path, new.path);
        assert_eq!(old.content_hash, new.content_hash);
        assert_eq!(old.size, new.size);
        assert_eq!(old.change_timestamp, new.change_timestamp);
        assert_eq!(old.generation, Generation::new(1));
        assert_eq!(new.generation, Generation::new(2));
    }
    assert_eq!(store.last_generation().unwrap(), Some(Generation::new(2)));
}

#[test]
fn test_database_inside_root_is_not_indexed() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    let db = fx.data.path().join("files.db");
    let mut store = IndexStore::open(&db, &StoreOptions::default()).unwrap();

    let (summary, observer) = fx.scan(&mut store, 1);
    assert_eq!(summary.files_seen, 1);
    assert_eq!(observer.paths(FileAction::Added), vec![fx.canonical("a.txt")]);

    for generation in 2..=3 {
        let (summary, observer) = fx.scan(&mut store, generation);
        assert!(observer.events.is_empty());
        assert_eq!(summary.touched, 1);
        assert_eq!(summary.hashed_files, 0);
    }

    let records = store.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, fx.canonical("a.txt"));
    assert!(records.iter().all(|r| r.path.exists()));
}

#[test]
fn test_deleted_file_is_purged() {
    let fx = Fixture::new();
    let a = fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    let mut store = fx.open();

    fx.scan(&mut store, 1);
    let a_canonical = fx.canonical("a.txt");
    fs::remove_file(&a).unwrap();

    let (summary, observer) = fx.scan(&mut store, 2);

    assert_eq!(summary.deleted, 1);
    assert_eq!(observer.paths(FileAction::Deleted), vec![a_canonical.as_path()]);

    let records = store.records().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| r.path != a_canonical));
    assert!(store.duplicate_groups().unwrap().is_empty());
}

#[test]
fn test_modified_file_is_rehashed() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    let b = fx.write("b.txt", b"hello");
    let mut store = fx.open();

    fx.scan(&mut store, 1);
    fs::write(&b, b"hello, again").unwrap();

    let (summary, observer) = fx.scan(&mut store, 2);

    assert_eq!(summary.touched, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.hashed_files, 1);
    assert_eq!(summary.hashed_bytes, 12);
    assert_eq!(observer.paths(FileAction::Updated), vec![fx.canonical("b.txt")]);

    let records = store.records().unwrap();
    let record = find(&records, &fx.canonical("b.txt"));
    let expected = Hasher::new(HashAlgorithm::Sha1).hash_bytes(b"hello, again");
    assert_eq!(record.content_hash, expected);
    assert_eq!(record.size, 12);
    assert!(store.duplicate_groups().unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn test_same_size_edit_detected_despite_restored_mtime() {
    use filetime::FileTime;

    let fx = Fixture::new();
    let a = fx.write("a.txt", b"hello");
    let mut store = fx.open();
    fx.scan(&mut store, 1);

    let original_mtime = FileTime::from_last_modification_time(&fs::metadata(&a).unwrap());
    // Give coarse-grained timestamps a chance to advance.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    fs::write(&a, b"jello").unwrap();
    filetime::set_file_mtime(&a, original_mtime).unwrap();

    let (summary, _) = fx.scan(&mut store, 2);

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.touched, 0);
    let records = store.records().unwrap();
    assert_eq!(
        records[0].content_hash,
        Hasher::new(HashAlgorithm::Sha1).hash_bytes(b"jello")
    );
}

#[test]
fn test_newly_ignored_files_are_purged() {
    let fx = Fixture::new();
    fx.write("keep.txt", b"keep");
    fx.write("drop.log", b"drop");
    let mut store = fx.open();
    fx.scan(&mut store, 1);

    let walker = WalkerConfig {
        ignore_patterns: vec!["*.log".to_string()],
        ..Default::default()
    };
    let (summary, observer) = fx.scan_with(&mut store, 2, walker);

    assert_eq!(summary.files_seen, 1);
    assert_eq!(observer.paths(FileAction::Deleted), vec![fx.canonical("drop.log")]);
    assert_eq!(store.records().unwrap().len(), 1);
}

#[test]
fn test_hidden_files_skipped_when_requested() {
    let fx = Fixture::new();
    fx.write("visible.txt", b"same");
    fx.write(".hidden/inner.txt", b"same");
    let mut store = fx.open();

    let walker = WalkerConfig {
        skip_hidden: true,
        ..Default::default()
    };
    let (summary, _) = fx.scan_with(&mut store, 1, walker);

    assert_eq!(summary.added, 1);
    assert!(store.duplicate_groups().unwrap().is_empty());
}

#[test]
fn test_scanning_subdirectory_purges_outside_records() {
    let fx = Fixture::new();
    fx.write("top.txt", b"top");
    fx.write("sub/inner.txt", b"inner");
    let mut store = fx.open();
    fx.scan(&mut store, 1);

    let mut observer = RecordingObserver::default();
    let summary = Indexer::default()
        .index(
            &mut store,
            &fx.data.path().join("sub"),
            Generation::new(2),
            &mut observer,
        )
        .unwrap();

    assert_eq!(summary.touched, 1);
    assert_eq!(observer.paths(FileAction::Deleted), vec![fx.canonical("top.txt")]);
}

#[test]
fn test_single_file_root() {
    let fx = Fixture::new();
    let a = fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    let mut store = fx.open();

    let summary = Indexer::default()
        .index(
            &mut store,
            &a,
            Generation::new(1),
            &mut RecordingObserver::default(),
        )
        .unwrap();

    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.added, 1);
    assert_eq!(store.records().unwrap()[0].path, fx.canonical("a.txt"));
}

#[test]
fn test_empty_directory_purges_everything() {
    let fx = Fixture::new();
    let a = fx.write("a.txt", b"hello");
    let mut store = fx.open();
    fx.scan(&mut store, 1);

    fs::remove_file(a).unwrap();
    let (summary, _) = fx.scan(&mut store, 2);

    assert_eq!(summary.files_seen, 0);
    assert_eq!(summary.deleted, 1);
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn test_missing_root_keeps_existing_records() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    let mut store = fx.open();
    fx.scan(&mut store, 1);

    let err = Indexer::default()
        .index(
            &mut store,
            &fx.data.path().join("does-not-exist"),
            Generation::new(2),
            &mut RecordingObserver::default(),
        )
        .unwrap_err();

    assert!(matches!(err, IndexError::Root(_)));
    assert_eq!(store.records().unwrap().len(), 1);
    assert_eq!(store.last_generation().unwrap(), Some(Generation::new(1)));
}

#[test]
fn test_stale_generation_leaves_store_untouched() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    let mut store = fx.open();
    fx.scan(&mut store, 10);

    let err = Indexer::default()
        .index(
            &mut store,
            fx.data.path(),
            Generation::new(9),
            &mut RecordingObserver::default(),
        )
        .unwrap_err();

    assert!(matches!(err, IndexError::StaleGeneration { .. }));
    assert_eq!(store.records().unwrap()[0].generation, Generation::new(10));
}

#[test]
fn test_interrupted_scan_rolls_back() {
    let fx = Fixture::new();
    let a = fx.write("a.txt", b"hello");
    let mut store = fx.open();
    fx.scan(&mut store, 1);
    let a_canonical = fx.canonical("a.txt");

    fs::remove_file(a).unwrap();
    fx.write("b.txt", b"new");
    let flag = Arc::new(AtomicBool::new(true));
    let indexer = Indexer::new(IndexerConfig::default().with_shutdown_flag(flag));

    let err = indexer
        .index(
            &mut store,
            fx.data.path(),
            Generation::new(2),
            &mut RecordingObserver::default(),
        )
        .unwrap_err();

    assert!(matches!(err, IndexError::Interrupted));
    let records = store.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, a_canonical);
    assert_eq!(records[0].generation, Generation::new(1));
}

#[test]
fn test_index_persists_across_reopen() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    {
        let mut store = fx.open();
        fx.scan(&mut store, 1);
    }

    let mut store = fx.open();
    let (summary, _) = fx.scan(&mut store, 2);

    assert_eq!(summary.touched, 2);
    assert_eq!(store.duplicate_groups().unwrap().len(), 1);
}

#[test]
fn test_blake3_index() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    fx.write("b.txt", b"hello");
    let options = StoreOptions::default().with_algorithm(HashAlgorithm::Blake3);
    let mut store = IndexStore::open(&fx.db_path(), &options).unwrap();

    fx.scan(&mut store, 1);

    let groups = store.duplicate_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].hash.as_str(), blake3::hash(b"hello").to_hex().as_str());
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    fx.write("ok.txt", b"fine");
    let secret = fx.write("secret.txt", b"hidden");
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
    // Root can read anything; nothing to test then.
    if fs::read(&secret).is_ok() {
        return;
    }
    let mut store = fx.open();

    let (summary, observer) = fx.scan(&mut store, 1);

    assert_eq!(summary.added, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(observer.errors, vec![fx.canonical("secret.txt")]);
    assert_eq!(store.records().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_reported_when_following() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    std::os::unix::fs::symlink(
        fx.data.path().join("missing"),
        fx.data.path().join("dangling"),
    )
    .unwrap();
    let mut store = fx.open();

    let walker = WalkerConfig {
        follow_symlinks: true,
        ..Default::default()
    };
    let (summary, _) = fx.scan_with(&mut store, 1, walker);

    assert_eq!(summary.added, 1);
    assert_eq!(summary.errors.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlink_to_indexed_file_is_not_duplicated() {
    let fx = Fixture::new();
    fx.write("a.txt", b"hello");
    std::os::unix::fs::symlink(fx.data.path().join("a.txt"), fx.data.path().join("link"))
        .unwrap();
    let mut store = fx.open();

    let walker = WalkerConfig {
        follow_symlinks: true,
        ..Default::default()
    };
    let (summary, _) = fx.scan_with(&mut store, 1, walker);

    assert_eq!(summary.files_seen, 2);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.touched, 1);
    assert_eq!(store.records().unwrap().len(), 1);
}
