use findex::cli::OutputFormat;
use findex::indexer::{Indexer, NullObserver};
use findex::report::{write_duplicates, DuplicateReport, ReportTotals};
use findex::store::{Generation, IndexStore, StoreOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn index_dir(root: &Path) -> IndexStore {
    let mut store = IndexStore::open_in_memory(&StoreOptions::default()).unwrap();
    Indexer::default()
        .index(&mut store, root, Generation::new(1), &mut NullObserver)
        .unwrap();
    store
}

#[test]
fn test_groups_only_shared_hashes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a1"), b"alpha").unwrap();
    fs::write(dir.path().join("a2"), b"alpha").unwrap();
    fs::write(dir.path().join("a3"), b"alpha").unwrap();
    fs::write(dir.path().join("b1"), b"beta!").unwrap();
    fs::write(dir.path().join("b2"), b"beta!").unwrap();
    fs::write(dir.path().join("unique"), b"gamma").unwrap();

    let store = index_dir(dir.path());
    let report = DuplicateReport::from_store(&store).unwrap();

    assert_eq!(report.groups().len(), 2);
    assert_eq!(report.file_count(), 5);
    assert_eq!(report.reclaimable_bytes(), 5 * 2 + 5);

    let hashes: Vec<&str> = report.groups().iter().map(|g| g.hash.as_str()).collect();
    let mut sorted = hashes.clone();
    sorted.sort_unstable();
    assert_eq!(hashes, sorted);

    let unique = dir.path().join("unique").canonicalize().unwrap();
    assert!(report
        .groups()
        .iter()
        .all(|g| g.paths.iter().all(|p| *p != unique)));
    for group in report.groups() {
        let mut paths = group.paths.clone();
        paths.sort();
        assert_eq!(paths, group.paths);
    }
}

#[test]
fn test_empty_files_form_a_group() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("empty1"), b"").unwrap();
    fs::write(dir.path().join("empty2"), b"").unwrap();

    let store = index_dir(dir.path());
    let groups = store.duplicate_groups().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
    assert_eq!(groups[0].hash.as_str(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
}

#[test]
fn test_report_formats_from_real_index() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello").unwrap();
    fs::write(dir.path().join("b.txt"), b"hello").unwrap();
    let store = index_dir(dir.path());
    let report = DuplicateReport::from_store(&store).unwrap();

    let mut text = Vec::new();
    report.write_to(&mut text, OutputFormat::Text).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.starts_with("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d  2 files × "));
    assert!(text.contains("1 duplicate groups, 2 files, "));

    let mut json = Vec::new();
    report.write_to(&mut json, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value["duplicates"][0]["files"].as_array().unwrap().len(), 2);

    let mut csv = Vec::new();
    report.write_to(&mut csv, OutputFormat::Csv).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 3);
}

#[test]
fn test_streamed_report_matches_collected_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a1"), b"alpha").unwrap();
    fs::write(dir.path().join("a2"), b"alpha").unwrap();
    fs::write(dir.path().join("b1"), b"beta!").unwrap();
    fs::write(dir.path().join("b2"), b"beta!").unwrap();
    fs::write(dir.path().join("b3"), b"beta!").unwrap();
    let store = index_dir(dir.path());
    let report = DuplicateReport::from_store(&store).unwrap();

    for format in [OutputFormat::Text, OutputFormat::Csv, OutputFormat::Json] {
        let mut streamed = Vec::new();
        let totals = write_duplicates(&store, &mut streamed, format).unwrap();
        let mut collected = Vec::new();
        report.write_to(&mut collected, format).unwrap();

        assert_eq!(streamed, collected, "{format} output differs");
        assert_eq!(totals, report.totals());
    }
    assert_eq!(
        report.totals(),
        ReportTotals {
            groups: 2,
            files: 5,
            reclaimable_bytes: 5 + 5 * 2,
        }
    );
}

#[test]
fn test_streamed_report_without_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only"), b"single").unwrap();
    let store = index_dir(dir.path());

    let mut text = Vec::new();
    let totals = write_duplicates(&store, &mut text, OutputFormat::Text).unwrap();
    assert!(totals.is_empty());
    assert_eq!(String::from_utf8(text).unwrap(), "No duplicate files found.\n");

    let mut csv = Vec::new();
    write_duplicates(&store, &mut csv, OutputFormat::Csv).unwrap();
    assert!(csv.is_empty());
}

#[test]
fn test_stats_after_index() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello").unwrap();
    fs::write(dir.path().join("b.txt"), b"hello").unwrap();
    fs::write(dir.path().join("c.txt"), b"world").unwrap();
    let store = index_dir(dir.path());

    let stats = store.stats().unwrap();

    assert_eq!(stats.records, 3);
    assert_eq!(stats.distinct_hashes, 2);
    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.total_bytes, 15);
    assert_eq!(stats.last_generation, Some(Generation::new(1)));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_paths_round_trip() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let name = OsStr::from_bytes(b"caf\xe9.txt");
    if fs::write(dir.path().join(name), b"same").is_err() {
        // Filesystem rejects non-UTF-8 names.
        return;
    }
    fs::write(dir.path().join("plain.txt"), b"same").unwrap();

    let store = index_dir(dir.path());
    let groups = store.duplicate_groups().unwrap();

    assert_eq!(groups.len(), 1);
    let expected = dir.path().canonicalize().unwrap().join(name);
    assert!(groups[0].paths.contains(&expected));
}
