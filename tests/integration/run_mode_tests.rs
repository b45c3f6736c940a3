use dupsift::config::{Config, ScanConfig};
use dupsift::duplicates::{DuplicateFinder, RunMode};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn populate(root: &Path, files: usize) {
    fs::create_dir_all(root).unwrap();
    for i in 0..files {
        let sub = root.join(format!("d{}", i % 5));
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(format!("f{i}")), format!("payload {}", i % 7)).unwrap();
    }
}

fn report_lines(path: &Path) -> BTreeSet<BTreeSet<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split("; ").skip(1).map(str::to_string).collect())
        .collect()
}

#[test]
fn test_detached_matches_blocking() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    populate(&root, 40);

    let blocking_out = dir.path().join("blocking.csv");
    let scan = ScanConfig::new(&root, &blocking_out, &Config::default()).unwrap();
    assert_eq!(scan.run_mode, RunMode::Blocking);
    let blocking = DuplicateFinder::new(scan).run().unwrap();

    let detached_out = dir.path().join("detached.csv");
    let config = Config {
        detached: true,
        ..Config::default()
    };
    let scan = ScanConfig::new(&root, &detached_out, &config).unwrap();
    assert_eq!(scan.run_mode, RunMode::Detached);
    let detached = DuplicateFinder::new(scan).run().unwrap();

    assert_eq!(blocking.duplicate_groups(), 7);
    assert_eq!(blocking.duplicate_groups(), detached.duplicate_groups());
    assert_eq!(blocking.duplicate_files(), detached.duplicate_files());
    assert_eq!(report_lines(&blocking_out), report_lines(&detached_out));
}

#[test]
fn test_spawned_scan_can_be_awaited() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    populate(&root, 20);
    let export = dir.path().join("report.csv");

    let scan = ScanConfig::new(&root, &export, &Config::default()).unwrap();
    let handle = DuplicateFinder::new(scan).spawn().unwrap();
    let summary = handle.wait().unwrap();

    assert_eq!(summary.crawl.fingerprinted, 20);
    assert!(summary.has_duplicates());
    assert_eq!(report_lines(&export).len(), summary.duplicate_groups());
}

#[test]
fn test_spawned_scan_eventually_finishes() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    populate(&root, 5);
    let export = dir.path().join("report.csv");

    let scan = ScanConfig::new(&root, &export, &Config::default()).unwrap();
    let handle = DuplicateFinder::new(scan).spawn().unwrap();
    while !handle.is_finished() {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    assert!(export.exists());
    handle.wait().unwrap();
}

#[test]
fn test_minimal_channel_capacity() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    populate(&root, 100);
    let export = dir.path().join("report.csv");

    let config = Config {
        channel_capacity: 1,
        detached: true,
        ..Config::default()
    };
    let scan = ScanConfig::new(&root, &export, &config).unwrap();
    let summary = DuplicateFinder::new(scan).run().unwrap();

    assert_eq!(summary.crawl.fingerprinted, 100);
    assert_eq!(summary.filter.received, 100);
    assert_eq!(summary.duplicate_groups(), 7);
    assert_eq!(summary.duplicate_files(), 100);
}
