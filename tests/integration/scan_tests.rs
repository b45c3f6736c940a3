use dupsift::config::{Config, ScanConfig};
use dupsift::duplicates::{DuplicateFinder, ScanSummary};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scan(root: &Path, export: &Path, config: &Config) -> ScanSummary {
    let scan = ScanConfig::new(root, export, config).unwrap();
    DuplicateFinder::new(scan).run().unwrap()
}

/// Parse a report into (size, set of paths) per line, in file order.
fn read_report(export: &Path) -> Vec<(u64, BTreeSet<String>)> {
    fs::read_to_string(export)
        .unwrap()
        .lines()
        .map(|line| {
            let mut fields = line.split("; ");
            let size = fields.next().unwrap().parse().unwrap();
            (size, fields.map(str::to_string).collect())
        })
        .collect()
}

fn path_set(paths: &[&Path]) -> BTreeSet<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

#[test]
fn test_scan_reports_single_duplicate_pair() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let a = root.join("A");
    let b = root.join("B");
    fs::write(&a, b"XXXXXXXXXX").unwrap();
    fs::write(&b, b"XXXXXXXXXX").unwrap();
    fs::write(root.join("C"), b"YYYYY").unwrap();

    let export = dir.path().join("report.csv");
    let summary = scan(&root, &export, &Config::default());

    assert_eq!(summary.crawl.fingerprinted, 3);
    assert_eq!(read_report(&export), vec![(10, path_set(&[&a, &b]))]);

    let line = fs::read_to_string(&export).unwrap();
    let expected_ab = format!("10; {}; {}\n", a.display(), b.display());
    let expected_ba = format!("10; {}; {}\n", b.display(), a.display());
    assert!(line == expected_ab || line == expected_ba, "unexpected line: {line}");
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let export = dir.path().join("report.csv");

    let summary = scan(&root, &export, &Config::default());

    assert_eq!(summary.crawl.visited, 0);
    assert_eq!(summary.duplicate_groups(), 0);
    assert!(export.exists());
    assert_eq!(fs::read_to_string(&export).unwrap(), "");
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), b"content a").unwrap();
    fs::write(root.join("b.txt"), b"content b").unwrap();
    fs::write(root.join("c.txt"), b"content c").unwrap();

    let export = dir.path().join("report.csv");
    let summary = scan(&root, &export, &Config::default());

    assert_eq!(summary.crawl.fingerprinted, 3);
    assert_eq!(summary.filter.forwarded, 0);
    assert!(read_report(&export).is_empty());
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    let deep = root.join("one").join("two");
    fs::create_dir_all(&deep).unwrap();
    let top = root.join("top.bin");
    let nested = deep.join("nested.bin");
    fs::write(&top, b"shared bytes").unwrap();
    fs::write(&nested, b"shared bytes").unwrap();

    let export = dir.path().join("report.csv");
    scan(&root, &export, &Config::default());

    assert_eq!(read_report(&export), vec![(12, path_set(&[&top, &nested]))]);
}

#[test]
fn test_scan_multiple_groups() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let names = ["a1", "a2", "a3", "b1", "b2", "c1"];
    for name in names {
        let content = match name.as_bytes()[0] {
            b'a' => "alpha content",
            b'b' => "beta",
            _ => "gamma",
        };
        fs::write(root.join(name), content).unwrap();
    }

    let export = dir.path().join("report.csv");
    let summary = scan(&root, &export, &Config::default());

    let mut report = read_report(&export);
    report.sort();
    let a: Vec<_> = ["a1", "a2", "a3"].iter().map(|n| root.join(n)).collect();
    let b: Vec<_> = ["b1", "b2"].iter().map(|n| root.join(n)).collect();
    let mut expected = vec![
        (13, path_set(&a.iter().map(|p| p.as_path()).collect::<Vec<_>>())),
        (4, path_set(&b.iter().map(|p| p.as_path()).collect::<Vec<_>>())),
    ];
    expected.sort();

    assert_eq!(report, expected);
    assert_eq!(summary.duplicate_files(), 5);
    assert_eq!(summary.reclaimable_space(), 13 * 2 + 4);
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    for i in 0..10 {
        fs::write(root.join(format!("f{i}")), format!("content {}", i % 3)).unwrap();
        fs::write(root.join("sub").join(format!("g{i}")), format!("content {}", i % 4)).unwrap();
    }

    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    scan(&root, &first, &Config::default());
    scan(&root, &second, &Config::default());

    let mut a = read_report(&first);
    let mut b = read_report(&second);
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert!(!a.is_empty());
}

#[test]
fn test_every_algorithm_finds_the_same_groups() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("x1"), b"same").unwrap();
    fs::write(root.join("x2"), b"same").unwrap();
    fs::write(root.join("y"), b"diff").unwrap();

    for name in ["md5", "sha1", "sha224", "sha256", "sha384", "sha512", "blake3"] {
        let export = dir.path().join(format!("{name}.csv"));
        let config = Config {
            hash_function: name.to_string(),
            ..Config::default()
        };
        scan(&root, &export, &config);
        assert_eq!(
            read_report(&export),
            vec![(4, path_set(&[&root.join("x1"), &root.join("x2")]))],
            "algorithm {name}"
        );
    }
}
