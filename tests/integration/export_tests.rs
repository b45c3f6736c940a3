use dupsift::config::{Config, ScanConfig};
use dupsift::duplicates::DuplicateFinder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Root with one duplicate pair `x/A`, `x/B` and one unique file.
fn setup() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir_all(root.join("x")).unwrap();
    fs::write(root.join("x").join("A"), b"duplicate").unwrap();
    fs::write(root.join("x").join("B"), b"duplicate").unwrap();
    fs::write(root.join("unique"), b"single").unwrap();
    (dir, root)
}

fn export_with(root: &Path, export: &Path, config: &Config) -> Vec<u8> {
    let scan = ScanConfig::new(root, export, config).unwrap();
    DuplicateFinder::new(scan).run().unwrap();
    fs::read(export).unwrap()
}

#[test]
fn test_custom_split_symbol() {
    let (dir, root) = setup();
    let export = dir.path().join("report.csv");
    let config = Config {
        split_symbol: "|".to_string(),
        ..Config::default()
    };

    let content = String::from_utf8(export_with(&root, &export, &config)).unwrap();
    let line = content.trim_end_matches('\n');
    let fields: Vec<&str> = line.split('|').collect();

    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "9");
    assert!(!line.contains("; "));
}

#[test]
fn test_prefix_path_is_prepended_to_every_path() {
    let (dir, root) = setup();
    let export = dir.path().join("report.csv");
    let config = Config {
        prefix_path: "S:".to_string(),
        ..Config::default()
    };

    let content = String::from_utf8(export_with(&root, &export, &config)).unwrap();
    let fields: Vec<&str> = content.trim_end().split("; ").collect();

    assert_eq!(fields.len(), 3);
    for path in &fields[1..] {
        assert!(path.starts_with(&format!("S:{}", root.display())), "{path}");
    }
}

#[cfg(unix)]
#[test]
fn test_separator_replaced_after_prefix() {
    let (dir, root) = setup();
    let export = dir.path().join("report.csv");
    let config = Config {
        prefix_path: "/mnt".to_string(),
        separator: Some("\\".to_string()),
        ..Config::default()
    };

    let content = String::from_utf8(export_with(&root, &export, &config)).unwrap();
    let fields: Vec<&str> = content.trim_end().split("; ").collect();
    let expected_a = format!("/mnt{}", root.join("x").join("A").display()).replace('/', "\\");
    let expected_b = format!("/mnt{}", root.join("x").join("B").display()).replace('/', "\\");

    assert!(!fields[1].contains('/'));
    assert!(fields[1..].contains(&expected_a.as_str()));
    assert!(fields[1..].contains(&expected_b.as_str()));
}

#[cfg(unix)]
#[test]
fn test_latin1_export_drops_unmappable_characters() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("café"), b"same bytes").unwrap();
    fs::write(root.join("日本"), b"same bytes").unwrap();

    let export = dir.path().join("report.csv");
    let config = Config {
        encoding: Some("latin1".to_string()),
        ..Config::default()
    };
    let bytes = export_with(&root, &export, &config);

    assert!(String::from_utf8(bytes.clone()).is_err());
    let root_bytes = root.display().to_string().into_bytes();
    let mut cafe = root_bytes.clone();
    cafe.extend_from_slice(b"/caf\xe9");
    let mut dropped = root_bytes;
    dropped.extend_from_slice(b"/");

    let fields: Vec<&[u8]> = bytes
        .strip_suffix(b"\n")
        .unwrap()
        .split(|&b| b == b';')
        .map(|field| field.strip_prefix(b" ").unwrap_or(field))
        .collect();
    assert_eq!(fields[0], b"10");
    assert!(fields[1..].contains(&cafe.as_slice()));
    assert!(fields[1..].contains(&dropped.as_slice()));
}

#[test]
fn test_utf8_label_writes_plain_utf8() {
    let (dir, root) = setup();
    let export = dir.path().join("report.csv");
    let config = Config {
        encoding: Some("utf-8".to_string()),
        ..Config::default()
    };

    let bytes = export_with(&root, &export, &config);
    assert!(String::from_utf8(bytes).is_ok());
}

#[test]
fn test_existing_report_is_replaced() {
    let (dir, root) = setup();
    let export = dir.path().join("report.csv");
    fs::write(&export, "stale line 1\nstale line 2\n").unwrap();

    let content = String::from_utf8(export_with(&root, &export, &Config::default())).unwrap();

    assert!(!content.contains("stale"));
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_every_line_ends_with_newline() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    for (name, content) in [("a1", "aa"), ("a2", "aa"), ("b1", "bbb"), ("b2", "bbb")] {
        fs::write(root.join(name), content).unwrap();
    }
    let export = dir.path().join("report.csv");

    let content = String::from_utf8(export_with(&root, &export, &Config::default())).unwrap();

    assert!(content.ends_with('\n'));
    assert_eq!(content.matches('\n').count(), 2);
}
