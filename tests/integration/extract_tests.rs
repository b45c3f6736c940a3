use dupsift::config::{Config, ScanConfig};
use dupsift::duplicates::DuplicateFinder;
use dupsift::output::{extract_per_directory, ExtractError, Extractor};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_extract_after_scan() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("share");
    let alice = root.join("alice");
    let bob = root.join("bob");
    fs::create_dir_all(&alice).unwrap();
    fs::create_dir_all(&bob).unwrap();
    fs::write(alice.join("report.doc"), b"quarterly numbers").unwrap();
    fs::write(bob.join("copy.doc"), b"quarterly numbers").unwrap();
    fs::write(bob.join("a.txt"), b"bob only").unwrap();
    fs::write(bob.join("b.txt"), b"bob only").unwrap();

    let report = dir.path().join("report.csv");
    let scan = ScanConfig::new(&root, &report, &Config::default()).unwrap();
    DuplicateFinder::new(scan).run().unwrap();

    let out = dir.path().join("alice.csv");
    let target = alice.display().to_string();
    let lines = Extractor::new(target.as_str(), "; ")
        .extract_file(&report, &out)
        .unwrap();

    assert_eq!(lines, 1);
    let content = fs::read_to_string(&out).unwrap();
    let expected = format!(
        "17; {}; {}\n",
        alice.join("report.doc").display(),
        bob.join("copy.doc").display()
    );
    assert_eq!(content, expected);
}

#[test]
fn test_extract_reorders_target_paths_first() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("report.csv");
    fs::write(
        &report,
        "10; /x/1; /share/bob/1; /y/1; /share/bob/2\n5; /x/2; /y/2\n",
    )
    .unwrap();
    let out = dir.path().join("bob.csv");

    let lines = Extractor::new("/share/bob", "; ")
        .extract_file(&report, &out)
        .unwrap();

    assert_eq!(lines, 1);
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "10; /share/bob/1; /share/bob/2; /x/1; /y/1\n"
    );
}

#[test]
fn test_extract_without_matches_creates_empty_file() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("report.csv");
    fs::write(&report, "10; /a; /b\n").unwrap();
    let out = dir.path().join("none.csv");

    let lines = Extractor::new("/elsewhere", "; ")
        .extract_file(&report, &out)
        .unwrap();

    assert_eq!(lines, 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn test_extract_missing_report() {
    let dir = tempdir().unwrap();
    let err = Extractor::new("/a", "; ")
        .extract_file(&dir.path().join("missing.csv"), &dir.path().join("out.csv"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Read { .. }));
}

#[cfg(unix)]
#[test]
fn test_extract_per_directory() {
    let dir = tempdir().unwrap();
    let share = dir.path().join("share");
    fs::create_dir_all(share.join("alice")).unwrap();
    fs::create_dir_all(share.join("bob")).unwrap();
    fs::create_dir_all(share.join("carol")).unwrap();
    fs::write(share.join("not-a-dir.txt"), b"x").unwrap();

    let report = dir.path().join("report.csv");
    fs::write(
        &report,
        format!(
            "7; {m}/alice/a; {m}/bob/a\n3; {m}/bob/b; /other/b\n",
            m = share.display()
        ),
    )
    .unwrap();

    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let results = extract_per_directory(&share, &report, &out_dir, "; ", "").unwrap();
    let names: Vec<_> = results
        .iter()
        .map(|(path, lines)| (path.file_name().unwrap().to_string_lossy().into_owned(), *lines))
        .collect();

    assert_eq!(
        names,
        vec![
            ("alice.csv".to_string(), 1),
            ("bob.csv".to_string(), 2),
            ("carol.csv".to_string(), 0),
        ]
    );
    let bob = fs::read_to_string(out_dir.join("bob.csv")).unwrap();
    assert_eq!(
        bob,
        format!(
            "7; {m}/bob/a; {m}/alice/a\n3; {m}/bob/b; /other/b\n",
            m = share.display()
        )
    );
}

#[cfg(unix)]
#[test]
fn test_extract_per_directory_strips_local_prefix() {
    let dir = tempdir().unwrap();
    let share = dir.path().join("share");
    fs::create_dir_all(share.join("alice")).unwrap();

    // The report mentions the share relative to the temp directory
    let report = dir.path().join("report.csv");
    fs::write(&report, "4; /share/alice/x; /share/y\n").unwrap();
    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let local = dir.path().display().to_string();
    let results = extract_per_directory(&share, &report, &out_dir, "; ", &local).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, 1);
    assert_eq!(
        fs::read_to_string(out_dir.join("alice.csv")).unwrap(),
        "4; /share/alice/x; /share/y\n"
    );
}

#[test]
fn test_extract_per_directory_rejects_files() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, b"x").unwrap();

    let err = extract_per_directory(&file, &file, dir.path(), "; ", "").unwrap_err();
    assert!(matches!(err, ExtractError::NotADirectory(_)));
}
