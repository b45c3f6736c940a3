use clap::Parser;
use dupsift::cli::Cli;
use dupsift::error::{ExitCode, StructuredError};
use dupsift::run_app;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Temp dir with an empty config file, so runs never read the user's config.
fn workspace() -> (TempDir, String) {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    let config = config.display().to_string();
    (dir, config)
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap();
    run_app(cli)
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_scan_with_duplicates_exits_success() {
    let (dir, config) = workspace();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), b"same").unwrap();
    fs::write(root.join("b"), b"same").unwrap();
    let export = dir.path().join("out.csv");

    let code = run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&export),
        "--no-progress",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_to_string(&export).unwrap().lines().count(), 1);
}

#[test]
fn test_scan_without_duplicates_exits_no_duplicates() {
    let (dir, config) = workspace();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), b"one").unwrap();
    fs::write(root.join("b"), b"two").unwrap();
    let export = dir.path().join("out.csv");

    let code = run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&export),
    ])
    .unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(export.exists());
}

#[test]
fn test_scan_flags_reach_the_report() {
    let (dir, config) = workspace();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), b"same").unwrap();
    fs::write(root.join("b"), b"same").unwrap();
    let export = dir.path().join("out.csv");

    let code = run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&export),
        "-f",
        "blake3",
        "-b",
        "all",
        "-S",
        " | ",
        "-p",
        "X:",
        "--daemon",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let content = fs::read_to_string(&export).unwrap();
    assert!(content.starts_with("4 | X:"), "{content}");
}

#[test]
fn test_missing_root_is_a_config_error() {
    let (dir, config) = workspace();
    let root = dir.path().join("missing");
    let export = dir.path().join("out.csv");

    let err = run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&export),
    ])
    .unwrap_err();

    let code = ExitCode::from_error(&err);
    assert_eq!(code, ExitCode::ConfigError);
    assert_eq!(code.as_i32(), 4);
    assert!(!export.exists());

    let structured = StructuredError::new(&err, code);
    assert_eq!(structured.code, "DS004");
    assert!(structured.message.contains("Root directory not found"));
}

#[test]
fn test_bad_algorithm_is_a_config_error() {
    let (dir, config) = workspace();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();

    let err = run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&dir.path().join("out.csv")),
        "-f",
        "shaa1",
    ])
    .unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
    assert!(err.to_string().contains("did you mean 'sha1'?"));
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let missing = dir.path().join("missing.toml");

    let err = run(&[
        "dupsift",
        "-q",
        "--config",
        &arg(&missing),
        "scan",
        &arg(&root),
        &arg(&dir.path().join("out.csv")),
    ])
    .unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
}

#[test]
fn test_save_config_writes_effective_settings() {
    let (dir, config) = workspace();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let saved = dir.path().join("saved").join("config.toml");

    run(&[
        "dupsift",
        "-q",
        "--config",
        &config,
        "scan",
        &arg(&root),
        &arg(&dir.path().join("out.csv")),
        "-f",
        "sha256",
        "--save-config",
        &arg(&saved),
    ])
    .unwrap();

    let saved = fs::read_to_string(&saved).unwrap();
    assert!(saved.contains("hash_function = \"sha256\""), "{saved}");
}

#[test]
fn test_extract_command() {
    let (dir, _config) = workspace();
    let report = dir.path().join("report.csv");
    fs::write(&report, "3; /a/x; /b/x\n5; /c/y; /d/y\n").unwrap();
    let out = dir.path().join("a.csv");

    let code = run(&[
        "dupsift",
        "-q",
        "extract",
        "/a/",
        &arg(&report),
        &arg(&out),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_to_string(&out).unwrap(), "3; /a/x; /b/x\n");

    let code = run(&[
        "dupsift",
        "-q",
        "extract",
        "/zzz/",
        &arg(&report),
        &arg(&out),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}
