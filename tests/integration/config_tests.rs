use dupsift::config::{Config, ConfigError, ScanConfig};
use dupsift::duplicates::{CollisionPolicy, RunMode};
use dupsift::scanner::{HashAlgorithm, SniffBudget};
use std::env;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

// Tests touching DUPSIFT_* variables must not interleave.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_load_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupsift.toml");
    fs::write(
        &path,
        r#"
hash_function = "sha256"
hash_bytes = 4096
split_symbol = " | "
prefix_path = "S:"
separator = "\\"
encoding = "latin1"
prefix_collision = "drop"
detached = true
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.hash_function, "sha256");
    assert_eq!(config.hash_bytes, 4096);
    assert_eq!(config.split_symbol, " | ");
    assert_eq!(config.separator.as_deref(), Some("\\"));
    assert_eq!(config.prefix_collision, CollisionPolicy::Drop);
    // Unset keys keep their defaults
    assert_eq!(config.prefix_len, 4);
    assert!(!config.delete_temp_files);

    let scan = ScanConfig::new(dir.path(), dir.path().join("out.csv"), &config).unwrap();
    assert_eq!(scan.algorithm, HashAlgorithm::Sha256);
    assert_eq!(scan.sniff_budget, SniffBudget::Bytes(4096));
    assert_eq!(scan.run_mode, RunMode::Detached);
    assert_eq!(scan.encoding, Some(encoding_rs::WINDOWS_1252));
}

#[test]
fn test_invalid_toml_is_a_load_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "hash_bytes = \"many\"\n").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupsift.toml");
    fs::write(&path, "hash_function = \"sha256\"\nhash_bytes = 100\n").unwrap();

    env::set_var("DUPSIFT_HASH_FUNCTION", "blake3");
    env::set_var("DUPSIFT_HASH_BYTES", "-1");
    let result = Config::load_from_path(&path);
    env::remove_var("DUPSIFT_HASH_FUNCTION");
    env::remove_var("DUPSIFT_HASH_BYTES");

    let config = result.unwrap();
    assert_eq!(config.hash_function, "blake3");
    assert_eq!(config.hash_bytes, -1);
}

#[test]
fn test_save_writes_loadable_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = Config {
        hash_function: "sha512".to_string(),
        prefix_len: 8,
        temp_patterns: vec!["*.tmp".to_string()],
        ..Config::default()
    };

    config.save(&path).unwrap();
    assert_eq!(Config::load_from_path(&path).unwrap(), config);
}

#[test]
fn test_validation_errors_are_reported_before_scanning() {
    let dir = tempdir().unwrap();
    let export = dir.path().join("out.csv");

    let cases = [
        Config {
            hash_function: "md4".to_string(),
            ..Config::default()
        },
        Config {
            prefix_len: 33,
            hash_function: "sha256".to_string(),
            ..Config::default()
        },
        Config {
            encoding: Some("not-an-encoding".to_string()),
            ..Config::default()
        },
        Config {
            delete_temp_files: true,
            temp_patterns: vec!["[".to_string()],
            ..Config::default()
        },
    ];

    for config in &cases {
        assert!(ScanConfig::new(dir.path(), &export, config).is_err());
    }
    assert!(!export.exists());
}
