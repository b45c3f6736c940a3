//! Application configuration management.
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file (`--config PATH`, or the platform config directory)
//! 3. `DUPSIFT_*` environment variables (e.g. `DUPSIFT_HASH_FUNCTION=sha1`)
//! 4. CLI flags (applied by [`crate::cli::ScanArgs::apply_to`])
//!
//! The merged [`Config`] is then validated into an immutable [`ScanConfig`],
//! which is what the pipeline stages receive. Every configuration problem is
//! reported as a [`ConfigError`] before any stage starts.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use encoding_rs::Encoding;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{CollisionPolicy, RunMode};
use crate::pipeline::DEFAULT_CHANNEL_CAPACITY;
use crate::scanner::{HashAlgorithm, SniffBudget, TempFilePolicy, DEFAULT_SNIFF_BYTES};

/// Default symbol separating fields of an export line.
pub const DEFAULT_SPLIT_SYMBOL: &str = "; ";
/// Default number of digest bytes used as the pre-filter key.
pub const DEFAULT_PREFIX_LEN: usize = 4;
/// Default temporary-file pattern (office lock/backup files).
pub const DEFAULT_TEMP_PATTERN: &str = "~*";
/// Default number of files between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPSIFT_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The root directory does not exist.
    #[error("Root directory not found: {0}")]
    RootNotFound(PathBuf),

    /// The root path exists but is not a directory.
    #[error("Root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    /// The directory that should contain the export file does not exist.
    #[error("Export directory does not exist: {0}")]
    ExportDirectoryMissing(PathBuf),

    /// The export path names a directory.
    #[error("Export path is a directory: {0}")]
    ExportIsDirectory(PathBuf),

    /// The hash algorithm name is not supported.
    #[error("Unknown hash algorithm '{name}'{}", suggestion_hint(.suggestion))]
    UnknownHashAlgorithm {
        /// Name as given
        name: String,
        /// Closest supported name, if any is close
        suggestion: Option<String>,
    },

    /// The output encoding label is not recognised.
    #[error("Unknown output encoding: {0}")]
    UnknownEncoding(String),

    /// The split symbol is empty.
    #[error("Split symbol must not be empty")]
    EmptySplitSymbol,

    /// The prefix length does not fit the selected digest.
    #[error("Prefix length {len} must be between 1 and {max}")]
    PrefixLength {
        /// Requested length
        len: usize,
        /// Digest length of the selected algorithm
        max: usize,
    },

    /// Channel capacity of zero.
    #[error("Channel capacity must be at least 1")]
    ZeroChannelCapacity,

    /// A temporary-file pattern could not be compiled.
    #[error("Invalid temporary-file pattern '{pattern}': {message}")]
    TempPattern {
        /// Offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// The config file or environment could not be parsed.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Raw, layered configuration as read from defaults, file and environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hash algorithm name (md5, sha1, sha224, sha256, sha384, sha512, blake3).
    pub hash_function: String,
    /// Bytes read for the sniff hash; negative means the whole file.
    pub hash_bytes: i64,
    /// Digest bytes used as the pre-filter key.
    pub prefix_len: usize,
    /// Field separator in the export file.
    pub split_symbol: String,
    /// String prepended to every exported path.
    pub prefix_path: String,
    /// Replacement for the native path separator in exported paths.
    pub separator: Option<String>,
    /// Output character encoding label (e.g. `latin1`).
    pub encoding: Option<String>,
    /// In-flight messages per stage channel.
    pub channel_capacity: usize,
    /// What the filter does on a prefix collision without a digest match.
    pub prefix_collision: CollisionPolicy,
    /// Delete files matching `temp_patterns` instead of fingerprinting them.
    pub delete_temp_files: bool,
    /// Gitignore-style basename patterns identifying temporary files.
    pub temp_patterns: Vec<String>,
    /// Run the verifier on its own thread instead of the caller's.
    pub detached: bool,
    /// Files between progress log lines.
    pub progress_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_function: HashAlgorithm::default().name().to_string(),
            hash_bytes: DEFAULT_SNIFF_BYTES as i64,
            prefix_len: DEFAULT_PREFIX_LEN,
            split_symbol: DEFAULT_SPLIT_SYMBOL.to_string(),
            prefix_path: String::new(),
            separator: None,
            encoding: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            prefix_collision: CollisionPolicy::default(),
            delete_temp_files: false,
            temp_patterns: vec![DEFAULT_TEMP_PATTERN.to_string()],
            detached: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    ///
    /// Problems are logged and the defaults (plus environment) are used.
    pub fn load() -> Self {
        let path = Self::default_path();
        match Self::extract(Self::figment(path.as_deref())) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the file is missing, or
    /// [`ConfigError::Load`] if it cannot be parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::extract(Self::figment(Some(path)))
    }

    /// Build the layered figment: defaults < TOML file < environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupsift", "dupsift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Save the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Validated, immutable configuration shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory tree to scan.
    pub root: PathBuf,
    /// Destination of the duplicate report.
    pub export: PathBuf,
    /// Digest algorithm for both sniff and full hashes.
    pub algorithm: HashAlgorithm,
    /// Leading bytes covered by the sniff hash.
    pub sniff_budget: SniffBudget,
    /// Digest bytes used as the pre-filter key.
    pub prefix_len: usize,
    /// Field separator in the export file.
    pub split_symbol: String,
    /// String prepended to every exported path.
    pub prefix_path: String,
    /// Replacement for the native path separator in exported paths.
    pub separator: Option<String>,
    /// Target encoding for export lines; `None` writes UTF-8.
    pub encoding: Option<&'static Encoding>,
    /// In-flight messages per stage channel.
    pub channel_capacity: usize,
    /// Filter behavior on prefix collisions.
    pub collision_policy: CollisionPolicy,
    /// Temporary-file deletion policy, present only when enabled.
    pub temp_policy: Option<TempFilePolicy>,
    /// Whether the verifier runs on the caller's thread.
    pub run_mode: RunMode,
    /// Files between progress log lines.
    pub progress_interval: usize,
}

impl ScanConfig {
    /// Validate `config` for a scan of `root` exporting to `export`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn new(
        root: impl Into<PathBuf>,
        export: impl Into<PathBuf>,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        let root = root.into();
        let export = export.into();

        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ConfigError::RootNotADirectory(root)),
            Err(_) => return Err(ConfigError::RootNotFound(root)),
        }

        if export.is_dir() {
            return Err(ConfigError::ExportIsDirectory(export));
        }
        if let Some(parent) = export.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(ConfigError::ExportDirectoryMissing(parent.to_path_buf()));
            }
        }

        let algorithm = parse_algorithm(&config.hash_function)?;

        let max = algorithm.output_len();
        if config.prefix_len == 0 || config.prefix_len > max {
            return Err(ConfigError::PrefixLength {
                len: config.prefix_len,
                max,
            });
        }

        if config.split_symbol.is_empty() {
            return Err(ConfigError::EmptySplitSymbol);
        }

        if config.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }

        let encoding = match config.encoding.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(
                Encoding::for_label(label.as_bytes())
                    .map(Encoding::output_encoding)
                    .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))?,
            ),
        };

        let temp_policy = if config.delete_temp_files {
            Some(TempFilePolicy::new(&config.temp_patterns)?)
        } else {
            None
        };

        Ok(Self {
            root,
            export,
            algorithm,
            sniff_budget: SniffBudget::from_config(config.hash_bytes),
            prefix_len: config.prefix_len,
            split_symbol: config.split_symbol.clone(),
            prefix_path: config.prefix_path.clone(),
            separator: config.separator.clone().filter(|s| !s.is_empty()),
            encoding,
            channel_capacity: config.channel_capacity,
            collision_policy: config.prefix_collision,
            temp_policy,
            run_mode: if config.detached {
                RunMode::Detached
            } else {
                RunMode::Blocking
            },
            progress_interval: config.progress_interval.max(1),
        })
    }
}

/// Resolve an algorithm name, suggesting the closest supported name on failure.
fn parse_algorithm(name: &str) -> Result<HashAlgorithm, ConfigError> {
    name.parse().map_err(|_| {
        let lowered = name.trim().to_ascii_lowercase();
        let suggestion = HashAlgorithm::ALL
            .into_iter()
            .map(|alg| (alg.name(), strsim::levenshtein(&lowered, alg.name())))
            .filter(|(_, distance)| *distance <= 2)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate.to_string());
        ConfigError::UnknownHashAlgorithm {
            name: name.to_string(),
            suggestion,
        }
    })
}
