//! Command-line interface definitions for dupsift.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, logging, error format, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory, writing duplicate groups to a report
//! dupsift scan ~/Documents duplicates.csv
//!
//! # SHA-256, hash whole files up front, Windows-style paths in the report
//! dupsift scan /srv/share report.csv -f sha256 -b all -s '\' -p 'S:'
//!
//! # Keep only the lines concerning one folder
//! dupsift extract /srv/share/bob report.csv bob.csv
//!
//! # Verbose mode for debugging
//! dupsift -v scan ~/Documents duplicates.csv
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, DEFAULT_SPLIT_SYMBOL};
use crate::duplicates::CollisionPolicy;

/// Duplicate file finder built as a three-stage pipeline.
///
/// dupsift walks a directory tree, sniff-hashes every regular file, filters
/// candidates with a two-level hash comparison and writes one line per group
/// of byte-identical files.
#[derive(Debug, Parser)]
#[command(name = "dupsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write log records to this file instead of stderr
    #[arg(short = 'g', long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH", env = "DUPSIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for dupsift.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory and export duplicate groups
    Scan(ScanArgs),
    /// Filter an exported report down to one target
    Extract(ExtractArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Root directory to search for duplicates
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Report file filled with duplicate groups
    #[arg(value_name = "EXPORT")]
    pub export: PathBuf,

    /// Hash function (md5, sha1, sha224, sha256, sha384, sha512, blake3)
    #[arg(short = 'f', long, value_name = "NAME")]
    pub hash_function: Option<String>,

    /// Bytes read for the first hash (e.g. 15000, 64KiB, or "all")
    ///
    /// Any negative value also means the whole file.
    #[arg(
        short = 'b',
        long,
        value_name = "SIZE",
        allow_negative_numbers = true,
        value_parser = parse_hash_bytes
    )]
    pub hash_bytes: Option<i64>,

    /// Prefix added to every path in the report
    #[arg(short = 'p', long, value_name = "PREFIX")]
    pub prefix_path: Option<String>,

    /// Report encoding (e.g. utf-8, latin1, windows-1252)
    #[arg(short = 'e', long, value_name = "LABEL")]
    pub encoding: Option<String>,

    /// Path separator used in the report instead of the native one
    #[arg(short = 's', long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Symbol separating fields in the report
    #[arg(short = 'S', long, value_name = "SYMBOL")]
    pub split_symbol: Option<String>,

    /// Run the verifier on its own thread
    #[arg(short = 'd', long = "daemon")]
    pub detached: bool,

    /// Digest bytes used by the prefix pre-filter
    #[arg(long, value_name = "N")]
    pub prefix_len: Option<usize>,

    /// In-flight records per pipeline channel
    #[arg(long, value_name = "N")]
    pub channel_capacity: Option<usize>,

    /// Handling of prefix matches without a digest match
    #[arg(long, value_enum, value_name = "POLICY")]
    pub prefix_collision: Option<CollisionPolicy>,

    /// Delete temporary files (names matching --temp-pattern) instead of hashing them
    ///
    /// Warning: deleted files cannot be recovered.
    #[arg(long)]
    pub delete_temp_files: bool,

    /// Temporary-file name pattern (can be specified multiple times, default "~*")
    #[arg(long = "temp-pattern", value_name = "GLOB")]
    pub temp_patterns: Vec<String>,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,

    /// Plain progress output for screen readers
    #[arg(long)]
    pub accessible: bool,

    /// Save the effective configuration (file, environment and flags) to PATH
    #[arg(long, value_name = "PATH")]
    pub save_config: Option<PathBuf>,
}

impl ScanArgs {
    /// Override `config` with every flag given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(name) = &self.hash_function {
            config.hash_function = name.clone();
        }
        if let Some(bytes) = self.hash_bytes {
            config.hash_bytes = bytes;
        }
        if let Some(prefix) = &self.prefix_path {
            config.prefix_path = prefix.clone();
        }
        if let Some(encoding) = &self.encoding {
            config.encoding = Some(encoding.clone());
        }
        if let Some(separator) = &self.separator {
            config.separator = Some(separator.clone());
        }
        if let Some(symbol) = &self.split_symbol {
            config.split_symbol = symbol.clone();
        }
        if self.detached {
            config.detached = true;
        }
        if let Some(len) = self.prefix_len {
            config.prefix_len = len;
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        if let Some(policy) = self.prefix_collision {
            config.prefix_collision = policy;
        }
        if self.delete_temp_files {
            config.delete_temp_files = true;
        }
        if !self.temp_patterns.is_empty() {
            config.temp_patterns = self.temp_patterns.clone();
        }
    }
}

/// Arguments for the extract subcommand.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Substring (usually a directory) selecting report lines
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Report produced by `dupsift scan`
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (or directory with --directory)
    #[arg(value_name = "EXPORT")]
    pub export: PathBuf,

    /// Symbol separating fields in the report
    #[arg(short = 'S', long, value_name = "SYMBOL", default_value = DEFAULT_SPLIT_SYMBOL)]
    pub split_symbol: String,

    /// Treat TARGET and EXPORT as directories: one output per subdirectory
    #[arg(short = 'd', long)]
    pub directory: bool,

    /// Remove this string from each subdirectory path before matching
    #[arg(short = 'p', long, value_name = "PREFIX", default_value = "")]
    pub strip_prefix: String,
}

/// Parse the sniff budget: a size, `all`, or a negative number (whole file).
///
/// # Examples
///
/// ```
/// use dupsift::cli::parse_hash_bytes;
///
/// assert_eq!(parse_hash_bytes("15000").unwrap(), 15_000);
/// assert_eq!(parse_hash_bytes("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_hash_bytes("all").unwrap(), -1);
/// assert_eq!(parse_hash_bytes("-1").unwrap(), -1);
/// ```
///
/// # Errors
///
/// Returns an error if the value is neither a size nor a negative integer.
pub fn parse_hash_bytes(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        return Ok(-1);
    }
    if s.starts_with('-') {
        return s
            .parse::<i64>()
            .map_err(|_| format!("Invalid number: '{s}'"));
    }
    let bytes = parse_size(s)?;
    i64::try_from(bytes).map_err(|_| format!("Size too large: '{s}'"))
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupsift::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
