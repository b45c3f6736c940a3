//! Duplicate report writer.
//!
//! One line per duplicate group:
//!
//! ```text
//! <size><split><prefix><path1><split><prefix><path2>...
//! ```
//!
//! `size` is the size of the first member. Each path is prefixed with a
//! fixed string and, optionally, has the native path separator replaced.
//! Lines are UTF-8 unless an output encoding is configured, in which case
//! characters the encoding cannot represent are dropped.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use encoding_rs::{EncoderResult, Encoding};
use thiserror::Error;

use crate::config::{ScanConfig, DEFAULT_SPLIT_SYMBOL};
use crate::duplicates::DuplicateGroup;

/// Errors that can occur while writing the report.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The report file could not be created.
    #[error("Cannot create report {path}: {source}")]
    Create {
        /// Report destination
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing to the report failed.
    #[error("Cannot write report {path}: {source}")]
    Write {
        /// Report destination
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// How report lines are rendered.
#[derive(Debug, Clone)]
pub struct ReportFormat {
    split_symbol: String,
    prefix_path: String,
    separator: Option<String>,
    encoding: Option<&'static Encoding>,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self::new(DEFAULT_SPLIT_SYMBOL)
    }
}

impl ReportFormat {
    /// Plain UTF-8 format with the given field separator.
    #[must_use]
    pub fn new(split_symbol: impl Into<String>) -> Self {
        Self {
            split_symbol: split_symbol.into(),
            prefix_path: String::new(),
            separator: None,
            encoding: None,
        }
    }

    /// Format described by a validated scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            split_symbol: config.split_symbol.clone(),
            prefix_path: config.prefix_path.clone(),
            separator: config.separator.clone(),
            encoding: config.encoding,
        }
    }

    /// Prepend `prefix` to every path.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_path = prefix.into();
        self
    }

    /// Replace the native path separator with `separator`.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Re-encode lines into `encoding`.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Field separator.
    #[must_use]
    pub fn split_symbol(&self) -> &str {
        &self.split_symbol
    }

    /// Render one path: prefix first, then separator replacement.
    #[must_use]
    pub fn format_path(&self, path: &Path) -> String {
        let full = format!("{}{}", self.prefix_path, path.to_string_lossy());
        match &self.separator {
            Some(separator) => full.replace(MAIN_SEPARATOR_STR, separator),
            None => full,
        }
    }

    /// Render one group as a line, without the trailing newline.
    #[must_use]
    pub fn format_line(&self, group: &DuplicateGroup) -> String {
        let mut line = group.size.to_string();
        for path in &group.paths {
            line.push_str(&self.split_symbol);
            line.push_str(&self.format_path(path));
        }
        line
    }

    /// Encode a rendered line, dropping unmappable characters.
    #[must_use]
    pub fn encode_line(&self, line: &str) -> Vec<u8> {
        match self.encoding {
            Some(encoding) if encoding != encoding_rs::UTF_8 => encode_lossy(encoding, line),
            _ => line.as_bytes().to_vec(),
        }
    }

    /// Write every group to `writer`, one line each. Returns the number of
    /// lines written.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error raised by `writer`.
    pub fn write_groups<'a, W: Write>(
        &self,
        mut writer: W,
        groups: impl IntoIterator<Item = &'a DuplicateGroup>,
    ) -> io::Result<usize> {
        let mut lines = 0;
        for group in groups {
            let mut bytes = self.encode_line(&self.format_line(group));
            bytes.push(b'\n');
            writer.write_all(&bytes)?;
            lines += 1;
        }
        writer.flush()?;
        Ok(lines)
    }
}

fn encode_lossy(encoding: &'static Encoding, line: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(
        encoder
            .max_buffer_length_from_utf8_without_replacement(line.len())
            .unwrap_or(line.len()),
    );
    let mut src = line;
    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(src, &mut out, true);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {
                let extra = encoder
                    .max_buffer_length_from_utf8_without_replacement(src.len())
                    .unwrap_or(src.len())
                    .max(16);
                out.reserve(extra);
            }
            EncoderResult::Unmappable(c) => {
                log::trace!("Dropping unmappable character {:?} for {}", c, encoding.name());
            }
        }
    }
    out
}

/// Create (or truncate) `path` and write every group to it.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be created or written.
pub fn export_report<'a>(
    path: &Path,
    format: &ReportFormat,
    groups: impl IntoIterator<Item = &'a DuplicateGroup>,
) -> Result<usize, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let lines = format
        .write_groups(BufWriter::new(file), groups)
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("Wrote {} duplicate groups to {}", lines, path.display());
    Ok(lines)
}
