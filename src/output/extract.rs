//! Report extraction.
//!
//! Filters a duplicate report down to the groups touching one target (for
//! example one shared folder), so each folder owner gets the lines that
//! concern them. Matching lines are rewritten with the size first, then the
//! paths containing the target, then the remaining paths.
//!
//! In directory mode, every immediate subdirectory of a target directory is
//! extracted into its own `<name>.csv` file.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The report could not be read.
    #[error("Cannot read report {path}: {source}")]
    Read {
        /// Report path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An output file could not be created.
    #[error("Cannot create {path}: {source}")]
    Create {
        /// Output path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing an output file failed.
    #[error("Cannot write {path}: {source}")]
    Write {
        /// Output path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The output file is the report being read.
    #[error("Output {0} is the input report")]
    SameFile(PathBuf),

    /// Directory mode requires directories.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Line filter for one target.
#[derive(Debug, Clone)]
pub struct Extractor {
    target: String,
    split_symbol: String,
}

impl Extractor {
    /// Create an extractor keeping lines that contain `target`.
    #[must_use]
    pub fn new(target: impl Into<String>, split_symbol: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            split_symbol: split_symbol.into(),
        }
    }

    /// Target substring.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Reorder a matching line: size, then target paths, then the others.
    /// Returns `None` if the line does not mention the target.
    #[must_use]
    pub fn reorder_line(&self, line: &str) -> Option<String> {
        if !line.contains(&self.target) {
            return None;
        }
        let mut fields = line.split(self.split_symbol.as_str());
        let size = fields.next().unwrap_or_default();
        let (matching, others): (Vec<&str>, Vec<&str>) =
            fields.partition(|field| field.contains(&self.target));

        let mut items = Vec::with_capacity(1 + matching.len() + others.len());
        items.push(size);
        items.extend(matching);
        items.extend(others);
        Some(items.join(&self.split_symbol))
    }

    /// Copy every matching line of `input` to `output`, reordered. Returns
    /// the number of lines written.
    ///
    /// Input that is not valid UTF-8 is decoded lossily.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from `input` or `output`.
    pub fn extract<R: BufRead, W: Write>(&self, input: R, output: W) -> io::Result<usize> {
        self.copy_matching(input, output).map_err(|(_, e)| e)
    }

    /// Like [`Extractor::extract`], tagging each error with the side it
    /// came from.
    fn copy_matching<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> Result<usize, (Side, io::Error)> {
        let mut written = 0;
        for raw in input.split(b'\n') {
            let raw = raw.map_err(|e| (Side::Input, e))?;
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\r');
            if let Some(reordered) = self.reorder_line(line) {
                output
                    .write_all(reordered.as_bytes())
                    .and_then(|()| output.write_all(b"\n"))
                    .map_err(|e| (Side::Output, e))?;
                written += 1;
            }
        }
        output.flush().map_err(|e| (Side::Output, e))?;
        Ok(written)
    }

    /// Extract from the report at `input` into a new file at `export`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if either file cannot be opened, read or
    /// written, and [`ExtractError::SameFile`] if `export` is `input`.
    pub fn extract_file(&self, input: &Path, export: &Path) -> Result<usize, ExtractError> {
        let reader = File::open(input).map_err(|source| ExtractError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        if is_same_file(input, export) {
            return Err(ExtractError::SameFile(export.to_path_buf()));
        }
        let writer = File::create(export).map_err(|source| ExtractError::Create {
            path: export.to_path_buf(),
            source,
        })?;

        self.copy_matching(BufReader::new(reader), BufWriter::new(writer))
            .map_err(|(side, source)| match side {
                Side::Input => ExtractError::Read {
                    path: input.to_path_buf(),
                    source,
                },
                Side::Output => ExtractError::Write {
                    path: export.to_path_buf(),
                    source,
                },
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Input,
    Output,
}

/// True if both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Extract once per immediate subdirectory of `target_dir`.
///
/// The target for subdirectory `d` is `target_dir/d` with every occurrence
/// of `strip_prefix` removed, so a report written with a path prefix can be
/// matched against local directories. Output goes to `export_dir/d.csv`.
/// Returns `(export file, lines written)` per subdirectory, sorted by name.
///
/// # Errors
///
/// Returns [`ExtractError::NotADirectory`] if either directory is invalid,
/// or the first extraction error.
pub fn extract_per_directory(
    target_dir: &Path,
    input: &Path,
    export_dir: &Path,
    split_symbol: &str,
    strip_prefix: &str,
) -> Result<Vec<(PathBuf, usize)>, ExtractError> {
    if !target_dir.is_dir() {
        return Err(ExtractError::NotADirectory(target_dir.to_path_buf()));
    }
    if !export_dir.is_dir() {
        return Err(ExtractError::NotADirectory(export_dir.to_path_buf()));
    }

    let entries = fs::read_dir(target_dir).map_err(|source| ExtractError::Read {
        path: target_dir.to_path_buf(),
        source,
    })?;
    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    subdirs.sort();

    let mut results = Vec::with_capacity(subdirs.len());
    for subdir in subdirs {
        let Some(name) = subdir.file_name() else {
            continue;
        };
        let mut target = subdir.to_string_lossy().into_owned();
        if !strip_prefix.is_empty() {
            target = target.replace(strip_prefix, "");
        }
        let export = export_dir.join(format!("{}.csv", name.to_string_lossy()));

        log::info!("Extracting {} into {}", target, export.display());
        let lines = Extractor::new(target, split_symbol).extract_file(input, &export)?;
        results.push((export, lines));
    }
    Ok(results)
}
