//! First pipeline stage: walk the tree, sniff-hash, emit records.
//!
//! The crawler owns the sending half of the crawler → filter channel. For
//! every regular, non-empty file under the root it computes the sniff hash
//! and sends one [`FileRecord`]. Unreadable entries are logged and skipped.
//! After the walk completes it sends exactly one [`Message::EndOfStream`].
//!
//! Optionally, files whose name matches a temporary-file pattern (office
//! lock files such as `~$report.docx` by default) are deleted instead of
//! fingerprinted.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::hasher::Hasher;
use super::walker::Walker;
use super::ScanError;
use crate::config::{ConfigError, ScanConfig};
use crate::pipeline::{FileRecord, Message, RecordSender, StageState};
use crate::progress::{ProgressCallback, PHASE_CRAWL};

const STAGE: &str = "crawler";

/// Name-based matcher for temporary files.
///
/// Patterns use gitignore glob syntax and are matched against the file
/// name only, so `~*` matches `~lock.doc` at any depth.
#[derive(Debug, Clone)]
pub struct TempFilePolicy {
    matcher: Gitignore,
}

impl TempFilePolicy {
    /// Compile `patterns` into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TempPattern`] for the first invalid pattern.
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| ConfigError::TempPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        let matcher = builder.build().map_err(|e| ConfigError::TempPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;
        Ok(Self { matcher })
    }

    /// True if the file name of `path` matches a temporary-file pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.matcher.matched(Path::new(name), false).is_ignore())
    }
}

/// Counters reported by the crawler when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Entries yielded by the walk, including unreadable ones
    pub visited: usize,
    /// Records sent downstream
    pub fingerprinted: usize,
    /// Entries skipped because they could not be read
    pub read_errors: usize,
    /// Temporary files deleted
    pub temp_deleted: usize,
    /// The filter went away before the walk finished
    pub interrupted: bool,
}

/// The crawler stage.
pub struct Crawler {
    config: Arc<ScanConfig>,
    hasher: Hasher,
    progress: Arc<dyn ProgressCallback>,
    state: StageState,
}

impl Crawler {
    /// Create a crawler for `config.root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root is missing or not a directory.
    pub fn new(
        config: Arc<ScanConfig>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<Self, ScanError> {
        let root = &config.root;
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ScanError::NotADirectory(root.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::NotFound(root.clone()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ScanError::PermissionDenied(root.clone()))
            }
            Err(source) => {
                return Err(ScanError::Io {
                    path: root.clone(),
                    source,
                })
            }
        }

        Ok(Self {
            hasher: Hasher::new(config.algorithm),
            config,
            progress,
            state: StageState::Init,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Walk the tree and feed `tx`.
    ///
    /// Returns once the walk is complete and the end-of-stream marker has
    /// been sent, or early if the receiver has been dropped.
    pub fn run(&mut self, tx: &RecordSender) -> CrawlStats {
        let mut stats = CrawlStats::default();
        self.state.advance(STAGE, StageState::Running);
        self.progress.on_phase_start(PHASE_CRAWL);
        log::info!(
            "Crawling {} ({}, sniff {})",
            self.config.root.display(),
            self.config.algorithm,
            self.config.sniff_budget
        );

        // Temp files are matched by name, so empty ones must reach the policy
        let walker =
            Walker::new(&self.config.root).with_empty_files(self.config.temp_policy.is_some());
        for result in walker.walk() {
            stats.visited += 1;

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    stats.read_errors += 1;
                    self.progress.on_error(PHASE_CRAWL, "", &e.to_string());
                    continue;
                }
            };

            let display = entry.path.to_string_lossy().into_owned();
            self.progress.on_progress(PHASE_CRAWL, stats.visited, &display);

            if self.is_temporary(&entry.path) {
                match fs::remove_file(&entry.path) {
                    Ok(()) => {
                        log::info!("Deleted temporary file: {}", display);
                        stats.temp_deleted += 1;
                    }
                    Err(e) => {
                        log::warn!("Failed to delete temporary file {}: {}", display, e);
                        stats.read_errors += 1;
                        self.progress.on_error(PHASE_CRAWL, &display, &e.to_string());
                    }
                }
                continue;
            }

            if entry.size == 0 {
                log::debug!("Skipping empty file: {}", display);
                continue;
            }

            let fingerprint = match self.hasher.sniff(&entry.path, self.config.sniff_budget) {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    if e.is_vanished() {
                        log::debug!("Vanished before hashing: {}", display);
                    } else {
                        log::warn!("Skipping unreadable file: {}", e);
                    }
                    stats.read_errors += 1;
                    self.progress.on_error(PHASE_CRAWL, &display, &e.to_string());
                    continue;
                }
            };

            log::trace!("{} {}", fingerprint, display);
            if tx
                .send(Message::Record(FileRecord::new(entry.path, fingerprint)))
                .is_err()
            {
                log::error!("{}: filter stage closed its channel, stopping walk", STAGE);
                stats.interrupted = true;
                break;
            }
            stats.fingerprinted += 1;
        }

        if !stats.interrupted {
            if tx.send(Message::EndOfStream).is_ok() {
                self.state.advance(STAGE, StageState::Drained);
            } else {
                log::error!("{}: filter stage closed before end of stream", STAGE);
                stats.interrupted = true;
            }
        }

        self.progress.on_phase_end(PHASE_CRAWL);
        log::info!(
            "Crawl finished: {} visited, {} fingerprinted, {} unreadable",
            stats.visited,
            stats.fingerprinted,
            stats.read_errors
        );
        self.state.advance(STAGE, StageState::Terminated);
        stats
    }

    /// True if temp-file deletion is enabled and the name of `path` matches.
    fn is_temporary(&self, path: &Path) -> bool {
        self.config
            .temp_policy
            .as_ref()
            .is_some_and(|policy| policy.matches(path))
    }
}
