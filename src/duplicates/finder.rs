//! Pipeline orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder`] wires the three stages together:
//!
//! ```text
//! Crawler ──(bounded)──▶ Deduplicator ──(bounded)──▶ Verifier ──▶ report
//! ```
//!
//! The crawler and the filter always run on their own threads. The verifier
//! runs either on the caller's thread ([`RunMode::Blocking`]) or on a third
//! thread whose completion the caller awaits through a [`ScanHandle`]
//! ([`RunMode::Detached`]).
//!
//! Stages only communicate through the channels. The only clean shutdown
//! path is end-of-stream propagation; a stage that dies makes its neighbours
//! stop and the run fails with [`FinderError::StageFailed`].
//!
//! # Example
//!
//! ```no_run
//! use dupsift::config::{Config, ScanConfig};
//! use dupsift::duplicates::DuplicateFinder;
//!
//! let config = ScanConfig::new(".", "duplicates.csv", &Config::default()).unwrap();
//! let summary = DuplicateFinder::new(config).run().unwrap();
//!
//! println!("Found {} duplicate groups", summary.duplicate_groups());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::candidates::{Deduplicator, FilterStats};
use super::verifier::{Verifier, VerifierError, VerifyStats};
use crate::config::ScanConfig;
use crate::pipeline::{stage_channel, RecordReceiver};
use crate::progress::{NoProgress, ProgressCallback};
use crate::scanner::{CrawlStats, Crawler, ScanError};

/// Where the verifier runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// On the caller's thread; `run` returns once the report is written.
    #[default]
    Blocking,
    /// On its own thread; the caller joins it through a [`ScanHandle`].
    Detached,
}

/// Errors that can occur during a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The root could not be scanned at all.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The verifier failed (report not written).
    #[error(transparent)]
    Verifier(#[from] VerifierError),

    /// A stage terminated without completing the end-of-stream handshake.
    #[error("Pipeline stage '{0}' terminated abnormally")]
    StageFailed(&'static str),

    /// A stage thread could not be started.
    #[error("Failed to start pipeline thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Summary statistics from a completed run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Crawler counters
    pub crawl: CrawlStats,
    /// Filter counters
    pub filter: FilterStats,
    /// Verifier counters
    pub verify: VerifyStats,
    /// Wall-clock duration of the whole run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Lines written to the report.
    #[must_use]
    pub fn duplicate_groups(&self) -> usize {
        self.verify.groups_exported
    }

    /// Files listed in the report.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.verify.duplicate_files
    }

    /// Space held by copies beyond the first in each group.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.verify.wasted_space
    }

    /// Files skipped because of recoverable errors, in any stage.
    #[must_use]
    pub fn skipped_files(&self) -> usize {
        self.crawl.read_errors
            + self.filter.malformed
            + self.verify.malformed
            + self.verify.read_errors
    }

    /// True if the report has at least one line.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.duplicate_groups() > 0
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space()).to_string()
    }
}

/// Threads running the crawler and the filter.
struct Upstream {
    crawler: JoinHandle<CrawlStats>,
    filter: JoinHandle<FilterStats>,
    progress: Arc<dyn ProgressCallback>,
    started: Instant,
}

impl Upstream {
    /// Join both threads and combine their counters with the verifier's
    /// outcome. `verified` is `None` if the verifier thread panicked.
    fn finish(
        self,
        verified: Option<Result<VerifyStats, VerifierError>>,
    ) -> Result<ScanSummary, FinderError> {
        let crawl = self
            .crawler
            .join()
            .map_err(|_| FinderError::StageFailed("crawler"))?;
        let filter = self
            .filter
            .join()
            .map_err(|_| FinderError::StageFailed("filter"))?;
        let verify = verified.ok_or(FinderError::StageFailed("verifier"))??;

        if crawl.interrupted {
            return Err(FinderError::StageFailed("filter"));
        }
        if filter.disconnected {
            return Err(FinderError::StageFailed("verifier"));
        }

        let summary = ScanSummary {
            crawl,
            filter,
            verify,
            scan_duration: self.started.elapsed(),
        };
        log::info!(
            "Scan complete in {:.2?}: {} files, {} candidates, {} duplicate groups",
            summary.scan_duration,
            summary.crawl.visited,
            summary.filter.forwarded,
            summary.duplicate_groups()
        );
        self.progress.on_message(&format!(
            "Found {} duplicate groups ({} reclaimable)",
            summary.duplicate_groups(),
            summary.reclaimable_display()
        ));
        Ok(summary)
    }
}

/// A running scan whose verifier is detached from the caller.
pub struct ScanHandle {
    upstream: Upstream,
    verifier: JoinHandle<Result<VerifyStats, VerifierError>>,
}

impl ScanHandle {
    /// True once the verifier thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.verifier.is_finished()
    }

    /// Block until every stage has exited.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if a stage failed.
    pub fn wait(self) -> Result<ScanSummary, FinderError> {
        let verified = self.verifier.join().ok();
        self.upstream.finish(verified)
    }
}

/// Duplicate finder running the three-stage pipeline.
pub struct DuplicateFinder {
    config: Arc<ScanConfig>,
    progress: Arc<dyn ProgressCallback>,
}

impl DuplicateFinder {
    /// Create a finder for a validated configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config: Arc::new(config),
            progress: Arc::new(NoProgress),
        }
    }

    /// Set a progress callback shared by every stage.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The configuration every stage receives.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run the pipeline to completion in the configured [`RunMode`].
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root cannot be scanned, the report
    /// cannot be written or a stage fails.
    pub fn run(&self) -> Result<ScanSummary, FinderError> {
        match self.config.run_mode {
            RunMode::Blocking => {
                let (upstream, rx) = self.start_upstream()?;
                let verified = Verifier::new(Arc::clone(&self.config), Arc::clone(&self.progress))
                    .run(&rx);
                drop(rx);
                upstream.finish(Some(verified))
            }
            RunMode::Detached => self.spawn()?.wait(),
        }
    }

    /// Start every stage, the verifier included, on background threads.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root cannot be scanned or a thread
    /// cannot be started.
    pub fn spawn(&self) -> Result<ScanHandle, FinderError> {
        let (upstream, rx) = self.start_upstream()?;
        let mut verifier = Verifier::new(Arc::clone(&self.config), Arc::clone(&self.progress));
        let verifier = thread::Builder::new()
            .name("dupsift-verifier".to_string())
            .spawn(move || verifier.run(&rx))?;
        Ok(ScanHandle { upstream, verifier })
    }

    fn start_upstream(&self) -> Result<(Upstream, RecordReceiver), FinderError> {
        let started = Instant::now();
        let mut crawler = Crawler::new(Arc::clone(&self.config), Arc::clone(&self.progress))?;
        let mut filter = Deduplicator::new(Arc::clone(&self.config), Arc::clone(&self.progress));

        let capacity = self.config.channel_capacity;
        let (crawl_tx, crawl_rx) = stage_channel(capacity);
        let (candidate_tx, candidate_rx) = stage_channel(capacity);

        log::debug!(
            "Starting pipeline on {} (channel capacity {}, {:?} verifier)",
            self.config.root.display(),
            capacity,
            self.config.run_mode
        );
        self.progress
            .on_message(&format!("Scanning {}", self.config.root.display()));

        let crawler = thread::Builder::new()
            .name("dupsift-crawler".to_string())
            .spawn(move || crawler.run(&crawl_tx))?;
        let filter = thread::Builder::new()
            .name("dupsift-filter".to_string())
            .spawn(move || filter.run(&crawl_rx, &candidate_tx))?;

        Ok((
            Upstream {
                crawler,
                filter,
                progress: Arc::clone(&self.progress),
                started,
            },
            candidate_rx,
        ))
    }
}
