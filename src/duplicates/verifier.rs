//! Third pipeline stage: confirm candidates and export the report.
//!
//! Every candidate from the filter is re-checked against the filesystem.
//! Files larger than the sniff budget get a streamed full-content hash; for
//! smaller files the sniff hash already covers the whole content and is
//! used as is. Confirmed paths accumulate in [`DuplicateGroups`], which are
//! written out once, when the end-of-stream marker arrives.

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use thiserror::Error;

use super::groups::DuplicateGroups;
use crate::config::ScanConfig;
use crate::output::report::{export_report, ExportError, ReportFormat};
use crate::pipeline::{FileRecord, Message, RecordReceiver, StageState};
use crate::progress::{ProgressCallback, PHASE_VERIFY};
use crate::scanner::Hasher;

const STAGE: &str = "verifier";

/// Errors that stop the verifier.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The report could not be written.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The filter disconnected without sending end of stream.
    #[error("Filter stage disconnected before end of stream")]
    UpstreamClosed,
}

/// Counters reported by the verifier when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyStats {
    /// Candidates received from the filter
    pub received: usize,
    /// Candidates added to a group
    pub verified: usize,
    /// Candidates gone or no longer regular files
    pub vanished: usize,
    /// Records discarded as malformed
    pub malformed: usize,
    /// Full-content hashes computed
    pub full_hashes: usize,
    /// Candidates dropped because the full hash failed
    pub read_errors: usize,
    /// Lines written to the report
    pub groups_exported: usize,
    /// Files across all exported groups
    pub duplicate_files: usize,
    /// Bytes held by copies beyond the first in each group
    pub wasted_space: u64,
}

/// The verifier/exporter stage.
pub struct Verifier {
    config: Arc<ScanConfig>,
    hasher: Hasher,
    groups: DuplicateGroups,
    progress: Arc<dyn ProgressCallback>,
    state: StageState,
}

impl Verifier {
    /// Create a verifier writing to `config.export`.
    #[must_use]
    pub fn new(config: Arc<ScanConfig>, progress: Arc<dyn ProgressCallback>) -> Self {
        Self {
            hasher: Hasher::new(config.algorithm),
            config,
            groups: DuplicateGroups::new(),
            progress,
            state: StageState::Init,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Consume `rx` until end of stream, then write the report.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Export`] if the report cannot be written and
    /// [`VerifierError::UpstreamClosed`] if the channel closes without an
    /// end-of-stream marker. In the latter case no report is written.
    pub fn run(&mut self, rx: &RecordReceiver) -> Result<VerifyStats, VerifierError> {
        let mut stats = VerifyStats::default();
        self.state.advance(STAGE, StageState::Running);
        self.progress.on_phase_start(PHASE_VERIFY);

        loop {
            match rx.recv() {
                Ok(Message::Record(record)) => {
                    stats.received += 1;
                    self.verify(record, &mut stats);
                }
                Ok(Message::EndOfStream) => break,
                Err(_) => {
                    log::error!("{}: filter disconnected without end of stream", STAGE);
                    self.finish();
                    return Err(VerifierError::UpstreamClosed);
                }
            }
        }

        self.state.advance(STAGE, StageState::Drained);
        let format = ReportFormat::from_config(&self.config);
        let exported = export_report(&self.config.export, &format, self.groups.duplicates());
        stats.duplicate_files = self.groups.duplicate_files();
        stats.wasted_space = self.groups.wasted_space();
        self.finish();

        stats.groups_exported = exported?;
        log::info!(
            "Verify finished: {} candidates, {} confirmed in {} groups",
            stats.received,
            stats.duplicate_files,
            stats.groups_exported
        );
        Ok(stats)
    }

    fn finish(&mut self) {
        self.groups.clear();
        self.progress.on_phase_end(PHASE_VERIFY);
        self.state.advance(STAGE, StageState::Terminated);
    }

    fn verify(&mut self, record: FileRecord, stats: &mut VerifyStats) {
        if let Err(e) = record.validate(self.config.algorithm) {
            log::error!("{}: discarding malformed record: {}", STAGE, e);
            stats.malformed += 1;
            return;
        }

        let display = record.path.to_string_lossy().into_owned();
        self.progress.on_progress(PHASE_VERIFY, stats.received, &display);

        let size = match fs::symlink_metadata(&record.path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                log::debug!("No longer a regular file: {}", display);
                stats.vanished += 1;
                return;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Removed during scan: {}", display);
                stats.vanished += 1;
                return;
            }
            Err(e) => {
                log::warn!("Cannot stat {}: {}", display, e);
                stats.read_errors += 1;
                self.progress.on_error(PHASE_VERIFY, &display, &e.to_string());
                return;
            }
        };

        let hash = if self.config.sniff_budget.covers(size) {
            record.fingerprint
        } else {
            stats.full_hashes += 1;
            match self.hasher.full_hash(&record.path) {
                Ok(hash) => hash,
                Err(e) if e.is_vanished() => {
                    log::debug!("Removed during scan: {}", display);
                    stats.vanished += 1;
                    return;
                }
                Err(e) => {
                    log::warn!("Skipping unreadable candidate: {}", e);
                    stats.read_errors += 1;
                    self.progress.on_error(PHASE_VERIFY, &display, &e.to_string());
                    return;
                }
            }
        };

        stats.verified += 1;
        self.groups.add(hash, size, record.path);
    }
}
