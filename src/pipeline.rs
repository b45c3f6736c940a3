//! Plumbing shared by the three pipeline stages.
//!
//! Stages never share memory: they exchange [`Message`] values over two
//! bounded FIFO channels (crawler → filter, filter → verifier). Each channel
//! carries any number of [`Message::Record`] values followed by exactly one
//! [`Message::EndOfStream`], which is always last.
//!
//! Channels are bounded: a fast crawler blocks on send once the filter falls
//! `capacity` records behind, so memory stays proportional to the capacity
//! rather than to the size of the tree.

use std::fmt;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

use crate::scanner::{Digest, HashAlgorithm};

/// Default number of in-flight messages per channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A fingerprinted file travelling between stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path of the file, as discovered by the crawler
    pub path: PathBuf,
    /// Sniff hash (crawler → filter) or candidate fingerprint (filter → verifier)
    pub fingerprint: Digest,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(path: PathBuf, fingerprint: Digest) -> Self {
        Self { path, fingerprint }
    }

    /// Check the record has the shape every stage expects.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] for an empty path or a fingerprint whose
    /// length does not match `algorithm`.
    pub fn validate(&self, algorithm: HashAlgorithm) -> Result<(), ProtocolError> {
        if self.path.as_os_str().is_empty() {
            return Err(ProtocolError::EmptyPath);
        }
        let expected = algorithm.output_len();
        if self.fingerprint.len() != expected {
            return Err(ProtocolError::FingerprintLength {
                path: self.path.clone(),
                expected,
                actual: self.fingerprint.len(),
            });
        }
        Ok(())
    }
}

/// One item on a stage channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// A data record.
    Record(T),
    /// No further records will follow on this channel.
    EndOfStream,
}

/// Sending half of a stage channel.
pub type RecordSender = Sender<Message<FileRecord>>;
/// Receiving half of a stage channel.
pub type RecordReceiver = Receiver<Message<FileRecord>>;

/// Create a bounded stage channel (minimum capacity 1).
#[must_use]
pub fn stage_channel(capacity: usize) -> (RecordSender, RecordReceiver) {
    crossbeam_channel::bounded(capacity.max(1))
}

/// A record that does not have the expected shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The record carries no path.
    #[error("Record has an empty path")]
    EmptyPath,

    /// The fingerprint was not produced by the configured algorithm.
    #[error("Fingerprint for {path} is {actual} bytes, expected {expected}")]
    FingerprintLength {
        /// Path carried by the record
        path: PathBuf,
        /// Length the configured algorithm produces
        expected: usize,
        /// Length actually received
        actual: usize,
    },
}

/// Lifecycle of a stage. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StageState {
    /// Constructed, not yet processing.
    #[default]
    Init,
    /// Processing records.
    Running,
    /// End of stream reached (received or emitted).
    Drained,
    /// Internal state released; nothing more will happen.
    Terminated,
}

impl StageState {
    /// Move to `next`, logging the transition.
    ///
    /// Returns `false` and leaves the state untouched if `next` is not
    /// strictly after the current state.
    pub fn advance(&mut self, stage: &str, next: StageState) -> bool {
        if next <= *self {
            log::error!("{}: refusing state transition {} -> {}", stage, self, next);
            return false;
        }
        log::debug!("{}: {} -> {}", stage, self, next);
        *self = next;
        true
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Drained => "DRAINED",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}
