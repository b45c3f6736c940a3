//! Second pipeline stage: the candidate filter.
//!
//! The filter forwards a file only once a second file with the exact same
//! fingerprint has been seen. It keeps two structures:
//!
//! - the set of digest prefixes seen so far, fronted by a growable Bloom
//!   filter so most unseen prefixes are rejected without touching the set
//! - a [`CandidateTable`] mapping each registered digest to either the path
//!   of its first file (not yet forwarded) or a flag meaning "already
//!   forwarded"
//!
//! The first file of a group is forwarded together with the second one;
//! later members are forwarded alone. Flagging makes sure the first path is
//! never forwarded twice.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use growable_bloom_filter::GrowableBloom;
use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::pipeline::{FileRecord, Message, RecordReceiver, RecordSender, StageState};
use crate::progress::{ProgressCallback, PHASE_FILTER};
use crate::scanner::Digest;

const STAGE: &str = "filter";

/// Target false-positive rate of the prefix pre-test.
const PREFIX_FP_RATE: f64 = 0.01;
/// Initial capacity estimate for the prefix pre-test; it grows as needed.
const PREFIX_EST_ITEMS: usize = 10_000;

/// What to do with a digest whose prefix has been seen but which is not in
/// the table yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Register the digest so a later file with the same digest is linked.
    #[default]
    Register,
    /// Discard the record without registering it. Later true duplicates of
    /// that file can go unreported.
    Drop,
}

/// State of one registered digest.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// First file with this digest; not forwarded yet.
    Unflagged(PathBuf),
    /// At least two files seen; every one of them has been forwarded.
    Flagged,
}

/// Outcome of offering one record to the [`CandidateTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Unseen prefix: the digest was registered, nothing to forward.
    Registered,
    /// Prefix seen, digest unknown. `registered` tells whether the digest
    /// was added to the table (depends on [`CollisionPolicy`]).
    Collision {
        /// Whether the digest is now in the table
        registered: bool,
    },
    /// Second file for this digest: forward `first`, then the current file.
    Pair {
        /// Path of the first file with this digest
        first: PathBuf,
    },
    /// Third or later file for this digest: forward the current file only.
    Member,
}

/// Digest table plus the set of seen prefixes.
///
/// The Bloom filter only answers "definitely unseen"; a hit is confirmed
/// against the exact set before a prefix counts as seen.
pub struct CandidateTable {
    entries: HashMap<Digest, Slot>,
    bloom: GrowableBloom,
    prefixes: HashSet<Box<[u8]>>,
    prefix_len: usize,
    policy: CollisionPolicy,
}

impl CandidateTable {
    /// Create an empty table keyed on the first `prefix_len` digest bytes.
    #[must_use]
    pub fn new(prefix_len: usize, policy: CollisionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            bloom: GrowableBloom::new(PREFIX_FP_RATE, PREFIX_EST_ITEMS),
            prefixes: HashSet::new(),
            prefix_len,
            policy,
        }
    }

    /// Offer a file with `digest` at `path` to the table.
    pub fn admit(&mut self, digest: &Digest, path: PathBuf) -> Admission {
        let prefix = digest.prefix(self.prefix_len);

        if !self.prefix_seen(prefix) {
            self.bloom.insert(prefix);
            self.prefixes.insert(Box::from(prefix));
            self.entries.insert(digest.clone(), Slot::Unflagged(path));
            return Admission::Registered;
        }

        match self.entries.get_mut(digest) {
            Some(slot) => match std::mem::replace(slot, Slot::Flagged) {
                Slot::Unflagged(first) => Admission::Pair { first },
                Slot::Flagged => Admission::Member,
            },
            None => match self.policy {
                CollisionPolicy::Register => {
                    self.entries.insert(digest.clone(), Slot::Unflagged(path));
                    Admission::Collision { registered: true }
                }
                CollisionPolicy::Drop => Admission::Collision { registered: false },
            },
        }
    }

    fn prefix_seen(&self, prefix: &[u8]) -> bool {
        self.bloom.contains(prefix) && self.prefixes.contains(prefix)
    }

    /// Number of registered digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no digest is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counters reported by the filter when it finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Records received from the crawler
    pub received: usize,
    /// Records forwarded to the verifier
    pub forwarded: usize,
    /// Records discarded as malformed
    pub malformed: usize,
    /// Prefix matches without a digest match
    pub prefix_collisions: usize,
    /// A neighbouring stage went away before end of stream
    pub disconnected: bool,
}

/// The candidate filter stage.
pub struct Deduplicator {
    config: Arc<ScanConfig>,
    table: Option<CandidateTable>,
    progress: Arc<dyn ProgressCallback>,
    state: StageState,
}

impl Deduplicator {
    /// Create a filter using the prefix length and collision policy of
    /// `config`.
    #[must_use]
    pub fn new(config: Arc<ScanConfig>, progress: Arc<dyn ProgressCallback>) -> Self {
        let table = CandidateTable::new(config.prefix_len, config.collision_policy);
        Self {
            config,
            table: Some(table),
            progress,
            state: StageState::Init,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Consume `rx` until end of stream, forwarding candidates to `tx`.
    ///
    /// On end of stream the marker is forwarded and the table released. If
    /// either channel disconnects first, the stage stops without forwarding
    /// a marker.
    pub fn run(&mut self, rx: &RecordReceiver, tx: &RecordSender) -> FilterStats {
        let mut stats = FilterStats::default();
        self.state.advance(STAGE, StageState::Running);
        self.progress.on_phase_start(PHASE_FILTER);

        loop {
            let record = match rx.recv() {
                Ok(Message::Record(record)) => record,
                Ok(Message::EndOfStream) => {
                    if tx.send(Message::EndOfStream).is_ok() {
                        self.state.advance(STAGE, StageState::Drained);
                    } else {
                        log::error!("{}: verifier closed before end of stream", STAGE);
                        stats.disconnected = true;
                    }
                    break;
                }
                Err(_) => {
                    log::error!("{}: crawler disconnected without end of stream", STAGE);
                    stats.disconnected = true;
                    break;
                }
            };

            stats.received += 1;
            if let Err(e) = record.validate(self.config.algorithm) {
                log::error!("{}: discarding malformed record: {}", STAGE, e);
                stats.malformed += 1;
                self.progress
                    .on_error(PHASE_FILTER, &record.path.to_string_lossy(), &e.to_string());
                continue;
            }
            self.progress.on_progress(
                PHASE_FILTER,
                stats.received,
                &record.path.to_string_lossy(),
            );

            if !self.filter(record, tx, &mut stats) {
                log::error!("{}: verifier closed its channel, stopping", STAGE);
                stats.disconnected = true;
                break;
            }
        }

        self.table = None;
        self.progress.on_phase_end(PHASE_FILTER);
        log::info!(
            "Filter finished: {} received, {} candidates, {} prefix collisions",
            stats.received,
            stats.forwarded,
            stats.prefix_collisions
        );
        self.state.advance(STAGE, StageState::Terminated);
        stats
    }

    /// Admit one record and forward what the table says. Returns `false`
    /// if the downstream channel is closed.
    fn filter(&mut self, record: FileRecord, tx: &RecordSender, stats: &mut FilterStats) -> bool {
        let Some(table) = self.table.as_mut() else {
            return true;
        };
        let FileRecord { path, fingerprint } = record;

        let forward = match table.admit(&fingerprint, path.clone()) {
            Admission::Registered => vec![],
            Admission::Collision { registered } => {
                stats.prefix_collisions += 1;
                if registered {
                    log::debug!("Prefix collision for {}, registered", path.display());
                } else {
                    log::debug!("Prefix collision for {}, dropped", path.display());
                }
                vec![]
            }
            Admission::Pair { first } => vec![first, path],
            Admission::Member => vec![path],
        };

        for path in forward {
            let message = Message::Record(FileRecord::new(path, fingerprint.clone()));
            if tx.send(message).is_err() {
                return false;
            }
            stats.forwarded += 1;
        }
        true
    }
}
