//! Duplicate detection module.
//!
//! This module provides:
//! - The candidate filter stage (prefix pre-filter + exact digest table)
//! - The verifier stage (full-content confirmation and report export)
//! - Duplicate group management
//! - The [`DuplicateFinder`] orchestrating all three pipeline stages

pub mod candidates;
pub mod finder;
pub mod groups;
pub mod verifier;

pub use candidates::{Admission, CandidateTable, CollisionPolicy, Deduplicator, FilterStats};
pub use finder::{DuplicateFinder, FinderError, RunMode, ScanHandle, ScanSummary};
pub use groups::{DuplicateGroup, DuplicateGroups};
pub use verifier::{Verifier, VerifierError, VerifyStats};
