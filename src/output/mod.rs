//! Report output.
//!
//! This module provides:
//! - [`report`]: the line-oriented duplicate report written by the verifier
//! - [`extract`]: per-target filtering of an existing report
//!
//! # Example
//!
//! ```
//! use dupsift::duplicates::DuplicateGroup;
//! use dupsift::output::ReportFormat;
//! use dupsift::scanner::Digest;
//! use std::path::PathBuf;
//!
//! let mut group = DuplicateGroup::new(Digest::from(vec![0u8; 16]), 10, PathBuf::from("A"));
//! group.paths.push(PathBuf::from("B"));
//!
//! assert_eq!(ReportFormat::default().format_line(&group), "10; A; B");
//! ```

pub mod extract;
pub mod report;

// Re-export main types
pub use extract::{extract_per_directory, ExtractError, Extractor};
pub use report::{export_report, ExportError, ReportFormat};
