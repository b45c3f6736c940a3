//! Confirmed duplicate groups.
//!
//! # Overview
//!
//! The verifier appends every confirmed path to the group of its final
//! hash. Groups only grow; a group is reported once it has at least two
//! members.
//!
//! # Example
//!
//! ```
//! use dupsift::duplicates::DuplicateGroups;
//! use dupsift::scanner::{HashAlgorithm, Hasher};
//! use std::path::PathBuf;
//!
//! let hasher = Hasher::new(HashAlgorithm::Md5);
//! let mut groups = DuplicateGroups::new();
//!
//! groups.add(hasher.hash_bytes(b"same"), 4, PathBuf::from("/a"));
//! groups.add(hasher.hash_bytes(b"same"), 4, PathBuf::from("/b"));
//! groups.add(hasher.hash_bytes(b"other"), 5, PathBuf::from("/c"));
//!
//! assert_eq!(groups.len(), 2);
//! assert_eq!(groups.duplicates().count(), 1);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::scanner::Digest;

/// Paths sharing one confirmed hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Full-content hash shared by every member
    pub hash: Digest,
    /// Size of the first member, recorded when the group was created
    pub size: u64,
    /// Members in arrival order
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a group with its first member.
    #[must_use]
    pub fn new(hash: Digest, size: u64, first: PathBuf) -> Self {
        Self {
            hash,
            size,
            paths: vec![first],
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// True once the group has at least two members.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.paths.len() >= 2
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Space held by the copies beyond the first.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size.saturating_mul(self.duplicate_count() as u64)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        self.hash.to_hex()
    }
}

/// All groups built during one run, keyed by confirmed hash.
#[derive(Debug, Clone, Default)]
pub struct DuplicateGroups {
    groups: Vec<DuplicateGroup>,
    index: HashMap<Digest, usize>,
}

impl DuplicateGroups {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` to the group for `hash`, creating it if needed.
    ///
    /// `size` is only recorded for the first member of a group.
    pub fn add(&mut self, hash: Digest, size: u64, path: PathBuf) {
        match self.index.get(&hash) {
            Some(&i) => self.groups[i].paths.push(path),
            None => {
                self.index.insert(hash.clone(), self.groups.len());
                self.groups.push(DuplicateGroup::new(hash, size, path));
            }
        }
    }

    /// Number of distinct hashes seen, including singletons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups with at least two members, in creation order.
    pub fn duplicates(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.is_duplicate())
    }

    /// Files in reportable groups.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.duplicates().map(DuplicateGroup::len).sum()
    }

    /// Space held by copies across all reportable groups.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.duplicates().map(DuplicateGroup::wasted_space).sum()
    }

    /// Release every group.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
    }
}
