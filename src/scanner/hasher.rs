//! Content hashing with a closed set of digest algorithms.
//!
//! # Overview
//!
//! The pipeline hashes every file twice at most:
//!
//! 1. **Sniff hash** - the first `hash_bytes` bytes of a file, computed by the
//!    crawler as a cheap fingerprint.
//! 2. **Full hash** - the entire content, streamed in [`HASH_BLOCK_SIZE`]
//!    blocks, computed by the verifier only for files larger than the sniff
//!    budget.
//!
//! The algorithm is resolved once at startup into a [`HashAlgorithm`] and
//! never looked up by name again.
//!
//! # Example
//!
//! ```no_run
//! use dupsift::scanner::{HashAlgorithm, Hasher, SniffBudget};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Sha256);
//! let sniff = hasher.sniff(Path::new("a.bin"), SniffBudget::Bytes(15_000)).unwrap();
//! let full = hasher.full_hash(Path::new("a.bin")).unwrap();
//! println!("{} / {}", sniff, full);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::HashError;

/// Maximum number of bytes fed to the hash function in one call.
pub const HASH_BLOCK_SIZE: usize = 65_536;

/// Default number of bytes read for the sniff hash.
pub const DEFAULT_SNIFF_BYTES: u64 = 15_000;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 (128-bit). Default, matches reports produced by earlier tooling.
    #[default]
    Md5,
    /// SHA-1 (160-bit).
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// BLAKE3 (256-bit), the fastest option on modern hardware.
    Blake3,
}

impl HashAlgorithm {
    /// Every supported algorithm, in display order.
    pub const ALL: [HashAlgorithm; 7] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Blake3,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Length in bytes of every digest this algorithm produces.
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    fn state(self) -> HashState {
        match self {
            Self::Md5 => HashState::Md5(md5::Md5::new()),
            Self::Sha1 => HashState::Sha1(sha1::Sha1::new()),
            Self::Sha224 => HashState::Sha224(sha2::Sha224::new()),
            Self::Sha256 => HashState::Sha256(sha2::Sha256::new()),
            Self::Sha384 => HashState::Sha384(sha2::Sha384::new()),
            Self::Sha512 => HashState::Sha512(sha2::Sha512::new()),
            Self::Blake3 => HashState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when an algorithm name is not in the supported set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    /// Parse an algorithm name. Case-insensitive; `-` and `_` are ignored so
    /// `SHA-256` and `sha_256` both resolve to [`HashAlgorithm::Sha256`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// Incremental hashing state for one of the supported algorithms.
enum HashState {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl HashState {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha224(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> Digest {
        let bytes: Vec<u8> = match self {
            Self::Md5(h) => h.finalize().to_vec(),
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha224(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha384(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
            Self::Blake3(h) => h.finalize().as_bytes().to_vec(),
        };
        Digest::from(bytes)
    }
}

/// Opaque digest bytes. Comparable for equality, deliberately not ordered.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest(Box<[u8]>);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length digest (never produced by [`Hasher`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `len` bytes, used as an approximate pre-filter key.
    ///
    /// Shorter digests yield the whole digest.
    #[must_use]
    pub fn prefix(&self, len: usize) -> &[u8] {
        &self.0[..len.min(self.0.len())]
    }

    /// Lowercase hexadecimal representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write as _;
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in self.0.iter() {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl From<Vec<u8>> for Digest {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl From<&[u8]> for Digest {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// How much of each file the sniff hash covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffBudget {
    /// Hash at most this many leading bytes.
    Bytes(u64),
    /// Hash the entire file; the verifier never needs to rehash.
    WholeFile,
}

impl SniffBudget {
    /// Build a budget from the configuration value, where any negative number
    /// means "whole file".
    #[must_use]
    pub fn from_config(hash_bytes: i64) -> Self {
        u64::try_from(hash_bytes).map_or(Self::WholeFile, Self::Bytes)
    }

    /// True if a file of `size` bytes is fully covered by the sniff hash,
    /// i.e. its fingerprint is already a full-content hash.
    #[must_use]
    pub fn covers(self, size: u64) -> bool {
        match self {
            Self::Bytes(limit) => size <= limit,
            Self::WholeFile => true,
        }
    }
}

impl Default for SniffBudget {
    fn default() -> Self {
        Self::Bytes(DEFAULT_SNIFF_BYTES)
    }
}

impl fmt::Display for SniffBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(n) => write!(f, "{n} bytes"),
            Self::WholeFile => f.write_str("whole file"),
        }
    }
}

/// File hasher bound to one algorithm.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    block_size: usize,
}

impl Hasher {
    /// Create a hasher using [`HASH_BLOCK_SIZE`] reads.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            block_size: HASH_BLOCK_SIZE,
        }
    }

    /// Override the read block size (minimum 1 byte).
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// The algorithm this hasher uses.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> Digest {
        let mut state = self.algorithm.state();
        state.update(data);
        state.finalize()
    }

    /// Compute the sniff hash: the leading bytes allowed by `budget`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn sniff(&self, path: &Path, budget: SniffBudget) -> Result<Digest, HashError> {
        let limit = match budget {
            SniffBudget::Bytes(n) => Some(n),
            SniffBudget::WholeFile => None,
        };
        let file = open(path)?;
        self.hash_reader(file, limit)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Compute the hash of the entire file, streamed in bounded blocks.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        let file = open(path)?;
        self.hash_reader(file, None)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash up to `limit` bytes from a reader (`None` reads to EOF).
    ///
    /// Memory use is bounded by the block size regardless of input length.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, reader: R, limit: Option<u64>) -> io::Result<Digest> {
        let mut state = self.algorithm.state();
        let mut buffer = vec![0u8; self.block_size];

        let mut reader = reader.take(limit.unwrap_or(u64::MAX));

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(state.finalize())
    }
}

fn open(path: &Path) -> Result<File, HashError> {
    File::open(path).map_err(|e| HashError::from_io(path, e))
}
