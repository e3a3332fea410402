//! SHA-256 digests for content files
//!
//! The digest reported to clients is always computed from the bytes that
//! were actually read; a client-supplied digest is only ever compared
//! against it.

use crate::error::{IoResultExt, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Default read buffer for file hashing (1MB)
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Hash result as hex string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashResult {
    /// Hash value as lowercase hex string
    pub hash: String,
    /// Number of bytes hashed
    pub size: u64,
}

impl HashResult {
    /// Create a new hash result
    pub fn new(hash: String, size: u64) -> Self {
        Self { hash, size }
    }

    /// Exact comparison against a client-supplied digest.
    ///
    /// No case folding or trimming: a digest that is not byte-for-byte the
    /// lowercase hex string does not match.
    pub fn matches(&self, expected: &str) -> bool {
        self.hash == expected
    }
}

impl std::fmt::Display for HashResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Compute the digest of data in memory
pub fn hash_bytes(data: &[u8]) -> HashResult {
    let digest = Sha256::digest(data);
    HashResult::new(hex::encode(digest), data.len() as u64)
}

/// Compute the digest of a file
pub fn hash_file(path: &Path) -> Result<HashResult> {
    hash_file_with_buffer(path, DEFAULT_BUFFER_SIZE)
}

/// Compute the digest of a file with custom buffer size
pub fn hash_file_with_buffer(path: &Path, buffer_size: usize) -> Result<HashResult> {
    let file = File::open(path).with_path(path)?;
    let mut reader = BufReader::with_capacity(buffer_size, file);
    let mut hasher = StreamingHasher::new();
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let bytes_read = reader.read(&mut buffer).with_path(path)?;

        if bytes_read == 0 {
            break;
        }

        hasher.process(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Streaming hasher for chunked input
pub struct StreamingHasher {
    hasher: Sha256,
    bytes_processed: u64,
}

impl StreamingHasher {
    /// Create a new streaming hasher
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes_processed: 0,
        }
    }

    /// Process a chunk of data
    pub fn process(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes_processed += data.len() as u64;
    }

    /// Get bytes processed so far
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Finalize and get the result
    pub fn finalize(self) -> HashResult {
        HashResult::new(hex::encode(self.hasher.finalize()), self.bytes_processed)
    }
}

impl Default for StreamingHasher {
    fn default() -> Self {
        Self::new()
    }
}
