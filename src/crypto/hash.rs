//! Cryptographic hashing utilities
//!
//! Provides the SHA-256 based hashing used for artifact content hashes
//! and Merkle path folding.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length in bytes of a SHA-256 digest
pub const SHA256_LEN: usize = 32;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Content hash of an artifact: SHA-256 over its raw bytes.
///
/// This is the leaf value a registered artifact occupies in the Merkle tree.
pub fn compute_content_hash(artifact: &[u8]) -> Vec<u8> {
    sha256(artifact)
}

/// Hash function used to combine nodes while folding a Merkle path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    /// Single SHA-256 over the concatenated raw bytes
    #[default]
    Sha256,
    /// SHA-256 applied twice (Bitcoin-style)
    DoubleSha256,
}

impl HashFunction {
    /// Hash the given bytes
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::Sha256 => sha256(data),
            HashFunction::DoubleSha256 => double_sha256(data),
        }
    }

    /// Output length in bytes
    pub fn digest_len(&self) -> usize {
        SHA256_LEN
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashFunction::Sha256 => "sha256",
            HashFunction::DoubleSha256 => "double-sha256",
        }
    }
}
