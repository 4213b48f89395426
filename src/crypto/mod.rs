//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing and artifact content hashes
//! - Merkle path verification and tree building
//! - Detached signature verification (secp256k1)

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{compute_content_hash, double_sha256, sha256, sha256_hex, HashFunction, SHA256_LEN};
pub use keys::{
    public_key_from_hex, verify_signature, KeyError, KeyPair, Secp256k1Verifier, SignatureVerifier,
};
pub use merkle::{verify_merkle_path, MerkleProofStep, MerkleTree, MerkleVerifier, Position};
