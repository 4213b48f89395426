//! Anchor-Proof: verification of artifacts anchored in Bitcoin transactions
//!
//! A batch of artifacts is hashed into a Merkle tree whose root is published
//! in an OP_RETURN output. Given an artifact and its proof file, this crate
//! proves the artifact belonged to that batch:
//! - Merkle path verification over SHA-256 (configurable)
//! - OP_RETURN payload extraction from asm text or raw script hex
//! - Blockchain explorer adapters (Blockcypher, SoChain) over async HTTP
//! - Exact Satoshi/Bitcoin conversion with arbitrary-precision decimals
//! - Detached signature checks (secp256k1)
//! - A single-use verification pipeline with observable state
//!
//! # Example
//!
//! ```rust
//! use anchor_proof::crypto::{compute_content_hash, verify_merkle_path, MerkleTree};
//!
//! // Issue a batch of three artifacts
//! let artifacts = [b"alice".to_vec(), b"bob".to_vec(), b"carol".to_vec()];
//! let leaves: Vec<Vec<u8>> = artifacts.iter().map(|a| compute_content_hash(a)).collect();
//! let tree = MerkleTree::from_leaves(&leaves).unwrap();
//!
//! // The root goes on chain; each holder keeps a path
//! let path = tree.proof(1).unwrap();
//! assert!(verify_merkle_path(&leaves[1], &path, tree.root()));
//!
//! // Amounts never touch floating point
//! let btc = anchor_proof::core::to_bitcoin(&150_000_000u64).unwrap();
//! assert_eq!(btc.to_string(), "1.5");
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod explorer;
pub mod proof;

// Re-export commonly used types
pub use core::{
    estimate_fee, extract_anchor_payload, to_bitcoin, to_satoshi, AnchorError, ConversionError,
    FeeReference, Network, Transaction, TransactionOutput, Utxo,
};
pub use crypto::{compute_content_hash, HashFunction, KeyPair, MerkleProofStep, MerkleVerifier};
pub use explorer::{ExplorerAdapter, ExplorerConfig, ExplorerError, Provider};
pub use proof::{
    ErrorKind, PipelineError, PipelineState, Proof, ProofDocument, ProofPipeline,
    SigningAuthority, VerificationReport, VerifierConfig,
};
