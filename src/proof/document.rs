//! Proof file schema and validation
//!
//! A proof file is produced by the registering party and ships next to the
//! artifact:
//!
//! ```json
//! {
//!   "image": "certificate.png",
//!   "hash": "<hex leaf hash>",
//!   "signature": "<hex signature over the leaf hash>",
//!   "index": 3,
//!   "tx": "<txid of the anchoring transaction>",
//!   "proofs": [{ "position": "left", "data": "<hex sibling>" }]
//! }
//! ```
//!
//! The crate never reads files itself; callers deserialize into
//! [`ProofDocument`] and call [`ProofDocument::validate`] to get an
//! immutable [`Proof`].

use bitcoin::Txid;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::crypto::{HashFunction, MerkleProofStep, Position};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Artifact is empty")]
    EmptyArtifact,
    #[error("Field '{field}' is not valid hex: {reason}")]
    InvalidHex { field: String, reason: String },
    #[error("Field '{field}' must be {expected} bytes, got {actual}")]
    WrongHashLength {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("Proof step {step} has position '{value}', expected 'left' or 'right'")]
    InvalidPosition { step: usize, value: String },
    #[error("Invalid transaction id '{0}'")]
    InvalidTransactionId(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// One step as written in the proof file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStepDocument {
    pub position: String,
    pub data: String,
}

/// Proof file as found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDocument {
    /// Artifact file name
    pub image: String,
    /// Hex leaf hash of the artifact
    pub hash: String,
    /// Hex signature over the leaf hash; may be empty
    #[serde(default)]
    pub signature: String,
    /// Leaf index in the tree
    pub index: u64,
    /// Anchoring transaction id
    pub tx: String,
    pub proofs: Vec<ProofStepDocument>,
    /// Hex signature over the Merkle root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_signature: Option<String>,
}

/// A validated, immutable proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub image: String,
    pub index: u64,
    pub target_leaf_hash: Vec<u8>,
    pub steps: Vec<MerkleProofStep>,
    pub transaction_id: String,
    /// Signature over the content (leaf) hash
    pub detached_signature: Option<Vec<u8>>,
    /// Signature over the anchored Merkle root
    pub root_signature: Option<Vec<u8>>,
}

impl ProofDocument {
    /// Validate against the default SHA-256 digest length
    pub fn validate(&self) -> Result<Proof, ValidationError> {
        self.validate_for(HashFunction::default())
    }

    /// Validate hex fields, positions, hash lengths and the txid
    pub fn validate_for(&self, hash: HashFunction) -> Result<Proof, ValidationError> {
        let expected = hash.digest_len();

        let target_leaf_hash = decode_hash("hash", &self.hash, expected)?;

        let steps = self
            .proofs
            .iter()
            .enumerate()
            .map(|(step, doc)| {
                let position =
                    Position::parse(&doc.position).ok_or_else(|| ValidationError::InvalidPosition {
                        step,
                        value: doc.position.clone(),
                    })?;
                let sibling = decode_hash(&format!("proofs[{step}].data"), &doc.data, expected)?;
                Ok(MerkleProofStep::new(position, sibling))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let transaction_id = Txid::from_str(self.tx.trim())
            .map_err(|_| ValidationError::InvalidTransactionId(self.tx.clone()))?
            .to_string();

        Ok(Proof {
            image: self.image.clone(),
            index: self.index,
            target_leaf_hash,
            steps,
            transaction_id,
            detached_signature: decode_optional("signature", Some(&self.signature))?,
            root_signature: decode_optional("root_signature", self.root_signature.as_deref())?,
        })
    }
}

impl Proof {
    /// Re-check hash lengths, for proofs built in code rather than loaded
    pub fn check(&self, hash: HashFunction) -> Result<(), ValidationError> {
        let expected = hash.digest_len();
        check_len("hash", &self.target_leaf_hash, expected)?;
        for (step, s) in self.steps.iter().enumerate() {
            check_len(&format!("proofs[{step}].data"), &s.sibling, expected)?;
        }
        Ok(())
    }

    /// Serialize back into the file schema
    pub fn to_document(&self) -> ProofDocument {
        ProofDocument {
            image: self.image.clone(),
            hash: hex::encode(&self.target_leaf_hash),
            signature: self
                .detached_signature
                .as_ref()
                .map(hex::encode)
                .unwrap_or_default(),
            index: self.index,
            tx: self.transaction_id.clone(),
            proofs: self
                .steps
                .iter()
                .map(|s| ProofStepDocument {
                    position: s.position.as_str().to_string(),
                    data: hex::encode(&s.sibling),
                })
                .collect(),
            root_signature: self.root_signature.as_ref().map(hex::encode),
        }
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ValidationError> {
    hex::decode(value.trim()).map_err(|e| ValidationError::InvalidHex {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

fn decode_hash(field: &str, value: &str, expected: usize) -> Result<Vec<u8>, ValidationError> {
    let bytes = decode_hex(field, value)?;
    check_len(field, &bytes, expected)?;
    Ok(bytes)
}

fn decode_optional(field: &str, value: Option<&str>) -> Result<Option<Vec<u8>>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => decode_hex(field, v).map(Some),
    }
}

fn check_len(field: &str, bytes: &[u8], expected: usize) -> Result<(), ValidationError> {
    if bytes.len() != expected {
        return Err(ValidationError::WrongHashLength {
            field: field.to_string(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
