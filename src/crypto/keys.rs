//! Signing-authority keys and detached signature verification
//!
//! The proof producer signs the artifact's content hash (and optionally the
//! Merkle root). Verification goes through the [`SignatureVerifier`] trait so
//! callers can plug in whichever scheme their signing authority uses; the
//! crate ships a secp256k1 ECDSA implementation.

use secp256k1::rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::sha256;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature encoding")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Opaque detached-signature check.
///
/// `digest` is the hash that was signed; `public_key` is the signing
/// authority's key in the encoding the implementation expects.
pub trait SignatureVerifier: Send + Sync {
    /// Short scheme name for logs
    fn scheme(&self) -> &'static str;

    /// Returns `Ok(false)` for a well-formed signature that does not match.
    fn verify(&self, digest: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool, KeyError>;
}

/// secp256k1 ECDSA verifier accepting compact (64 byte) or DER signatures
/// and SEC1 encoded public keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn scheme(&self) -> &'static str {
        "secp256k1-ecdsa"
    }

    fn verify(&self, digest: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool, KeyError> {
        let public_key = PublicKey::from_slice(public_key).map_err(|_| KeyError::InvalidPublicKey)?;
        verify_signature(&public_key, digest, signature)
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a digest, returning a compact signature
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        let secp = Secp256k1::new();
        let message = digest_message(digest)?;
        let signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Verify a signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::verification_only();
    let message = digest_message(digest)?;

    let sig = if signature.len() == 64 {
        Signature::from_compact(signature)
    } else {
        Signature::from_der(signature)
    }
    .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

// Anything that is not already a 32-byte digest gets hashed first
fn digest_message(digest: &[u8]) -> Result<Message, KeyError> {
    let hash = if digest.len() == 32 {
        digest.to_vec()
    } else {
        sha256(digest)
    };
    Ok(Message::from_digest_slice(&hash)?)
}
