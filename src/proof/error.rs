//! Pipeline error taxonomy

use std::fmt;
use thiserror::Error;

use super::document::ValidationError;
use crate::core::{AnchorError, ConversionError};
use crate::crypto::KeyError;
use crate::explorer::ExplorerError;

/// Flat classification of every failure a verification can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Network,
    Schema,
    NotFound,
    RateLimited,
    NoAnchorFound,
    InvalidAnchorScript,
    MerkleMismatch,
    SignatureInvalid,
    Conversion,
}

impl ErrorKind {
    /// Whether the caller may reasonably try again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::RateLimited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Schema => "schema",
            ErrorKind::NotFound => "not-found",
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::NoAnchorFound => "no-anchor-found",
            ErrorKind::InvalidAnchorScript => "invalid-anchor-script",
            ErrorKind::MerkleMismatch => "merkle-mismatch",
            ErrorKind::SignatureInvalid => "signature-invalid",
            ErrorKind::Conversion => "conversion",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid proof: {0}")]
    Validation(#[from] ValidationError),
    #[error("Explorer error: {0}")]
    Explorer(#[from] ExplorerError),
    #[error("Anchor error: {0}")]
    Anchor(#[from] AnchorError),
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("Merkle root mismatch: computed {computed}, anchored {anchored}")]
    MerkleMismatch { computed: String, anchored: String },
    #[error("Invalid {target} signature: {reason}")]
    SignatureInvalid { target: String, reason: String },
    #[error("Pipeline already used; create a new one per verification")]
    AlreadyUsed,
}

impl From<KeyError> for PipelineError {
    fn from(err: KeyError) -> Self {
        PipelineError::SignatureInvalid {
            target: "detached".to_string(),
            reason: err.to_string(),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) | PipelineError::AlreadyUsed => ErrorKind::Validation,
            PipelineError::Explorer(e) => match e {
                ExplorerError::Network(_) => ErrorKind::Network,
                ExplorerError::NotFound(_) => ErrorKind::NotFound,
                ExplorerError::RateLimited(_) => ErrorKind::RateLimited,
                ExplorerError::Schema(_) => ErrorKind::Schema,
            },
            PipelineError::Anchor(AnchorError::NoAnchorFound) => ErrorKind::NoAnchorFound,
            PipelineError::Anchor(AnchorError::InvalidAnchorScript(_)) => {
                ErrorKind::InvalidAnchorScript
            }
            PipelineError::Conversion(_) => ErrorKind::Conversion,
            PipelineError::MerkleMismatch { .. } => ErrorKind::MerkleMismatch,
            PipelineError::SignatureInvalid { .. } => ErrorKind::SignatureInvalid,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
