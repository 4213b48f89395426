//! Proof documents and the verification pipeline
//!
//! This module contains:
//! - The proof file schema and its validation
//! - The pipeline that checks a proof against its anchoring transaction
//! - The error taxonomy verifications report

pub mod document;
pub mod error;
pub mod pipeline;

pub use document::{Proof, ProofDocument, ProofStepDocument, ValidationError};
pub use error::{ErrorKind, PipelineError};
pub use pipeline::{
    ChecksRun, PipelineState, ProofPipeline, SigningAuthority, Stage, VerificationReport,
    VerifierConfig,
};
