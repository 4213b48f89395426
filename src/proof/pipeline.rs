//! Proof verification pipeline
//!
//! Drives one verification attempt through
//! `Idle → FetchingTransaction → ExtractingRoot → VerifyingMerkle →
//! [VerifyingSignature] → Verified | Failed`.
//!
//! A pipeline is single-use. The first failure moves it to
//! [`PipelineState::Failed`] with the stage it had reached; there are no
//! retries and no way back to `Idle`.

use std::fmt;
use std::sync::Arc;

use super::document::{Proof, ValidationError};
use super::error::PipelineError;
use crate::core::{extract_anchor_payload, Network};
use crate::crypto::{
    compute_content_hash, HashFunction, MerkleVerifier, Secp256k1Verifier, SignatureVerifier,
};
use crate::explorer::{ExplorerAdapter, Provider};

// =============================================================================
// Configuration
// =============================================================================

/// Verifier configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Hash used to combine nodes while folding the Merkle path
    pub hash_function: HashFunction,
}

/// Public key of the party that signed proofs, with the scheme to check it
#[derive(Clone)]
pub struct SigningAuthority {
    verifier: Arc<dyn SignatureVerifier>,
    public_key: Vec<u8>,
}

impl SigningAuthority {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, public_key: Vec<u8>) -> Self {
        Self {
            verifier,
            public_key,
        }
    }

    /// secp256k1 authority from a SEC1 encoded key
    pub fn secp256k1(public_key: Vec<u8>) -> Self {
        Self::new(Arc::new(Secp256k1Verifier), public_key)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn check(&self, target: &str, digest: &[u8], signature: &[u8]) -> Result<(), PipelineError> {
        let invalid = |reason: String| PipelineError::SignatureInvalid {
            target: target.to_string(),
            reason,
        };

        match self.verifier.verify(digest, signature, &self.public_key) {
            Ok(true) => {
                log::debug!("{} signature valid ({})", target, self.verifier.scheme());
                Ok(())
            }
            Ok(false) => Err(invalid("signature does not match".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        }
    }
}

impl fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningAuthority")
            .field("scheme", &self.verifier.scheme())
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}

// =============================================================================
// State
// =============================================================================

/// Non-terminal stages a pipeline passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    FetchingTransaction,
    ExtractingRoot,
    VerifyingMerkle,
    VerifyingSignature,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::FetchingTransaction => "fetching-transaction",
            Stage::ExtractingRoot => "extracting-root",
            Stage::VerifyingMerkle => "verifying-merkle",
            Stage::VerifyingSignature => "verifying-signature",
        };
        f.write_str(name)
    }
}

/// Which optional checks ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecksRun {
    pub content_signature: bool,
    pub root_signature: bool,
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub verified: bool,
    pub provider: Provider,
    pub network: Network,
    pub transaction_id: String,
    /// Leaf that was folded up the path
    pub leaf_hash: Vec<u8>,
    /// Root read from the anchoring transaction
    pub anchored_root: Vec<u8>,
    pub checks: ChecksRun,
}

impl VerificationReport {
    pub fn anchored_root_hex(&self) -> String {
        hex::encode(&self.anchored_root)
    }

    pub fn leaf_hash_hex(&self) -> String {
        hex::encode(&self.leaf_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingTransaction,
    ExtractingRoot,
    VerifyingMerkle,
    VerifyingSignature,
    Verified(VerificationReport),
    Failed { stage: Stage, error: PipelineError },
}

impl PipelineState {
    /// The in-progress stage, `None` once terminal
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Idle => Some(Stage::Idle),
            PipelineState::FetchingTransaction => Some(Stage::FetchingTransaction),
            PipelineState::ExtractingRoot => Some(Stage::ExtractingRoot),
            PipelineState::VerifyingMerkle => Some(Stage::VerifyingMerkle),
            PipelineState::VerifyingSignature => Some(Stage::VerifyingSignature),
            PipelineState::Verified(_) | PipelineState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }

    fn from_stage(stage: Stage) -> Self {
        match stage {
            Stage::Idle => PipelineState::Idle,
            Stage::FetchingTransaction => PipelineState::FetchingTransaction,
            Stage::ExtractingRoot => PipelineState::ExtractingRoot,
            Stage::VerifyingMerkle => PipelineState::VerifyingMerkle,
            Stage::VerifyingSignature => PipelineState::VerifyingSignature,
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct ProofPipeline {
    adapter: Arc<dyn ExplorerAdapter>,
    config: VerifierConfig,
    authority: Option<SigningAuthority>,
    state: PipelineState,
}

impl ProofPipeline {
    pub fn new(adapter: Arc<dyn ExplorerAdapter>) -> Self {
        Self {
            adapter,
            config: VerifierConfig::default(),
            authority: None,
            state: PipelineState::Idle,
        }
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_signing_authority(mut self, authority: SigningAuthority) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The report, once verified
    pub fn report(&self) -> Option<&VerificationReport> {
        match &self.state {
            PipelineState::Verified(report) => Some(report),
            _ => None,
        }
    }

    /// Verify an artifact's bytes against its proof. The leaf is the
    /// artifact's content hash.
    pub async fn verify_artifact(
        &mut self,
        proof: &Proof,
        artifact: &[u8],
    ) -> Result<VerificationReport, PipelineError> {
        self.run(proof, Some(artifact)).await
    }

    /// Verify a proof on its own, trusting the leaf hash it carries
    pub async fn verify_proof(&mut self, proof: &Proof) -> Result<VerificationReport, PipelineError> {
        self.run(proof, None).await
    }

    async fn run(
        &mut self,
        proof: &Proof,
        artifact: Option<&[u8]>,
    ) -> Result<VerificationReport, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyUsed);
        }

        match self.execute(proof, artifact).await {
            Ok(report) => {
                log::info!(
                    "Proof for '{}' verified against transaction {}",
                    proof.image,
                    report.transaction_id
                );
                self.state = PipelineState::Verified(report.clone());
                Ok(report)
            }
            Err(error) => {
                let stage = self.state.stage().unwrap_or(Stage::Idle);
                log::warn!(
                    "Verification of '{}' failed at {} ({}): {}",
                    proof.image,
                    stage,
                    error.kind(),
                    error
                );
                self.state = PipelineState::Failed {
                    stage,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    fn advance(&mut self, stage: Stage) {
        log::debug!(
            "Pipeline {} -> {}",
            self.state.stage().unwrap_or(Stage::Idle),
            stage
        );
        self.state = PipelineState::from_stage(stage);
    }

    async fn execute(
        &mut self,
        proof: &Proof,
        artifact: Option<&[u8]>,
    ) -> Result<VerificationReport, PipelineError> {
        let hash = self.config.hash_function;
        proof.check(hash)?;

        let leaf_hash = match artifact {
            Some([]) => return Err(ValidationError::EmptyArtifact.into()),
            Some(bytes) => {
                let content_hash = compute_content_hash(bytes);
                if content_hash != proof.target_leaf_hash {
                    log::warn!(
                        "Content hash of '{}' differs from the proof's leaf hash",
                        proof.image
                    );
                }
                content_hash
            }
            None => proof.target_leaf_hash.clone(),
        };

        self.advance(Stage::FetchingTransaction);
        let transaction = self.adapter.fetch_transaction(&proof.transaction_id).await?;

        self.advance(Stage::ExtractingRoot);
        let anchored_root = extract_anchor_payload(&transaction.outputs)?;
        if anchored_root.len() != hash.digest_len() {
            return Err(crate::core::AnchorError::InvalidAnchorScript(format!(
                "anchored payload is {} bytes, expected a {} byte root",
                anchored_root.len(),
                hash.digest_len()
            ))
            .into());
        }

        self.advance(Stage::VerifyingMerkle);
        let computed = MerkleVerifier::new(hash).compute_root(&leaf_hash, &proof.steps);
        if computed != anchored_root {
            return Err(PipelineError::MerkleMismatch {
                computed: hex::encode(&computed),
                anchored: hex::encode(&anchored_root),
            });
        }

        let mut checks = ChecksRun::default();
        let has_signature = proof.detached_signature.is_some() || proof.root_signature.is_some();
        match (self.authority.clone(), has_signature) {
            (Some(authority), true) => {
                self.advance(Stage::VerifyingSignature);

                if let Some(signature) = &proof.detached_signature {
                    authority.check("content", &leaf_hash, signature)?;
                    checks.content_signature = true;
                }
                if let Some(signature) = &proof.root_signature {
                    authority.check("root", &anchored_root, signature)?;
                    checks.root_signature = true;
                }
            }
            (None, true) => {
                log::debug!("Proof carries a signature but no signing authority was given");
            }
            _ => {}
        }

        Ok(VerificationReport {
            verified: true,
            provider: self.adapter.provider(),
            network: self.adapter.network(),
            transaction_id: transaction.id,
            leaf_hash,
            anchored_root,
            checks,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeeReference, ScriptEncoding, Transaction, TransactionOutput, Utxo};
    use crate::crypto::{KeyPair, MerkleTree};
    use crate::explorer::mock::MockTransport;
    use crate::explorer::{connect, BlockcypherAdapter, ExplorerConfig, ExplorerError, FeeSource};
    use crate::proof::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticExplorer {
        tx: Result<Transaction, ExplorerError>,
        fetches: AtomicUsize,
    }

    impl StaticExplorer {
        fn new(tx: Result<Transaction, ExplorerError>) -> Arc<Self> {
            Arc::new(Self {
                tx,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ExplorerAdapter for StaticExplorer {
        fn provider(&self) -> Provider {
            Provider::SoChain
        }

        fn network(&self) -> Network {
            Network::Test
        }

        async fn fetch_transaction(&self, _txid: &str) -> Result<Transaction, ExplorerError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.tx.clone()
        }

        async fn fetch_unspent_outputs(&self, _address: &str) -> Result<Vec<Utxo>, ExplorerError> {
            Ok(Vec::new())
        }

        async fn fetch_fee_reference(&self) -> Result<FeeReference, ExplorerError> {
            Err(ExplorerError::NotFound("fees".into()))
        }

        async fn broadcast_transaction(&self, _raw_hex: &str) -> Result<String, ExplorerError> {
            Err(ExplorerError::NotFound("broadcast".into()))
        }
    }

    fn txid() -> String {
        "7d".repeat(32)
    }

    fn artifacts() -> Vec<Vec<u8>> {
        (0..5)
            .map(|i| format!("certificate #{i} issued to holder {i}").into_bytes())
            .collect()
    }

    /// Proof for artifact `index` plus the root it resolves to
    fn fixture(index: usize) -> (Proof, Vec<u8>) {
        let leaves: Vec<Vec<u8>> = artifacts().iter().map(|a| compute_content_hash(a)).collect();
        let tree = MerkleTree::from_leaves(&leaves).unwrap();
        let proof = Proof {
            image: format!("certificate-{index}.png"),
            index: index as u64,
            target_leaf_hash: leaves[index].clone(),
            steps: tree.proof(index).unwrap(),
            transaction_id: txid(),
            detached_signature: None,
            root_signature: None,
        };
        (proof, tree.root().to_vec())
    }

    fn anchoring_tx(root: &[u8]) -> Transaction {
        Transaction {
            id: txid(),
            network: Network::Test,
            outputs: vec![
                TransactionOutput {
                    index: 0,
                    value_satoshi: 9_000,
                    addresses: vec!["mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt".into()],
                    script: "OP_DUP OP_HASH160 aa OP_EQUALVERIFY OP_CHECKSIG".into(),
                    encoding: ScriptEncoding::Asm,
                    kind: "pubkeyhash".into(),
                },
                TransactionOutput {
                    index: 1,
                    value_satoshi: 0,
                    addresses: Vec::new(),
                    script: format!("OP_RETURN {}", hex::encode(root)),
                    encoding: ScriptEncoding::Asm,
                    kind: "nulldata".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_valid_artifact_verifies() {
        let (proof, root) = fixture(2);
        let explorer = StaticExplorer::new(Ok(anchoring_tx(&root)));
        let mut pipeline = ProofPipeline::new(explorer.clone());

        let report = pipeline
            .verify_artifact(&proof, &artifacts()[2])
            .await
            .unwrap();

        assert!(report.verified);
        assert_eq!(report.anchored_root, root);
        assert_eq!(report.leaf_hash, proof.target_leaf_hash);
        assert_eq!(report.checks, ChecksRun::default());
        assert_eq!(report.network, Network::Test);
        assert_eq!(pipeline.state(), &PipelineState::Verified(report.clone()));
        assert_eq!(pipeline.report(), Some(&report));
        assert_eq!(explorer.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_leaf_verifies_without_artifact() {
        for index in 0..artifacts().len() {
            let (proof, root) = fixture(index);
            let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&root))));
            assert!(pipeline.verify_proof(&proof).await.is_ok(), "leaf {index}");
        }
    }

    #[tokio::test]
    async fn test_altered_artifact_is_merkle_mismatch() {
        let (proof, root) = fixture(1);
        let mut artifact = artifacts()[1].clone();
        artifact[0] ^= 0x01;

        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&root))));
        let err = pipeline.verify_artifact(&proof, &artifact).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MerkleMismatch);
        match pipeline.state() {
            PipelineState::Failed { stage, error } => {
                assert_eq!(*stage, Stage::VerifyingMerkle);
                assert_eq!(error, &err);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_anchor_fails_at_extraction() {
        let (proof, root) = fixture(0);
        let mut tx = anchoring_tx(&root);
        tx.outputs.truncate(1);

        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(tx)));
        let err = pipeline.verify_proof(&proof).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoAnchorFound);
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                stage: Stage::ExtractingRoot,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_short_anchor_payload_is_invalid_script() {
        let (proof, _) = fixture(0);
        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&[0xab; 4]))));

        let err = pipeline.verify_proof(&proof).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAnchorScript);
    }

    #[tokio::test]
    async fn test_network_failure_is_retryable() {
        let (proof, _) = fixture(0);
        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Err(ExplorerError::Network(
            "timed out after 30s".into(),
        ))));

        let err = pipeline.verify_proof(&proof).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                stage: Stage::FetchingTransaction,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_artifact_fails_before_fetch() {
        let (proof, root) = fixture(0);
        let explorer = StaticExplorer::new(Ok(anchoring_tx(&root)));
        let mut pipeline = ProofPipeline::new(explorer.clone());

        let err = pipeline.verify_artifact(&proof, &[]).await.unwrap_err();
        assert_eq!(err, PipelineError::Validation(ValidationError::EmptyArtifact));
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                stage: Stage::Idle,
                ..
            }
        ));
        assert_eq!(explorer.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signatures_checked() {
        let keys = KeyPair::generate();
        let (mut proof, root) = fixture(3);
        proof.detached_signature = Some(keys.sign(&proof.target_leaf_hash).unwrap());
        proof.root_signature = Some(keys.sign(&root).unwrap());

        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&root))))
            .with_signing_authority(SigningAuthority::secp256k1(
                keys.public_key.serialize().to_vec(),
            ));

        let report = pipeline
            .verify_artifact(&proof, &artifacts()[3])
            .await
            .unwrap();
        assert!(report.checks.content_signature);
        assert!(report.checks.root_signature);
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let signer = KeyPair::generate();
        let authority = KeyPair::generate();
        let (mut proof, root) = fixture(3);
        proof.detached_signature = Some(signer.sign(&proof.target_leaf_hash).unwrap());

        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&root))))
            .with_signing_authority(SigningAuthority::secp256k1(
                authority.public_key.serialize().to_vec(),
            ));

        let err = pipeline.verify_proof(&proof).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                stage: Stage::VerifyingSignature,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_signature_skipped_without_authority() {
        let (mut proof, root) = fixture(4);
        proof.detached_signature = Some(vec![0x30, 0x45]);

        let mut pipeline = ProofPipeline::new(StaticExplorer::new(Ok(anchoring_tx(&root))));
        let report = pipeline.verify_proof(&proof).await.unwrap();
        assert!(!report.checks.content_signature);
    }

    #[tokio::test]
    async fn test_pipeline_is_single_use() {
        let (proof, root) = fixture(0);
        let explorer = StaticExplorer::new(Ok(anchoring_tx(&root)));
        let mut pipeline = ProofPipeline::new(explorer.clone());

        pipeline.verify_proof(&proof).await.unwrap();
        let err = pipeline.verify_proof(&proof).await.unwrap_err();

        assert_eq!(err, PipelineError::AlreadyUsed);
        assert!(pipeline.state().is_terminal());
        assert!(pipeline.report().is_some());
        assert_eq!(explorer.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_timeout_fails_fetch() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ExplorerConfig::new(Provider::Blockcypher, Network::Test)
            .with_timeout(Duration::from_millis(100))
            .with_base_url(format!("http://{addr}"));
        let (proof, _) = fixture(0);

        let mut pipeline = ProofPipeline::new(connect(&config).unwrap());
        let err = pipeline.verify_proof(&proof).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                stage: Stage::FetchingTransaction,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_over_blockcypher() {
        let (proof, root) = fixture(2);
        let url = format!("https://api.blockcypher.com/v1/btc/test3/txs/{}", txid());
        let body = serde_json::json!({
            "hash": txid(),
            "outputs": [
                {"value": 0, "script": format!("6a20{}", hex::encode(&root)), "addresses": null, "script_type": "null-data"}
            ]
        });
        let transport = Arc::new(MockTransport::new().with_json(&url, 200, body));
        let adapter = Arc::new(BlockcypherAdapter::new(
            transport,
            Network::Test,
            "https://api.blockcypher.com/v1/btc",
            FeeSource::default(),
        ));

        let mut pipeline = ProofPipeline::new(adapter);
        let report = pipeline
            .verify_artifact(&proof, &artifacts()[2])
            .await
            .unwrap();
        assert_eq!(report.provider, Provider::Blockcypher);
        assert_eq!(report.anchored_root_hex(), hex::encode(&root));
    }
}
