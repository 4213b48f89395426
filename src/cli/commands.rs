//! CLI commands for proof verification
//!
//! Implements all command handlers for the CLI interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{
    disassemble, extract_anchor_payload, to_bitcoin, to_satoshi, FeeRate, ScriptEncoding, Speed,
    TransactionOutput,
};
use crate::crypto::{compute_content_hash, sha256_hex, KeyPair, MerkleTree};
use crate::explorer::ExplorerAdapter;
use crate::proof::{
    PipelineState, Proof, ProofDocument, ProofPipeline, SigningAuthority, VerifierConfig,
};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Unit an amount given to `convert` is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Denomination {
    Satoshi,
    Bitcoin,
}

/// Load a proof file from disk
pub fn load_proof_file(path: &Path) -> CliResult<ProofDocument> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Write a proof file to disk
pub fn save_proof_file(path: &Path, document: &ProofDocument) -> CliResult<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)?;
    Ok(())
}

/// Verify a proof, optionally against the artifact it was issued for
pub async fn cmd_verify(
    adapter: Arc<dyn ExplorerAdapter>,
    config: VerifierConfig,
    proof_path: &Path,
    artifact: Option<&Path>,
    public_key: Option<&str>,
) -> CliResult<()> {
    let proof = load_proof_file(proof_path)?.validate_for(config.hash_function)?;

    let mut pipeline = ProofPipeline::new(adapter).with_config(config);
    if let Some(key) = public_key {
        let authority = SigningAuthority::secp256k1(hex::decode(key)?);
        println!("🔑 Signing authority: {}", hex::encode(authority.public_key()));
        pipeline = pipeline.with_signing_authority(authority);
    }

    println!(
        "🔍 Verifying '{}' against transaction {}",
        proof.image, proof.transaction_id
    );

    let result = match artifact {
        Some(path) => {
            let bytes = fs::read(path)?;
            pipeline.verify_artifact(&proof, &bytes).await
        }
        None => pipeline.verify_proof(&proof).await,
    };

    match result {
        Ok(report) => {
            println!("✅ Proof verified!");
            println!("   ├─ Provider: {} ({})", report.provider, report.network);
            println!("   ├─ Leaf: {}", report.leaf_hash_hex());
            println!("   ├─ Anchored root: {}", report.anchored_root_hex());
            println!(
                "   ├─ Content signature: {}",
                if report.checks.content_signature { "valid" } else { "not checked" }
            );
            println!(
                "   └─ Root signature: {}",
                if report.checks.root_signature { "valid" } else { "not checked" }
            );
            Ok(())
        }
        Err(e) => {
            if let PipelineState::Failed { stage, .. } = pipeline.state() {
                println!("❌ Verification failed at {} ({})", stage, e.kind());
            }
            if e.is_retryable() {
                println!("   The provider may be unavailable; try again later.");
            }
            Err(e.into())
        }
    }
}

/// Build proofs for a batch of artifacts.
///
/// Without a transaction id only the root is printed, ready to be anchored.
pub fn cmd_prove(
    files: &[PathBuf],
    output_dir: &Path,
    txid: Option<&str>,
    private_key: Option<&str>,
) -> CliResult<Vec<u8>> {
    let mut leaves = Vec::with_capacity(files.len());
    for path in files {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(format!("{} is empty", path.display()).into());
        }
        leaves.push(compute_content_hash(&bytes));
    }

    let tree = MerkleTree::from_leaves(&leaves).ok_or("no artifacts given")?;
    let root = tree.root().to_vec();
    println!(
        "🌳 Merkle root ({}) over {} artifact(s): {}",
        tree.hash_function().name(),
        tree.leaf_count(),
        hex::encode(&root)
    );

    let Some(txid) = txid else {
        println!("   Anchor this root in an OP_RETURN output, then rerun with --tx <txid>");
        return Ok(root);
    };

    let keys = private_key.map(KeyPair::from_private_key_hex).transpose()?;
    let root_signature = keys.as_ref().map(|k| k.sign(&root)).transpose()?;

    fs::create_dir_all(output_dir)?;
    for (index, (path, leaf)) in files.iter().zip(&leaves).enumerate() {
        let image = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let proof = Proof {
            image: image.clone(),
            index: index as u64,
            target_leaf_hash: leaf.clone(),
            steps: tree.proof(index).ok_or("leaf index out of range")?,
            transaction_id: txid.to_string(),
            detached_signature: keys.as_ref().map(|k| k.sign(leaf)).transpose()?,
            root_signature: root_signature.clone(),
        };

        let document = proof.to_document();
        document.validate()?;

        let out = output_dir.join(format!("{image}.proof.json"));
        save_proof_file(&out, &document)?;
        println!("   └─ {} -> {}", image, out.display());
    }

    Ok(root)
}

/// Print the content hash of an artifact
pub fn cmd_hash(path: &Path) -> CliResult<String> {
    let bytes = fs::read(path)?;
    let hash = sha256_hex(&bytes);
    println!("{}  {}", hash, path.display());
    Ok(hash)
}

/// Show a transaction's outputs and its anchored payload
pub async fn cmd_tx(adapter: Arc<dyn ExplorerAdapter>, txid: &str) -> CliResult<()> {
    let tx = adapter.fetch_transaction(txid).await?;

    println!("📄 Transaction {} ({})", tx.id, tx.network);
    let total = to_bitcoin(&tx.total_output_satoshi())?;
    println!("   Total output: {} BTC", total.to_plain_string());
    for output in &tx.outputs {
        println!(
            "   #{} | {} sat | {} | {}",
            output.index,
            output.value_satoshi,
            output.kind,
            if output.addresses.is_empty() {
                "-".to_string()
            } else {
                output.addresses.join(", ")
            }
        );
    }

    match extract_anchor_payload(&tx.outputs) {
        Ok(payload) => println!("   ⚓ Anchored payload: {}", hex::encode(payload)),
        Err(e) => println!("   ⚠️  {}", e),
    }
    if let Some(anchor) = tx.null_data_outputs().next() {
        println!("   Script: {}", anchor_script_asm(anchor)?);
    }

    Ok(())
}

/// Anchor script as instruction text, whatever encoding the provider used
pub fn anchor_script_asm(output: &TransactionOutput) -> CliResult<String> {
    Ok(match output.encoding {
        ScriptEncoding::Asm => output.script.clone(),
        ScriptEncoding::Hex => disassemble(&output.script)?,
    })
}

/// List unspent outputs for an address
pub async fn cmd_utxos(adapter: Arc<dyn ExplorerAdapter>, address: &str) -> CliResult<()> {
    let utxos = adapter.fetch_unspent_outputs(address).await?;

    println!("💰 Unspent outputs for {}", address);
    if utxos.is_empty() {
        println!("   (none)");
        return Ok(());
    }

    let mut total: u64 = 0;
    for utxo in &utxos {
        total = total.saturating_add(utxo.value_satoshi);
        println!(
            "   {}:{} | {} BTC | {} confirmation(s)",
            utxo.txid,
            utxo.output_index,
            to_bitcoin(&utxo.value_satoshi)?.to_plain_string(),
            utxo.confirmations
        );
    }
    println!("   Total: {} BTC", to_bitcoin(&total)?.to_plain_string());

    Ok(())
}

/// Show recommended fee rates and the fee for a transaction size
pub async fn cmd_fees(adapter: Arc<dyn ExplorerAdapter>, size_bytes: u64) -> CliResult<()> {
    let reference = adapter.fetch_fee_reference().await?;

    println!("💸 Recommended fees for a {} byte transaction", size_bytes);
    for speed in [Speed::Fastest, Speed::HalfHour, Speed::Hour] {
        let rate: FeeRate = reference.rate_for(speed);
        let fee = reference.fee_for(size_bytes, speed);
        println!(
            "   {:<9} {:>4} sat/B -> {} sat ({} BTC)",
            speed.to_string(),
            rate.as_sat_per_byte(),
            fee,
            to_bitcoin(&fee)?.to_plain_string()
        );
    }

    Ok(())
}

/// Submit a raw transaction
pub async fn cmd_broadcast(adapter: Arc<dyn ExplorerAdapter>, raw_hex: &str) -> CliResult<()> {
    hex::decode(raw_hex.trim())?;
    let txid = adapter.broadcast_transaction(raw_hex.trim()).await?;
    println!("📡 Broadcast on {} via {}", adapter.network(), adapter.provider());
    println!("   Transaction: {}", txid);
    Ok(())
}

/// Convert an amount between satoshi and bitcoin
pub fn cmd_convert(amount: &str, from: Denomination) -> CliResult<String> {
    let converted = match from {
        Denomination::Satoshi => format!("{} BTC", to_bitcoin(amount)?.to_plain_string()),
        Denomination::Bitcoin => format!("{} sat", to_satoshi(amount)?),
    };
    println!("{}", converted);
    Ok(converted)
}
