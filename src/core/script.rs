//! Anchor script decoding
//!
//! Locates the data-carrying (OP_RETURN) output of a transaction and pulls
//! the anchored payload, normally a published Merkle root, out of its
//! script. Providers hand scripts out either as disassembled text or as raw
//! hex; the output's [`ScriptEncoding`] says which.

use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::{Instruction, Script};
use thiserror::Error;

use super::transaction::{ScriptEncoding, TransactionOutput};

/// Marker token in disassembled scripts
pub const OP_RETURN_ASM: &str = "OP_RETURN";

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    #[error("No OP_RETURN output found")]
    NoAnchorFound,
    #[error("Invalid anchor script: {0}")]
    InvalidAnchorScript(String),
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract the anchored payload from a transaction's outputs.
///
/// The first null-data output in provider order wins; later ones are
/// ignored.
pub fn extract_anchor_payload(outputs: &[TransactionOutput]) -> Result<Vec<u8>, AnchorError> {
    let mut anchors = outputs.iter().filter(|o| o.is_null_data());
    let output = anchors.next().ok_or(AnchorError::NoAnchorFound)?;

    let ignored = anchors.count();
    if ignored > 0 {
        log::warn!(
            "Transaction carries {} extra data output(s), using output {}",
            ignored,
            output.index
        );
    }

    decode_payload(output)
}

/// Decode the payload of a single data output
pub fn decode_payload(output: &TransactionOutput) -> Result<Vec<u8>, AnchorError> {
    match output.encoding {
        ScriptEncoding::Asm => payload_from_asm(&output.script),
        ScriptEncoding::Hex => payload_from_hex(&output.script),
    }
}

/// Payload following the `OP_RETURN` token of a disassembled script.
///
/// Push annotations some explorers insert (`OP_PUSHBYTES_32`,
/// `OP_PUSHDATA1`) are skipped.
pub fn payload_from_asm(asm: &str) -> Result<Vec<u8>, AnchorError> {
    let mut tokens = asm.split_whitespace();

    if !tokens.by_ref().any(|t| t == OP_RETURN_ASM) {
        return Err(AnchorError::InvalidAnchorScript(format!(
            "missing {OP_RETURN_ASM} marker in '{asm}'"
        )));
    }

    let payload = tokens
        .find(|t| !t.starts_with("OP_PUSH"))
        .ok_or_else(|| AnchorError::InvalidAnchorScript("OP_RETURN carries no payload".into()))?;

    hex::decode(payload)
        .map_err(|e| AnchorError::InvalidAnchorScript(format!("payload is not hex: {e}")))
}

/// Payload pushed right after `0x6a` in a raw hex script
pub fn payload_from_hex(script_hex: &str) -> Result<Vec<u8>, AnchorError> {
    let bytes = hex::decode(script_hex.trim())
        .map_err(|e| AnchorError::InvalidAnchorScript(format!("script is not hex: {e}")))?;
    payload_from_bytes(&bytes)
}

/// Payload pushed right after `0x6a` in raw script bytes
pub fn payload_from_bytes(script: &[u8]) -> Result<Vec<u8>, AnchorError> {
    match script.first() {
        Some(&op) if op == OP_RETURN.to_u8() => {}
        Some(&op) => {
            return Err(AnchorError::InvalidAnchorScript(format!(
                "expected OP_RETURN (0x6a), found 0x{op:02x}"
            )))
        }
        None => return Err(AnchorError::InvalidAnchorScript("empty script".into())),
    }

    let rest = Script::from_bytes(&script[1..]);
    match rest.instructions().next() {
        Some(Ok(Instruction::PushBytes(push))) => Ok(push.as_bytes().to_vec()),
        Some(Ok(Instruction::Op(op))) => Err(AnchorError::InvalidAnchorScript(format!(
            "expected a data push after OP_RETURN, found {op}"
        ))),
        Some(Err(e)) => Err(AnchorError::InvalidAnchorScript(format!("bad push: {e}"))),
        None => Err(AnchorError::InvalidAnchorScript("OP_RETURN carries no payload".into())),
    }
}

/// Render a raw hex script as instruction text
pub fn disassemble(script_hex: &str) -> Result<String, AnchorError> {
    let bytes = hex::decode(script_hex.trim())
        .map_err(|e| AnchorError::InvalidAnchorScript(format!("script is not hex: {e}")))?;
    Ok(Script::from_bytes(&bytes).to_asm_string())
}

// =============================================================================
// Tests
// =============================================================================
