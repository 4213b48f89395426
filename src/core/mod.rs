//! Core chain-facing components
//!
//! This module contains:
//! - Canonical transactions, outputs and UTXOs
//! - Anchor script decoding (OP_RETURN payload extraction)
//! - Exact Satoshi/Bitcoin conversion
//! - Fee references and estimation

pub mod currency;
pub mod fee;
pub mod script;
pub mod transaction;

pub use currency::{
    estimate_fee, to_bitcoin, to_satoshi, ConversionError, MonetaryInput, MAX_DECIMAL_EXPONENT,
    MAX_SUPPLY_SATOSHI, SATOSHI_PER_BITCOIN,
};
pub use fee::{FeeRate, FeeReference, Speed};
pub use script::{
    decode_payload, disassemble, extract_anchor_payload, payload_from_asm, payload_from_hex,
    AnchorError,
};
pub use transaction::{Network, ScriptEncoding, Transaction, TransactionOutput, Utxo};
