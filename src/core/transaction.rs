//! Canonical chain entities
//!
//! Every explorer adapter normalizes its provider's response schema onto
//! these types. Satoshi values are always integers here, address lists are
//! always lists, and output order is exactly the provider's order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output `kind` spellings that mark an unspendable data-carrying output
pub const NULL_DATA_KINDS: [&str; 2] = ["null-data", "nulldata"];

// =============================================================================
// Network
// =============================================================================

/// Bitcoin network a call is made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" | "btc" | "bitcoin" => Ok(Network::Main),
            "test" | "testnet" | "test3" | "btctest" => Ok(Network::Test),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

// =============================================================================
// Outputs and Transactions
// =============================================================================

/// How a provider hands out output scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEncoding {
    /// Disassembled instruction text, e.g. `OP_RETURN deadbeef`
    Asm,
    /// Raw script bytes as hex, e.g. `6a04deadbeef`
    Hex,
}

/// A single transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Position in the transaction's output list
    pub index: u32,
    /// Output value in satoshis
    pub value_satoshi: u64,
    /// Recipient addresses (empty for data outputs)
    pub addresses: Vec<String>,
    /// Locking script, in `encoding`
    pub script: String,
    pub encoding: ScriptEncoding,
    /// Provider-supplied script type
    pub kind: String,
}

impl TransactionOutput {
    /// Whether the provider marked this output as unspendable data
    pub fn is_null_data(&self) -> bool {
        NULL_DATA_KINDS.contains(&self.kind.as_str())
    }
}

/// A fetched transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub network: Network,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Sum of all output values, saturating
    pub fn total_output_satoshi(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value_satoshi))
    }

    /// Data-carrying outputs in provider order
    pub fn null_data_outputs(&self) -> impl Iterator<Item = &TransactionOutput> {
        self.outputs.iter().filter(|o| o.is_null_data())
    }
}

/// Unspent transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub output_index: u32,
    pub value_satoshi: u64,
    pub confirmations: u64,
}

impl Utxo {
    pub fn is_confirmed(&self) -> bool {
        self.confirmations > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(index: u32, kind: &str, value: u64) -> TransactionOutput {
        TransactionOutput {
            index,
            value_satoshi: value,
            addresses: vec![],
            script: String::new(),
            encoding: ScriptEncoding::Hex,
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!("BTCTEST".parse::<Network>().unwrap(), Network::Test);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Test);
        assert!("regtest".parse::<Network>().is_err());
        assert_eq!(Network::Test.to_string(), "test");
    }

    #[test]
    fn test_null_data_kinds() {
        assert!(output(0, "null-data", 0).is_null_data());
        assert!(output(0, "nulldata", 0).is_null_data());
        assert!(!output(0, "pay-to-pubkey-hash", 0).is_null_data());
        assert!(!output(0, "NULL-DATA", 0).is_null_data());
    }

    #[test]
    fn test_transaction_helpers() {
        let tx = Transaction {
            id: "ab".repeat(32),
            network: Network::Test,
            outputs: vec![
                output(0, "pay-to-witness-pubkey-hash", u64::MAX),
                output(1, "null-data", 0),
                output(2, "pay-to-pubkey-hash", 10),
            ],
        };

        assert_eq!(tx.total_output_satoshi(), u64::MAX);
        let data: Vec<u32> = tx.null_data_outputs().map(|o| o.index).collect();
        assert_eq!(data, vec![1]);
    }
}
