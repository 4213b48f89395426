//! Blockcypher adapter
//!
//! Values are integer satoshis, scripts are raw hex and data outputs are
//! typed `null-data`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::error::{decode_response, ExplorerError};
use super::fees::FeeSource;
use super::transport::Transport;
use super::{ExplorerAdapter, Provider};
use crate::core::{FeeReference, Network, ScriptEncoding, Transaction, TransactionOutput, Utxo};

// =============================================================================
// Response Schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct TxResponse {
    hash: String,
    outputs: Vec<OutputResponse>,
}

#[derive(Debug, Deserialize)]
struct OutputResponse {
    value: u64,
    #[serde(default)]
    script: String,
    addresses: Option<Vec<String>>,
    script_type: String,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    txrefs: Option<Vec<TxRef>>,
    unconfirmed_txrefs: Option<Vec<TxRef>>,
}

#[derive(Debug, Deserialize)]
struct TxRef {
    tx_hash: String,
    tx_output_n: i64,
    value: u64,
    #[serde(default)]
    confirmations: u64,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    tx: PushedTx,
}

#[derive(Debug, Deserialize)]
struct PushedTx {
    hash: String,
}

// =============================================================================
// Adapter
// =============================================================================

pub struct BlockcypherAdapter {
    transport: Arc<dyn Transport>,
    network: Network,
    base_url: String,
    fees: FeeSource,
}

impl BlockcypherAdapter {
    pub fn new(
        transport: Arc<dyn Transport>,
        network: Network,
        base_url: impl Into<String>,
        fees: FeeSource,
    ) -> Self {
        Self {
            transport,
            network,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fees,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            Provider::Blockcypher.network_segment(self.network),
            path
        )
    }
}

#[async_trait]
impl ExplorerAdapter for BlockcypherAdapter {
    fn provider(&self) -> Provider {
        Provider::Blockcypher
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn fetch_transaction(&self, txid: &str) -> Result<Transaction, ExplorerError> {
        let response = self.transport.get(&self.url(&format!("txs/{txid}"))).await?;
        let tx: TxResponse = decode_response(response, &format!("transaction {txid}"))?;

        if !tx.hash.eq_ignore_ascii_case(txid) {
            return Err(ExplorerError::Schema(format!(
                "asked for transaction {txid}, got {}",
                tx.hash
            )));
        }

        let outputs = tx
            .outputs
            .into_iter()
            .enumerate()
            .map(|(index, o)| TransactionOutput {
                index: index as u32,
                value_satoshi: o.value,
                addresses: o.addresses.unwrap_or_default(),
                script: o.script,
                encoding: ScriptEncoding::Hex,
                kind: o.script_type,
            })
            .collect();

        Ok(Transaction {
            id: tx.hash,
            network: self.network,
            outputs,
        })
    }

    async fn fetch_unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, ExplorerError> {
        let url = self.url(&format!("addrs/{address}?unspentOnly=true"));
        let response = self.transport.get(&url).await?;
        let account: AddressResponse = decode_response(response, &format!("address {address}"))?;

        // Unconfirmed refs are only used when nothing has confirmed yet
        let refs = match (account.txrefs, account.unconfirmed_txrefs) {
            (Some(confirmed), _) if !confirmed.is_empty() => confirmed,
            (_, Some(unconfirmed)) => unconfirmed,
            _ => Vec::new(),
        };

        refs.into_iter()
            .map(|r| -> Result<Utxo, ExplorerError> {
                let output_index = u32::try_from(r.tx_output_n).map_err(|_| {
                    ExplorerError::Schema(format!(
                        "utxo {} has output index {}",
                        r.tx_hash, r.tx_output_n
                    ))
                })?;
                Ok(Utxo {
                    txid: r.tx_hash,
                    output_index,
                    value_satoshi: r.value,
                    confirmations: r.confirmations,
                })
            })
            .collect()
    }

    async fn fetch_fee_reference(&self) -> Result<FeeReference, ExplorerError> {
        self.fees.fetch(self.transport.as_ref()).await
    }

    async fn broadcast_transaction(&self, raw_hex: &str) -> Result<String, ExplorerError> {
        let body = json!({ "tx": raw_hex });
        let response = self.transport.post_json(&self.url("txs/push"), &body).await?;
        let pushed: PushResponse = decode_response(response, "broadcast")?;
        log::info!("Broadcast transaction {} on {}", pushed.tx.hash, self.network);
        Ok(pushed.tx.hash)
    }
}

// =============================================================================
// Tests
// =============================================================================
