//! SoChain adapter
//!
//! Every response is wrapped in `{status, data}`. Values are decimal
//! bitcoin strings, each output names at most one address, scripts come
//! disassembled and data outputs are typed `nulldata`.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::error::{decode_response, ExplorerError};
use super::fees::FeeSource;
use super::transport::{HttpResponse, Transport};
use super::{ExplorerAdapter, Provider};
use crate::core::{
    to_satoshi, FeeReference, Network, ScriptEncoding, Transaction, TransactionOutput, Utxo,
};

// =============================================================================
// Response Schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct TxOutputs {
    txid: String,
    outputs: Vec<OutputEntry>,
}

#[derive(Debug, Deserialize)]
struct OutputEntry {
    output_no: u32,
    value: String,
    address: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    script: String,
}

#[derive(Debug, Deserialize)]
struct Unspent {
    txs: Vec<UnspentEntry>,
}

#[derive(Debug, Deserialize)]
struct UnspentEntry {
    txid: String,
    output_no: u32,
    value: String,
    #[serde(default)]
    confirmations: u64,
}

#[derive(Debug, Deserialize)]
struct Sent {
    txid: String,
}

fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    response: HttpResponse,
    what: &str,
) -> Result<T, ExplorerError> {
    let envelope: Envelope<T> = decode_response(response, what)?;
    if envelope.status != "success" {
        return Err(ExplorerError::Schema(format!(
            "{what}: provider status '{}'",
            envelope.status
        )));
    }
    Ok(envelope.data)
}

fn satoshi(value: &str, context: &str) -> Result<u64, ExplorerError> {
    to_satoshi(value).map_err(|e| ExplorerError::Schema(format!("{context}: {e}")))
}

// =============================================================================
// Adapter
// =============================================================================

pub struct SoChainAdapter {
    transport: Arc<dyn Transport>,
    network: Network,
    base_url: String,
    fees: FeeSource,
}

impl SoChainAdapter {
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

    fn url(&self, operation: &str, target: &str) -> String {
        let segment = Provider::SoChain.network_segment(self.network);
        if target.is_empty() {
            format!("{}/{}/{}", self.base_url, operation, segment)
        } else {
            format!("{}/{}/{}/{}", self.base_url, operation, segment, target)
        }
    }
}

#[async_trait]
impl ExplorerAdapter for SoChainAdapter {
    fn provider(&self) -> Provider {
        Provider::SoChain
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn fetch_transaction(&self, txid: &str) -> Result<Transaction, ExplorerError> {
        let response = self.transport.get(&self.url("get_tx_outputs", txid)).await?;
        let data: TxOutputs = unwrap_envelope(response, &format!("transaction {txid}"))?;

        if !data.txid.eq_ignore_ascii_case(txid) {
            return Err(ExplorerError::Schema(format!(
                "asked for transaction {txid}, got {}",
                data.txid
            )));
        }

        let outputs = data
            .outputs
            .into_iter()
            .map(|o| -> Result<TransactionOutput, ExplorerError> {
                let value_satoshi = satoshi(&o.value, &format!("output {}", o.output_no))?;
                Ok(TransactionOutput {
                    index: o.output_no,
                    value_satoshi,
                    addresses: o.address.into_iter().filter(|a| !a.is_empty()).collect(),
                    script: o.script,
                    encoding: ScriptEncoding::Asm,
                    kind: o.kind,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Transaction {
            id: data.txid,
            network: self.network,
            outputs,
        })
    }

    async fn fetch_unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, ExplorerError> {
        let response = self.transport.get(&self.url("get_tx_unspent", address)).await?;
        let data: Unspent = unwrap_envelope(response, &format!("address {address}"))?;

        data.txs
            .into_iter()
            .map(|u| -> Result<Utxo, ExplorerError> {
                Ok(Utxo {
                    value_satoshi: satoshi(&u.value, &format!("utxo {}:{}", u.txid, u.output_no))?,
                    txid: u.txid,
                    output_index: u.output_no,
                    confirmations: u.confirmations,
                })
            })
            .collect()
    }

    async fn fetch_fee_reference(&self) -> Result<FeeReference, ExplorerError> {
        self.fees.fetch(self.transport.as_ref()).await
    }

    async fn broadcast_transaction(&self, raw_hex: &str) -> Result<String, ExplorerError> {
        let url = self.url("send_tx", "");
        let response = self.transport.post_form(&url, &[("tx_hex", raw_hex)]).await?;
        let sent: Sent = unwrap_envelope(response, "broadcast")?;
        log::info!("Broadcast transaction {} on {}", sent.txid, self.network);
        Ok(sent.txid)
    }
}

// =============================================================================
// Tests
// =============================================================================
