//! Blockchain explorer adapters
//!
//! Each provider exposes transactions, unspent outputs and broadcasting
//! with its own URL layout, field names and units. One adapter per
//! provider maps those onto the canonical entities in [`crate::core`].
//! The provider is chosen up front through [`Provider`]; adapters never
//! sniff response shapes at runtime.
//!
//! Adapters hold no mutable state, never retry, and can be shared across
//! concurrent verifications.

pub mod blockcypher;
pub mod error;
pub mod fees;
#[cfg(test)]
pub mod mock;
pub mod sochain;
pub mod transport;

pub use blockcypher::BlockcypherAdapter;
pub use error::ExplorerError;
pub use fees::{FeeSource, DEFAULT_FEE_URL};
pub use sochain::SoChainAdapter;
pub use transport::{HttpResponse, ReqwestTransport, Transport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{FeeReference, Network, Transaction, Utxo};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Provider
// =============================================================================

/// Supported blockchain data providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Blockcypher,
    SoChain,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Blockcypher => "https://api.blockcypher.com/v1/btc",
            Provider::SoChain => "https://chain.so/api/v2",
        }
    }

    /// Path segment naming the network in this provider's URLs
    pub fn network_segment(&self, network: Network) -> &'static str {
        match (self, network) {
            (Provider::Blockcypher, Network::Main) => "main",
            (Provider::Blockcypher, Network::Test) => "test3",
            (Provider::SoChain, Network::Main) => "BTC",
            (Provider::SoChain, Network::Test) => "BTCTEST",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Blockcypher => "blockcypher",
            Provider::SoChain => "sochain",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blockcypher" => Ok(Provider::Blockcypher),
            "sochain" | "chain.so" => Ok(Provider::SoChain),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

// =============================================================================
// Adapter Interface
// =============================================================================

/// Capability set every provider adapter implements, bound to one network
#[async_trait]
pub trait ExplorerAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn network(&self) -> Network;

    /// Fetch a transaction with its outputs in provider order
    async fn fetch_transaction(&self, txid: &str) -> Result<Transaction, ExplorerError>;

    /// Unspent outputs owned by an address
    async fn fetch_unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, ExplorerError>;

    /// Recommended fee rates
    async fn fetch_fee_reference(&self) -> Result<FeeReference, ExplorerError>;

    /// Submit a raw transaction, returning its id
    async fn broadcast_transaction(&self, raw_hex: &str) -> Result<String, ExplorerError>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Explorer configuration. The network is always explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub provider: Provider,
    pub network: Network,
    /// Per-request timeout
    pub timeout: Duration,
    /// Override for the provider's API root
    pub base_url: Option<String>,
    pub fee_url: String,
}

impl ExplorerConfig {
    pub fn new(provider: Provider, network: Network) -> Self {
        Self {
            provider,
            network,
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
            fee_url: DEFAULT_FEE_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_fee_url(mut self, fee_url: impl Into<String>) -> Self {
        self.fee_url = fee_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Build the adapter for a configuration over a fresh HTTP transport
pub fn connect(config: &ExplorerConfig) -> Result<Arc<dyn ExplorerAdapter>, ExplorerError> {
    let transport = ReqwestTransport::new(config.timeout)?;
    log::debug!("HTTP timeout {:?}", transport.timeout());
    Ok(adapter_for(config, Arc::new(transport)))
}

/// Build the adapter for a configuration over an existing transport
pub fn adapter_for(config: &ExplorerConfig, transport: Arc<dyn Transport>) -> Arc<dyn ExplorerAdapter> {
    let fees = FeeSource::new(config.fee_url.clone());
    log::debug!(
        "Using {} explorer on {} network at {}",
        config.provider,
        config.network,
        config.base_url()
    );

    match config.provider {
        Provider::Blockcypher => Arc::new(BlockcypherAdapter::new(
            transport,
            config.network,
            config.base_url(),
            fees,
        )),
        Provider::SoChain => Arc::new(SoChainAdapter::new(
            transport,
            config.network,
            config.base_url(),
            fees,
        )),
    }
}
