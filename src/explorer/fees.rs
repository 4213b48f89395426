//! Recommended-fee endpoint shared by every adapter

use serde::Deserialize;

use super::error::{decode_response, ExplorerError};
use super::transport::Transport;
use crate::core::FeeReference;

/// Default recommended-fees endpoint
pub const DEFAULT_FEE_URL: &str = "https://bitcoinfees.earn.com/api/v1/fees/recommended";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: u64,
    half_hour_fee: u64,
    hour_fee: u64,
}

impl From<RecommendedFees> for FeeReference {
    fn from(fees: RecommendedFees) -> Self {
        FeeReference {
            fastest_sat_per_byte: fees.fastest_fee,
            half_hour_sat_per_byte: fees.half_hour_fee,
            hour_sat_per_byte: fees.hour_fee,
        }
    }
}

/// Where fee references come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSource {
    url: String,
}

impl FeeSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub async fn fetch(&self, transport: &dyn Transport) -> Result<FeeReference, ExplorerError> {
        let response = transport.get(&self.url).await?;
        let fees: RecommendedFees = decode_response(response, "fee reference")?;
        Ok(fees.into())
    }
}

impl Default for FeeSource {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_URL)
    }
}
