//! HTTP transport used by explorer adapters
//!
//! Adapters only build URLs and decode bodies; the actual requests go
//! through a [`Transport`] so one connection pool can be shared by every
//! adapter and tests can run without a network.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::error::ExplorerError;

/// Status and raw body of an HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, ExplorerError>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ExplorerError>;

    async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, ExplorerError>;
}

/// `reqwest` backed transport with a per-request timeout
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ExplorerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn finish(
        &self,
        url: &str,
        result: reqwest::Result<reqwest::Response>,
    ) -> Result<HttpResponse, ExplorerError> {
        let response = result.map_err(|e| self.map_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(url, e))?;
        Ok(HttpResponse { status, body })
    }

    fn map_error(&self, url: &str, e: reqwest::Error) -> ExplorerError {
        if e.is_timeout() {
            ExplorerError::Network(format!("{url}: timed out after {:?}", self.timeout))
        } else {
            ExplorerError::Network(format!("{url}: {e}"))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, ExplorerError> {
        log::debug!("GET {}", url);
        let result = self.client.get(url).send().await;
        self.finish(url, result).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ExplorerError> {
        log::debug!("POST {} (json)", url);
        let result = self.client.post(url).json(body).send().await;
        self.finish(url, result).await
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, ExplorerError> {
        log::debug!("POST {} (form)", url);
        let result = self.client.post(url).form(fields).send().await;
        self.finish(url, result).await
    }
}
