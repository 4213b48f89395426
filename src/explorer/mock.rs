//! In-memory transport for adapter and pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::error::ExplorerError;
use super::transport::{HttpResponse, Transport};

/// Canned responses keyed by URL; unknown URLs answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, Result<HttpResponse, ExplorerError>>,
    /// (url, body) of every POST, in order
    posts: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: &str, status: u16, body: serde_json::Value) -> Self {
        self.routes.insert(
            url.to_string(),
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn with_raw(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn with_error(mut self, url: &str, error: ExplorerError) -> Self {
        self.routes.insert(url.to_string(), Err(error));
        self
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn respond(&self, url: &str) -> Result<HttpResponse, ExplorerError> {
        self.routes.get(url).cloned().unwrap_or_else(|| {
            Ok(HttpResponse {
                status: 404,
                body: String::new(),
            })
        })
    }

    fn record(&self, url: &str, body: String) {
        if let Ok(mut posts) = self.posts.lock() {
            posts.push((url.to_string(), body));
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, ExplorerError> {
        self.respond(url)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, ExplorerError> {
        self.record(url, body.to_string());
        self.respond(url)
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<HttpResponse, ExplorerError> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        self.record(url, body);
        self.respond(url)
    }
}
