//! Explorer error taxonomy

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::transport::HttpResponse;

/// Errors surfaced by explorer adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplorerError {
    /// Transport failure, timeout or provider-side outage
    #[error("Network error: {0}")]
    Network(String),
    /// The requested transaction or address does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Schema(String),
}

impl ExplorerError {
    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExplorerError::Network(_) | ExplorerError::RateLimited(_))
    }
}

/// Map an HTTP response onto the taxonomy and decode its JSON body.
///
/// `what` names the requested resource for error messages.
pub fn decode_response<T: DeserializeOwned>(
    response: HttpResponse,
    what: &str,
) -> Result<T, ExplorerError> {
    match response.status {
        200..=299 => serde_json::from_str(&response.body)
            .map_err(|e| ExplorerError::Schema(format!("{what}: {e}"))),
        404 => Err(ExplorerError::NotFound(what.to_string())),
        429 => Err(ExplorerError::RateLimited(what.to_string())),
        400..=499 => Err(ExplorerError::Schema(format!(
            "{what}: HTTP {} {}",
            response.status,
            truncate(&response.body)
        ))),
        status => Err(ExplorerError::Network(format!("{what}: HTTP {status}"))),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        hash: String,
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        let ok: Body = decode_response(response(200, r#"{"hash":"ab"}"#), "tx").unwrap();
        assert_eq!(ok.hash, "ab");

        assert_eq!(
            decode_response::<Body>(response(404, ""), "tx ab").unwrap_err(),
            ExplorerError::NotFound("tx ab".into())
        );
        assert!(matches!(
            decode_response::<Body>(response(429, ""), "tx"),
            Err(ExplorerError::RateLimited(_))
        ));
        assert!(matches!(
            decode_response::<Body>(response(400, "bad txid"), "tx"),
            Err(ExplorerError::Schema(_))
        ));
        assert!(matches!(
            decode_response::<Body>(response(503, ""), "tx"),
            Err(ExplorerError::Network(_))
        ));
    }

    #[test]
    fn test_bad_body_is_schema_error() {
        assert!(matches!(
            decode_response::<Body>(response(200, r#"{"txid":"ab"}"#), "tx"),
            Err(ExplorerError::Schema(_))
        ));
        assert!(matches!(
            decode_response::<Body>(response(200, "<html>"), "tx"),
            Err(ExplorerError::Schema(_))
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(ExplorerError::Network("timeout".into()).is_retryable());
        assert!(ExplorerError::RateLimited("x".into()).is_retryable());
        assert!(!ExplorerError::NotFound("x".into()).is_retryable());
        assert!(!ExplorerError::Schema("x".into()).is_retryable());
    }
}
