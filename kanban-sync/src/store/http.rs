//! Shared plumbing for the HTTP-backed stores.

use crate::error::{Result, SyncError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Build a client that sends `credential` on every request.
///
/// The request timeout is the only timeout the engine has; there is no retry.
pub(crate) fn build_client(
    timeout: Duration,
    credential: Option<(HeaderName, String)>,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some((name, value)) = credential {
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| SyncError::invalid_value("token", e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    Ok(Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// Strip trailing slashes so paths can be appended with `format!`
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Extract a human-readable message from a JSON error body.
///
/// Tries `detail`, then `message`, then falls back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = json.get("detail").and_then(|v| v.as_str()) {
            return detail.to_string();
        }
        if let Some(msg) = json.get("message").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    body.to_string()
}

/// Turn any non-success status into [`SyncError::Api`]
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::api(status.as_u16(), extract_error_message(&body)))
}
