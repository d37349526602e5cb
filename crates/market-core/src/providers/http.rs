//! Shared HTTP plumbing for provider clients
//!
//! Maps transport and status failures onto the provider failure classes so
//! every client classifies them the same way.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::model::ProviderKind;

/// Transport settings shared by all clients
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-call timeout enforced by the transport
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: concat!("market-lens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Build a reqwest client honouring the timeout and user agent
pub(crate) fn build_client(settings: &HttpSettings) -> Client {
    Client::builder()
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.clone())
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {e}");
            Client::new()
        })
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn endpoint(
    provider: ProviderKind,
    base: &Url,
    segments: &[&str],
) -> ProviderResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::config(provider, format!("unusable base URL: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Send a GET request and decode the JSON body
///
/// Timeouts, connection failures, 429 and 5xx are transient; 401/403 point at
/// credentials; 404 and other 4xx mean the provider has nothing for the
/// request; a non-JSON body is malformed.
pub(crate) async fn get_json(
    provider: ProviderKind,
    request: RequestBuilder,
    label: &str,
) -> ProviderResult<Value> {
    tracing::debug!(%provider, "GET {label}");

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::transient(provider, format!("{label}: request timed out"))
        } else if e.is_connect() {
            ProviderError::transient(provider, format!("{label}: connection failed"))
        } else {
            ProviderError::transient(provider, format!("{label}: request failed: {e}"))
        }
    })?;

    let status = response.status();
    classify_status(provider, status, label)?;

    let body = response.text().await.map_err(|e| {
        ProviderError::transient(provider, format!("{label}: failed to read body: {e}"))
    })?;

    parse_body(provider, &body, label)
}

fn classify_status(provider: ProviderKind, status: StatusCode, label: &str) -> ProviderResult<()> {
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::transient(provider, format!("{label}: rate limited")));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::config(
            provider,
            format!("{label}: credentials rejected ({status})"),
        ));
    }

    if status.is_server_error() {
        return Err(ProviderError::transient(provider, format!("{label}: HTTP {status}")));
    }

    Err(ProviderError::not_found(provider, format!("{label}: HTTP {status}")))
}

fn parse_body(provider: ProviderKind, body: &str, label: &str) -> ProviderResult<Value> {
    if body.trim().is_empty() {
        return Err(ProviderError::not_found(provider, format!("{label}: empty body")));
    }
    serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(provider, format!("{label}: invalid JSON: {e}")))
}
