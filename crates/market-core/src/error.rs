//! Error types for market-data retrieval

use crate::model::ProviderKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a provider failure should be treated by the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Symbol or query unknown to this provider
    NotFound,
    /// Network error, timeout or rate limit
    Transient,
    /// Missing or rejected credentials
    Config,
    /// Payload could not be parsed into the canonical shape
    Malformed,
    /// The provider does not offer the requested capability
    Unsupported,
}

/// Failure of a single provider call
///
/// These never escape the public operations of the crate; the orchestrator,
/// resolver and context fetcher absorb them into fallbacks and sentinels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider does not know the symbol or query
    #[error("{provider}: not found: {what}")]
    NotFound { provider: ProviderKind, what: String },

    /// Network failure, timeout or rate limit; worth trying elsewhere
    #[error("{provider}: transient failure: {reason}")]
    Transient { provider: ProviderKind, reason: String },

    /// Missing or invalid credentials; retrying is pointless
    #[error("{provider}: configuration error: {reason}")]
    Config { provider: ProviderKind, reason: String },

    /// Response shape could not be understood
    #[error("{provider}: malformed response: {reason}")]
    Malformed { provider: ProviderKind, reason: String },

    /// Capability not implemented by this provider
    #[error("{provider}: {capability} is not supported")]
    Unsupported {
        provider: ProviderKind,
        capability: &'static str,
    },
}

impl ProviderError {
    pub fn not_found(provider: ProviderKind, what: impl Into<String>) -> Self {
        Self::NotFound {
            provider,
            what: what.into(),
        }
    }

    pub fn transient(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Transient {
            provider,
            reason: reason.into(),
        }
    }

    pub fn config(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Config {
            provider,
            reason: reason.into(),
        }
    }

    pub fn malformed(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            provider,
            reason: reason.into(),
        }
    }

    pub fn unsupported(provider: ProviderKind, capability: &'static str) -> Self {
        Self::Unsupported {
            provider,
            capability,
        }
    }

    /// Provider that produced the error
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::NotFound { provider, .. }
            | Self::Transient { provider, .. }
            | Self::Config { provider, .. }
            | Self::Malformed { provider, .. }
            | Self::Unsupported { provider, .. } => *provider,
        }
    }

    /// Failure class used by the fallback chain
    pub fn class(&self) -> FailureClass {
        match self {
            Self::NotFound { .. } => FailureClass::NotFound,
            Self::Transient { .. } => FailureClass::Transient,
            Self::Config { .. } => FailureClass::Config,
            Self::Malformed { .. } => FailureClass::Malformed,
            Self::Unsupported { .. } => FailureClass::Unsupported,
        }
    }

    /// True for credential problems, which disable the provider for good
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Emit a log line at the level matching the failure class
    pub(crate) fn log(&self, operation: &str) {
        match self.class() {
            FailureClass::Config => tracing::error!(operation, "{self}"),
            FailureClass::Malformed => tracing::warn!(operation, "{self}"),
            FailureClass::Transient => tracing::info!(operation, "{self}"),
            FailureClass::NotFound | FailureClass::Unsupported => {
                tracing::debug!(operation, "{self}");
            },
        }
    }
}

/// Result type for a single provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors raised while constructing the retrieval core
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown provider identifier in configuration
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A configured base URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias for construction-time operations
pub type Result<T> = std::result::Result<T, MarketDataError>;
