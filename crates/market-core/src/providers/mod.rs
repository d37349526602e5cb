//! API clients for upstream data providers
//!
//! Each client translates one provider's wire format into the canonical
//! [`Quote`], [`SearchCandidate`] and [`ContextSummary`] shapes, or into a
//! classified [`ProviderError`]. Clients hold no state beyond a single call
//! apart from their HTTP client and rate limiter.

pub mod alpha_vantage;
pub mod fmp;
pub mod http;
mod parse;
pub mod wikipedia;

pub use alpha_vantage::AlphaVantageClient;
pub use fmp::FmpClient;
pub use http::HttpSettings;
pub use wikipedia::WikipediaClient;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::model::{ContextSummary, ProviderKind, Quote, SearchCandidate};

/// Trait for market-data providers
///
/// Not every provider offers every capability; the default implementations
/// report [`ProviderError::Unsupported`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Which upstream source this client talks to
    fn kind(&self) -> ProviderKind;

    /// Fetch the current quote for an uppercase ticker
    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let _ = symbol;
        Err(ProviderError::unsupported(self.kind(), "quote"))
    }

    /// Search tickers by company name, in the provider's relevance order
    async fn search(&self, query: &str) -> ProviderResult<Vec<SearchCandidate>> {
        let _ = query;
        Err(ProviderError::unsupported(self.kind(), "search"))
    }

    /// Fetch a short background summary about a company
    async fn fetch_context(&self, subject: &str) -> ProviderResult<ContextSummary> {
        let _ = subject;
        Err(ProviderError::unsupported(self.kind(), "context"))
    }
}
