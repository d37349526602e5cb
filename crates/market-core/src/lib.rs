//! Market-data retrieval core
//!
//! Resolves a ticker or company name to a canonical [`Quote`], trying
//! upstream providers in a fixed priority order and caching each provider's
//! results separately. When every live provider fails, a static demo record
//! is served for a handful of well-known tickers; otherwise an unavailable
//! sentinel is returned. The public operations never fail.
//!
//! - Quotes from Financial Modeling Prep and Alpha Vantage
//! - Symbol search (company name to ranked tickers)
//! - Company background from Wikipedia, cached for much longer than quotes
//!
//! # Example
//!
//! ```rust,no_run
//! use market_core::{MarketData, MarketDataConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MarketDataConfig::from_env()?;
//!     let market = MarketData::from_config(config)?;
//!
//!     let quote = market.get_quote("aapl").await;
//!     println!("{} {:?} ({})", quote.symbol, quote.price, quote.source);
//!
//!     for candidate in market.resolve("Nvidia").await {
//!         println!("{} {}", candidate.symbol, candidate.display_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod providers;
pub mod resolver;

pub use cache::{CacheKey, Operation, TtlCache};
pub use config::{MarketDataConfig, MarketDataConfigBuilder};
pub use context::ContextFetcher;
pub use error::{FailureClass, MarketDataError, ProviderError, ProviderResult, Result};
pub use model::{ContextSummary, ProviderKind, Quote, SearchCandidate, SourceTag};
pub use orchestrator::{Attempt, AttemptOutcome, QuoteOrchestrator, QuoteSource, QuoteTrace};
pub use providers::{AlphaVantageClient, FmpClient, MarketDataProvider, WikipediaClient};
pub use resolver::SymbolResolver;

use std::sync::Arc;
use std::time::Duration;

/// Entry point bundling the orchestrator, resolver and context fetcher
pub struct MarketData {
    orchestrator: QuoteOrchestrator,
    resolver: SymbolResolver,
    context: ContextFetcher,
}

impl MarketData {
    /// Wire the built-in provider clients from a configuration
    pub fn from_config(config: MarketDataConfig) -> Result<Self> {
        config.validate()?;

        let fmp: Arc<dyn MarketDataProvider> = Arc::new(FmpClient::from_config(&config)?);
        let alpha_vantage: Arc<dyn MarketDataProvider> =
            Arc::new(AlphaVantageClient::from_config(&config)?);
        let wikipedia: Arc<dyn MarketDataProvider> =
            Arc::new(WikipediaClient::from_config(&config)?);

        let client_for = |kind: ProviderKind| match kind {
            ProviderKind::FinancialModelingPrep => Arc::clone(&fmp),
            ProviderKind::AlphaVantage => Arc::clone(&alpha_vantage),
            ProviderKind::Wikipedia => Arc::clone(&wikipedia),
        };

        let quote_sources = config
            .quote_priority
            .iter()
            .map(|&kind| QuoteSource::new(client_for(kind), config.quote_ttl(kind)))
            .collect();

        tracing::info!(
            priority = ?config.quote_priority,
            search = %config.search_provider,
            "Market data initialised"
        );

        Ok(Self::new(
            quote_sources,
            client_for(config.search_provider),
            config.search_ttl,
            client_for(ProviderKind::Wikipedia),
            config.context_ttl,
        ))
    }

    /// Assemble from arbitrary providers
    pub fn new(
        quote_sources: Vec<QuoteSource>,
        search_provider: Arc<dyn MarketDataProvider>,
        search_ttl: Duration,
        context_provider: Arc<dyn MarketDataProvider>,
        context_ttl: Duration,
    ) -> Self {
        Self {
            orchestrator: QuoteOrchestrator::new(TtlCache::new(), quote_sources),
            resolver: SymbolResolver::new(search_provider, TtlCache::new(), search_ttl),
            context: ContextFetcher::new(context_provider, context_ttl),
        }
    }

    /// Current quote for a ticker; never fails
    pub async fn get_quote(&self, symbol: &str) -> Quote {
        self.orchestrator.get_quote(symbol).await
    }

    /// Quote plus the provider attempts behind it
    pub async fn get_quote_traced(&self, symbol: &str) -> QuoteTrace {
        self.orchestrator.get_quote_traced(symbol).await
    }

    /// Ranked ticker candidates for a company name
    pub async fn resolve(&self, query: &str) -> Vec<SearchCandidate> {
        self.resolver.resolve(query).await
    }

    /// Background summary for a company, if one is available
    pub async fn get_context(&self, subject: &str) -> Option<ContextSummary> {
        self.context.get_context(subject).await
    }

    /// Providers disabled after configuration errors
    pub fn disabled_providers(&self) -> Vec<ProviderKind> {
        self.orchestrator.disabled_providers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(server: &MockServer) -> MarketDataConfig {
        MarketDataConfig::builder()
            .fmp_api_key("fmp_test_key")
            .alpha_vantage_api_key("av_test_key")
            .fmp_base_url(server.base_url())
            .alpha_vantage_base_url(server.base_url())
            .wikipedia_base_url(server.base_url())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fallback_from_fmp_to_alpha_vantage() {
        let server = MockServer::start_async().await;
        let fmp = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v3/quote/IBM");
                then.status(503);
            })
            .await;
        let av = server
            .mock_async(|when, then| {
                when.method(GET).path("/query").query_param("function", "GLOBAL_QUOTE");
                then.status(200).json_body(json!({
                    "Global Quote": {
                        "01. symbol": "IBM",
                        "05. price": "169.2100",
                        "09. change": "2.0600"
                    }
                }));
            })
            .await;

        let market = MarketData::from_config(config_for(&server)).unwrap();

        let quote = market.get_quote("ibm").await;
        assert_eq!(quote.source, SourceTag::Provider(ProviderKind::AlphaVantage));
        assert!(quote.percent_change.is_some());

        // Alpha Vantage result is cached; FMP is retried
        let trace = market.get_quote_traced("IBM").await;
        assert_eq!(trace.attempts[1].outcome, AttemptOutcome::CacheHit);
        fmp.assert_hits_async(2).await;
        av.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_missing_keys_fall_back_to_demo() {
        let server = MockServer::start_async().await;
        let config = MarketDataConfig::builder()
            .fmp_base_url(server.base_url())
            .alpha_vantage_base_url(server.base_url())
            .wikipedia_base_url(server.base_url())
            .build()
            .unwrap();

        let market = MarketData::from_config(config).unwrap();
        let quote = market.get_quote("NVDA").await;

        assert_eq!(quote.source, SourceTag::Demo);
        assert_eq!(
            market.disabled_providers(),
            vec![ProviderKind::FinancialModelingPrep, ProviderKind::AlphaVantage]
        );
        assert!(market.resolve("Nvidia").await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_and_context() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v3/search").query_param("query", "Apple");
                then.status(200).json_body(json!([
                    { "symbol": "AAPL", "name": "Apple Inc.", "exchangeShortName": "NASDAQ" },
                    {
                        "symbol": "APLE",
                        "name": "Apple Hospitality REIT",
                        "exchangeShortName": "NYSE"
                    }
                ]));
            })
            .await;
        let summary = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/rest_v1/page/summary/Apple_Inc.");
                then.status(200).json_body(json!({
                    "type": "standard",
                    "title": "Apple Inc.",
                    "extract": "Apple Inc. is an American multinational technology company."
                }));
            })
            .await;

        let market = MarketData::from_config(config_for(&server)).unwrap();

        let candidates = market.resolve("Apple").await;
        let symbols: Vec<_> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "APLE"]);

        assert!(market.get_context("Apple Inc.").await.is_some());
        assert!(market.get_context("Apple Inc.").await.is_some());
        summary.assert_hits_async(1).await;

        assert!(market.get_context("   ").await.is_none());
    }
}
