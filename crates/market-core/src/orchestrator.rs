//! Quote fallback chain
//!
//! Providers are tried strictly in configured order, each attempt wrapped in
//! the quote cache under that provider's own key. The first success wins.
//! When every provider fails the static demo table is consulted, and failing
//! that an unavailable sentinel is returned. `get_quote` never fails.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::cache::{CacheKey, Operation, TtlCache};
use crate::demo;
use crate::error::FailureClass;
use crate::model::{ProviderKind, Quote};
use crate::providers::MarketDataProvider;

/// One entry of the fallback chain
#[derive(Clone)]
pub struct QuoteSource {
    pub provider: Arc<dyn MarketDataProvider>,
    /// How long a successful quote from this provider stays cached
    pub ttl: Duration,
}

impl QuoteSource {
    pub fn new(provider: Arc<dyn MarketDataProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }
}

/// What happened when a provider was consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Served from the cache without a provider call
    CacheHit,
    /// Fetched live and cached
    Fetched,
    /// Provider disabled after a configuration error
    Skipped,
    /// Provider call failed
    Failed(FailureClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub provider: ProviderKind,
    pub outcome: AttemptOutcome,
}

/// A quote together with the attempts that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTrace {
    pub quote: Quote,
    /// Providers consulted, in chain order
    pub attempts: Vec<Attempt>,
}

/// Fallback orchestrator for quotes
pub struct QuoteOrchestrator {
    sources: Vec<QuoteSource>,
    cache: TtlCache<Quote>,
    disabled: RwLock<HashSet<ProviderKind>>,
}

impl QuoteOrchestrator {
    /// Create an orchestrator over `sources`, tried in the given order
    pub fn new(cache: TtlCache<Quote>, sources: Vec<QuoteSource>) -> Self {
        Self {
            sources,
            cache,
            disabled: RwLock::new(HashSet::new()),
        }
    }

    /// Quote cache shared by every attempt
    pub fn cache(&self) -> &TtlCache<Quote> {
        &self.cache
    }

    /// Providers in chain order
    pub fn priority(&self) -> Vec<ProviderKind> {
        self.sources.iter().map(|s| s.provider.kind()).collect()
    }

    /// Providers short-circuited for the rest of the process lifetime
    pub fn disabled_providers(&self) -> Vec<ProviderKind> {
        let disabled = self.disabled.read().unwrap_or_else(PoisonError::into_inner);
        let mut providers: Vec<_> = disabled.iter().copied().collect();
        providers.sort();
        providers
    }

    /// Get a quote for `symbol`; never fails
    pub async fn get_quote(&self, symbol: &str) -> Quote {
        self.get_quote_traced(symbol).await.quote
    }

    /// Get a quote along with the per-provider attempts
    pub async fn get_quote_traced(&self, symbol: &str) -> QuoteTrace {
        let symbol = symbol.trim().to_uppercase();
        let mut attempts = Vec::with_capacity(self.sources.len());

        if symbol.is_empty() {
            tracing::debug!("Empty symbol, no provider consulted");
            return QuoteTrace {
                quote: Quote::unavailable(symbol),
                attempts,
            };
        }

        for source in &self.sources {
            let provider = source.provider.kind();

            if self.is_disabled(provider) {
                tracing::debug!("Skipping disabled provider {provider} for {symbol}");
                attempts.push(Attempt {
                    provider,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            let key = CacheKey::new(provider, symbol.as_str(), Operation::Quote);
            let result = self
                .cache
                .lookup(key, source.ttl, || source.provider.fetch_quote(&symbol))
                .await;

            match result {
                Ok((quote, hit)) => {
                    let outcome = if hit {
                        AttemptOutcome::CacheHit
                    } else {
                        AttemptOutcome::Fetched
                    };
                    tracing::debug!("Quote for {symbol} from {provider} ({outcome:?})");
                    attempts.push(Attempt { provider, outcome });
                    return QuoteTrace { quote, attempts };
                },
                Err(err) => {
                    err.log("quote");
                    if err.is_config() {
                        self.disable(provider);
                    }
                    attempts.push(Attempt {
                        provider,
                        outcome: AttemptOutcome::Failed(err.class()),
                    });
                },
            }
        }

        let quote = match demo::demo_quote(&symbol) {
            Some(quote) => {
                tracing::warn!("All providers failed for {symbol}, serving demo quote");
                quote
            },
            None => {
                tracing::warn!("All providers failed for {symbol}, no quote available");
                Quote::unavailable(symbol)
            },
        };

        QuoteTrace { quote, attempts }
    }

    fn is_disabled(&self, provider: ProviderKind) -> bool {
        self.disabled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&provider)
    }

    fn disable(&self, provider: ProviderKind) {
        let newly_disabled = self
            .disabled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider);
        if newly_disabled {
            tracing::error!(
                "Disabling {provider} for the rest of the process: check its credentials"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::model::SourceTag;
    use crate::providers::MockMarketDataProvider;
    use rust_decimal_macros::dec;

    const FMP: ProviderKind = ProviderKind::FinancialModelingPrep;
    const AV: ProviderKind = ProviderKind::AlphaVantage;

    fn mock_provider(kind: ProviderKind) -> MockMarketDataProvider {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_kind().return_const(kind);
        mock
    }

    fn orchestrator(providers: Vec<MockMarketDataProvider>, ttl: Duration) -> QuoteOrchestrator {
        let sources = providers
            .into_iter()
            .map(|p| QuoteSource::new(Arc::new(p), ttl))
            .collect();
        QuoteOrchestrator::new(TtlCache::new(), sources)
    }

    fn failing(kind: ProviderKind, times: usize) -> MockMarketDataProvider {
        let mut mock = mock_provider(kind);
        mock.expect_fetch_quote()
            .times(times)
            .returning(move |_| Err(ProviderError::transient(kind, "connection reset")));
        mock
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let mut fmp = mock_provider(FMP);
        fmp.expect_fetch_quote()
            .times(1)
            .returning(|symbol| Ok(Quote::live(FMP, symbol, dec!(189.84))));

        let orchestrator = orchestrator(vec![fmp], Duration::from_secs(60));

        let first = orchestrator.get_quote("AAPL").await;
        assert_eq!(first.source, SourceTag::Provider(FMP));

        let trace = orchestrator.get_quote_traced("AAPL").await;
        assert_eq!(trace.quote, first);
        assert_eq!(trace.quote.retrieved_at, first.retrieved_at);
        assert_eq!(trace.attempts, vec![Attempt {
            provider: FMP,
            outcome: AttemptOutcome::CacheHit,
        }]);
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let mut fmp = mock_provider(FMP);
        fmp.expect_fetch_quote()
            .times(2)
            .returning(|symbol| Ok(Quote::live(FMP, symbol, dec!(100))));

        let orchestrator = orchestrator(vec![fmp], Duration::from_millis(50));

        orchestrator.get_quote("AAPL").await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        let trace = orchestrator.get_quote_traced("AAPL").await;
        assert_eq!(trace.attempts[0].outcome, AttemptOutcome::Fetched);
    }

    #[tokio::test]
    async fn test_transient_failure_falls_through_to_next_provider() {
        let mut av = mock_provider(AV);
        av.expect_fetch_quote()
            .times(1)
            .returning(|symbol| Ok(Quote::live(AV, symbol, dec!(190.10))));

        let orchestrator = orchestrator(vec![failing(FMP, 1), av], Duration::from_secs(60));
        let trace = orchestrator.get_quote_traced("AAPL").await;

        assert_eq!(trace.quote.source, SourceTag::Provider(AV));
        assert_eq!(trace.attempts, vec![
            Attempt {
                provider: FMP,
                outcome: AttemptOutcome::Failed(FailureClass::Transient),
            },
            Attempt {
                provider: AV,
                outcome: AttemptOutcome::Fetched,
            },
        ]);

        let cache = orchestrator.cache();
        assert!(cache.get(&CacheKey::new(AV, "AAPL", Operation::Quote)).await.is_some());
        assert!(cache.get(&CacheKey::new(FMP, "AAPL", Operation::Quote)).await.is_none());
    }

    #[tokio::test]
    async fn test_demo_quote_when_all_providers_fail() {
        let providers = vec![failing(FMP, 2), failing(AV, 2)];
        let orchestrator = orchestrator(providers, Duration::from_secs(60));

        let quote = orchestrator.get_quote("NVDA").await;
        assert_eq!(quote.source, SourceTag::Demo);
        assert_eq!(quote.price, demo::demo_quote("NVDA").and_then(|q| q.price));

        // Demo quotes are not cached: providers are consulted again
        let quote = orchestrator.get_quote("NVDA").await;
        assert_eq!(quote.source, SourceTag::Demo);
        assert!(orchestrator.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_when_no_demo_entry() {
        let providers = vec![failing(FMP, 1), failing(AV, 1)];
        let orchestrator = orchestrator(providers, Duration::from_secs(60));

        let quote = orchestrator.get_quote("ZZZZ").await;
        assert_eq!(quote.source, SourceTag::Unavailable);
        assert_eq!(quote.symbol, "ZZZZ");
        assert!(quote.price.is_none());
        assert!(quote.change.is_none());
        assert!(quote.percent_change.is_none());
    }

    #[tokio::test]
    async fn test_config_error_disables_provider() {
        let mut fmp = mock_provider(FMP);
        fmp.expect_fetch_quote()
            .times(1)
            .returning(|_| Err(ProviderError::config(FMP, "FMP_API_KEY is not configured")));

        let mut av = mock_provider(AV);
        av.expect_fetch_quote()
            .times(2)
            .returning(|symbol| Err(ProviderError::not_found(AV, symbol.to_string())));

        let orchestrator = orchestrator(vec![fmp, av], Duration::from_secs(60));

        let first = orchestrator.get_quote_traced("ZZZZ").await;
        assert_eq!(first.attempts[0].outcome, AttemptOutcome::Failed(FailureClass::Config));
        assert_eq!(orchestrator.disabled_providers(), vec![FMP]);

        let second = orchestrator.get_quote_traced("ZZZZ").await;
        assert_eq!(second.attempts, vec![
            Attempt {
                provider: FMP,
                outcome: AttemptOutcome::Skipped,
            },
            Attempt {
                provider: AV,
                outcome: AttemptOutcome::Failed(FailureClass::NotFound),
            },
        ]);
        assert_eq!(second.quote.source, SourceTag::Unavailable);
    }

    #[tokio::test]
    async fn test_symbol_is_normalised() {
        let mut fmp = mock_provider(FMP);
        fmp.expect_fetch_quote().times(1).returning(|symbol| {
            assert_eq!(symbol.to_string(), "AAPL");
            Ok(Quote::live(FMP, symbol, dec!(1)))
        });

        let orchestrator = orchestrator(vec![fmp], Duration::from_secs(60));
        let quote = orchestrator.get_quote("  aapl ").await;
        assert_eq!(quote.symbol, "AAPL");

        // Same cache entry regardless of input casing
        let trace = orchestrator.get_quote_traced("Aapl").await;
        assert_eq!(trace.attempts[0].outcome, AttemptOutcome::CacheHit);
    }

    #[tokio::test]
    async fn test_empty_symbol_consults_nothing() {
        let fmp = mock_provider(FMP);
        let orchestrator = orchestrator(vec![fmp], Duration::from_secs(60));

        let trace = orchestrator.get_quote_traced("   ").await;
        assert_eq!(trace.quote.source, SourceTag::Unavailable);
        assert!(trace.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_moves_on() {
        let mut fmp = mock_provider(FMP);
        fmp.expect_fetch_quote()
            .times(1)
            .returning(|_| Err(ProviderError::malformed(FMP, "unusable price")));
        let mut av = mock_provider(AV);
        av.expect_fetch_quote()
            .times(1)
            .returning(|symbol| Ok(Quote::live(AV, symbol, dec!(42))));

        let orchestrator = orchestrator(vec![fmp, av], Duration::from_secs(60));
        let quote = orchestrator.get_quote("IBM").await;

        assert_eq!(quote.source, SourceTag::Provider(AV));
        assert!(orchestrator.disabled_providers().is_empty());
        assert_eq!(orchestrator.priority(), vec![FMP, AV]);
    }
}
