//! Company name to ticker resolution

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, Operation, TtlCache};
use crate::model::SearchCandidate;
use crate::providers::MarketDataProvider;

/// Resolves free-text company names to ranked ticker candidates
///
/// Candidates keep the provider's own relevance order. Failures are logged
/// and reported as an empty list.
pub struct SymbolResolver {
    provider: Arc<dyn MarketDataProvider>,
    cache: TtlCache<Vec<SearchCandidate>>,
    ttl: Duration,
}

impl SymbolResolver {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: TtlCache<Vec<SearchCandidate>>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl,
        }
    }

    pub async fn resolve(&self, query: &str) -> Vec<SearchCandidate> {
        let query = normalise(query);
        if query.is_empty() {
            return Vec::new();
        }

        let key = CacheKey::new(self.provider.kind(), query.as_str(), Operation::Search);
        match self
            .cache
            .get_or_fetch(key, self.ttl, || self.provider.search(&query))
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                err.log("search");
                Vec::new()
            },
        }
    }
}

/// Collapse runs of whitespace so equivalent queries share a cache entry
fn normalise(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
