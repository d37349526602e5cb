//! Company background with its own long-lived cache

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, Operation, TtlCache};
use crate::model::ContextSummary;
use crate::providers::MarketDataProvider;

/// Fetches short prose summaries about a company
///
/// Background changes rarely, so entries live far longer than quotes.
/// Any failure yields `None`.
pub struct ContextFetcher {
    provider: Arc<dyn MarketDataProvider>,
    cache: TtlCache<ContextSummary>,
    ttl: Duration,
}

impl ContextFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: TtlCache::new(),
            ttl,
        }
    }

    pub async fn get_context(&self, subject: &str) -> Option<ContextSummary> {
        let subject = subject.trim();
        if subject.is_empty() {
            return None;
        }

        let key = CacheKey::new(self.provider.kind(), subject, Operation::Context);
        self.cache
            .get_or_fetch(key, self.ttl, || self.provider.fetch_context(subject))
            .await
            .inspect_err(|err| err.log("context"))
            .ok()
    }
}
