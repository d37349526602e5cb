//! Caching layer for provider results to reduce API calls
//!
//! Every entry carries its own TTL. The store is unbounded: the working set
//! is a handful of symbols per session, so expiry is the only eviction.

use moka::Expiry;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::ProviderKind;

/// Kind of provider call an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Quote,
    Search,
    Context,
}

/// Cache key for provider requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Provider that produced the value
    pub provider: ProviderKind,
    /// Symbol, query or subject the value was fetched for
    pub subject: String,
    /// Operation type
    pub operation: Operation,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(provider: ProviderKind, subject: impl Into<String>, operation: Operation) -> Self {
        Self {
            provider,
            subject: subject.into(),
            operation,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}:{}", self.provider, self.operation, self.subject)
    }
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl<V> Expiry<CacheKey, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Thread-safe TTL cache shared by provider calls
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct TtlCache<V> {
    inner: Cache<CacheKey, Entry<V>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Get a value from the cache
    ///
    /// Entries past their TTL behave exactly like missing ones.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    /// Insert a value that expires `ttl` after now
    ///
    /// Overwriting a key replaces the value and restarts its TTL.
    pub async fn insert(&self, key: CacheKey, value: V, ttl: Duration) {
        self.inner.insert(key, Entry { value, ttl }).await;
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// Concurrent callers that miss on the same key share a single fetch.
    /// Errors are returned to every waiting caller and nothing is cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        fetcher: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Clone + Send + Sync + 'static,
    {
        Ok(self.lookup(key, ttl, fetcher).await?.0)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting whether the
    /// value was served from the cache
    pub async fn lookup<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        fetcher: F,
    ) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Clone + Send + Sync + 'static,
    {
        let label = key.to_string();
        let mut fetched = false;

        let result = self
            .inner
            .try_get_with(key, async {
                fetched = true;
                tracing::debug!("Cache miss for key: {label}");
                fetcher().await.map(|value| Entry { value, ttl })
            })
            .await;

        match result {
            Ok(entry) => {
                if !fetched {
                    tracing::debug!("Cache hit for key: {label}");
                }
                Ok((entry.value, !fetched))
            },
            Err(err) => Err(Arc::unwrap_or_clone(err)),
        }
    }

    /// Invalidate a specific cache entry
    pub async fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Get the number of live cached entries
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
