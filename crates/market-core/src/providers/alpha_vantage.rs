//! Alpha Vantage API client
//!
//! Every numeric field arrives as text (`"05. price": "189.8400"`,
//! `"10. change percent": "1.2345%"`). Throttling is reported inside a 200
//! response through a `"Note"` or `"Information"` field.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use url::Url;

use super::MarketDataProvider;
use super::http::{self, HttpSettings};
use super::parse;
use crate::config::MarketDataConfig;
use crate::error::{ProviderError, ProviderResult, Result};
use crate::model::{ProviderKind, Quote, SearchCandidate};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Free tier allows five requests per minute
pub const FREE_TIER_RATE_LIMIT: u32 = 5;

const KIND: ProviderKind = ProviderKind::AlphaVantage;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    rate_limiter: SharedRateLimiter,
    search_limit: usize,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key; `None` makes every call a configuration error
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    pub fn new(
        api_key: Option<String>,
        rate_limit: u32,
        base_url: Url,
        settings: &HttpSettings,
    ) -> Self {
        let per_minute = NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            client: http::build_client(settings),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
            rate_limiter,
            search_limit: 10,
        }
    }

    /// Build from the shared configuration
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        let base_url = Url::parse(&config.alpha_vantage_base_url)?;
        Ok(Self::new(
            config.alpha_vantage_api_key.clone(),
            config.alpha_vantage_rate_limit,
            base_url,
            &config.http_settings(),
        )
        .with_search_limit(config.search_limit))
    }

    /// Set the maximum number of search results returned
    ///
    /// SYMBOL_SEARCH has no limit parameter, so matches are truncated locally.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    async fn query(&self, params: &[(&str, &str)], label: &str) -> ProviderResult<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::config(KIND, "ALPHA_VANTAGE_API_KEY is not configured"))?;

        // Over the local budget: let the chain move on instead of waiting
        if self.rate_limiter.check().is_err() {
            return Err(ProviderError::transient(
                KIND,
                format!("{label}: local rate limit reached"),
            ));
        }

        let url = http::endpoint(KIND, &self.base_url, &["query"])?;
        let request = self
            .client
            .get(url)
            .query(params)
            .query(&[("apikey", api_key)]);
        let body = http::get_json(KIND, request, label).await?;

        check_error(&body, label)?;
        Ok(body)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let label = format!("GLOBAL_QUOTE/{symbol}");
        let body = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)], &label)
            .await?;
        parse_quote(symbol, &body)
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<SearchCandidate>> {
        let body = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", query)], "SYMBOL_SEARCH")
            .await?;
        let mut candidates = parse_search(&body)?;
        candidates.truncate(self.search_limit);
        Ok(candidates)
    }
}

/// Classify error, throttling and informational bodies
fn check_error(body: &Value, label: &str) -> ProviderResult<()> {
    if let Some(message) = parse::error_message(body, &["Error Message"]) {
        if parse::mentions_api_key(message) {
            return Err(ProviderError::config(KIND, message.to_string()));
        }
        return Err(ProviderError::not_found(KIND, format!("{label}: {message}")));
    }

    if let Some(message) = parse::error_message(body, &["Note", "Information"]) {
        let lower = message.to_ascii_lowercase();
        let rejected = lower.contains("invalid") || lower.contains("missing");
        if parse::mentions_api_key(message) && rejected {
            return Err(ProviderError::config(KIND, message.to_string()));
        }
        return Err(ProviderError::transient(KIND, format!("{label}: {message}")));
    }

    Ok(())
}

fn parse_quote(symbol: &str, body: &Value) -> ProviderResult<Quote> {
    let fields = body
        .get("Global Quote")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ProviderError::malformed(KIND, format!("quote for {symbol}: missing \"Global Quote\""))
        })?;

    if fields.is_empty() {
        return Err(ProviderError::not_found(KIND, format!("quote for {symbol}")));
    }

    let price = parse::decimal(fields.get("05. price")).ok_or_else(|| {
        ProviderError::malformed(KIND, format!("quote for {symbol}: unusable price"))
    })?;

    let ticker = parse::text(fields.get("01. symbol")).unwrap_or_else(|| symbol.to_string());

    Ok(Quote::live(KIND, ticker, price).with_change(
        parse::decimal(fields.get("09. change")),
        parse::decimal(fields.get("10. change percent")),
    ))
}

fn parse_search(body: &Value) -> ProviderResult<Vec<SearchCandidate>> {
    let matches = body
        .get("bestMatches")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::malformed(KIND, "search: missing \"bestMatches\""))?;

    Ok(matches
        .iter()
        .filter_map(|item| {
            let symbol = parse::text(item.get("1. symbol"))?;
            Some(SearchCandidate {
                display_name: parse::text(item.get("2. name")).unwrap_or_else(|| symbol.clone()),
                exchange: parse::text(item.get("4. region")),
                symbol,
            })
        })
        .collect())
}
