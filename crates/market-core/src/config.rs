//! Configuration for market-data retrieval
//!
//! The configuration is built once and treated as immutable afterwards.
//! Missing API keys are not a validation error: they surface as a
//! configuration failure of that one provider at call time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::{MarketDataError, Result};
use crate::model::ProviderKind;
use crate::providers::{HttpSettings, alpha_vantage, fmp, wikipedia};

pub const ENV_FMP_API_KEY: &str = "FMP_API_KEY";
pub const ENV_ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_PRIORITY: &str = "MARKET_DATA_PRIORITY";

/// Configuration for the retrieval core
#[derive(Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Financial Modeling Prep API key
    #[serde(default, skip_serializing)]
    pub fmp_api_key: Option<String>,

    /// Alpha Vantage API key
    #[serde(default, skip_serializing)]
    pub alpha_vantage_api_key: Option<String>,

    pub fmp_base_url: String,
    pub alpha_vantage_base_url: String,
    pub wikipedia_base_url: String,

    /// Quote providers, tried strictly in this order
    pub quote_priority: Vec<ProviderKind>,

    /// Provider used by the symbol resolver
    pub search_provider: ProviderKind,

    /// Cache TTL for FMP quotes
    pub fmp_quote_ttl: Duration,

    /// Cache TTL for Alpha Vantage quotes
    pub alpha_vantage_quote_ttl: Duration,

    /// Cache TTL for symbol search results
    pub search_ttl: Duration,

    /// Cache TTL for company background
    pub context_ttl: Duration,

    /// Per-call transport timeout
    pub request_timeout: Duration,

    /// Alpha Vantage requests allowed per minute
    pub alpha_vantage_rate_limit: u32,

    /// Maximum number of search candidates requested
    pub search_limit: usize,

    /// User agent sent to every provider
    pub user_agent: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            fmp_api_key: None,
            alpha_vantage_api_key: None,
            fmp_base_url: fmp::DEFAULT_BASE_URL.to_string(),
            alpha_vantage_base_url: alpha_vantage::DEFAULT_BASE_URL.to_string(),
            wikipedia_base_url: wikipedia::DEFAULT_BASE_URL.to_string(),
            quote_priority: vec![ProviderKind::FinancialModelingPrep, ProviderKind::AlphaVantage],
            search_provider: ProviderKind::FinancialModelingPrep,
            fmp_quote_ttl: Duration::from_secs(60),           // 1 minute
            alpha_vantage_quote_ttl: Duration::from_secs(300), // 5 minutes, scarce quota
            search_ttl: Duration::from_secs(600),             // 10 minutes
            context_ttl: Duration::from_secs(86_400),         // 1 day
            request_timeout: Duration::from_secs(5),
            alpha_vantage_rate_limit: alpha_vantage::FREE_TIER_RATE_LIMIT,
            search_limit: 10,
            user_agent: HttpSettings::default().user_agent,
        }
    }
}

impl fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |key: &Option<String>| key.as_deref().map(|k| market_utils::mask_secret(k, 5));
        f.debug_struct("MarketDataConfig")
            .field("fmp_api_key", &masked(&self.fmp_api_key))
            .field("alpha_vantage_api_key", &masked(&self.alpha_vantage_api_key))
            .field("fmp_base_url", &self.fmp_base_url)
            .field("alpha_vantage_base_url", &self.alpha_vantage_base_url)
            .field("wikipedia_base_url", &self.wikipedia_base_url)
            .field("quote_priority", &self.quote_priority)
            .field("search_provider", &self.search_provider)
            .field("fmp_quote_ttl", &self.fmp_quote_ttl)
            .field("alpha_vantage_quote_ttl", &self.alpha_vantage_quote_ttl)
            .field("search_ttl", &self.search_ttl)
            .field("context_ttl", &self.context_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("alpha_vantage_rate_limit", &self.alpha_vantage_rate_limit)
            .field("search_limit", &self.search_limit)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl MarketDataConfig {
    /// Create a new configuration builder
    pub fn builder() -> MarketDataConfigBuilder {
        MarketDataConfigBuilder::default()
    }

    /// Defaults plus API keys and priority taken from the environment
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Cache TTL for quotes from the given provider
    pub fn quote_ttl(&self, provider: ProviderKind) -> Duration {
        match provider {
            ProviderKind::FinancialModelingPrep => self.fmp_quote_ttl,
            ProviderKind::AlphaVantage => self.alpha_vantage_quote_ttl,
            ProviderKind::Wikipedia => self.context_ttl,
        }
    }

    /// Transport settings shared by every client
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: self.request_timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.quote_priority.is_empty() {
            return Err(MarketDataError::InvalidConfig(
                "quote_priority must name at least one provider".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.quote_priority {
            if *provider == ProviderKind::Wikipedia {
                return Err(MarketDataError::InvalidConfig(
                    "wikipedia cannot provide quotes".to_string(),
                ));
            }
            if !seen.insert(provider) {
                return Err(MarketDataError::InvalidConfig(format!(
                    "{provider} appears more than once in quote_priority"
                )));
            }
        }

        if self.search_provider == ProviderKind::Wikipedia {
            return Err(MarketDataError::InvalidConfig(
                "wikipedia cannot provide symbol search".to_string(),
            ));
        }

        let durations = [
            ("fmp_quote_ttl", self.fmp_quote_ttl),
            ("alpha_vantage_quote_ttl", self.alpha_vantage_quote_ttl),
            ("search_ttl", self.search_ttl),
            ("context_ttl", self.context_ttl),
            ("request_timeout", self.request_timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(MarketDataError::InvalidConfig(format!(
                "{name} must be greater than 0"
            )));
        }

        if self.alpha_vantage_rate_limit == 0 {
            return Err(MarketDataError::InvalidConfig(
                "alpha_vantage_rate_limit must be greater than 0".to_string(),
            ));
        }

        for url in [&self.fmp_base_url, &self.alpha_vantage_base_url, &self.wikipedia_base_url] {
            let parsed = Url::parse(url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(MarketDataError::InvalidConfig(format!(
                    "base URL must be http(s): {url}"
                )));
            }
        }

        Ok(())
    }
}

/// Builder for MarketDataConfig
#[derive(Debug, Default)]
pub struct MarketDataConfigBuilder {
    fmp_api_key: Option<String>,
    alpha_vantage_api_key: Option<String>,
    fmp_base_url: Option<String>,
    alpha_vantage_base_url: Option<String>,
    wikipedia_base_url: Option<String>,
    quote_priority: Option<Vec<ProviderKind>>,
    env_priority: Option<Vec<String>>,
    search_provider: Option<ProviderKind>,
    fmp_quote_ttl: Option<Duration>,
    alpha_vantage_quote_ttl: Option<Duration>,
    search_ttl: Option<Duration>,
    context_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    alpha_vantage_rate_limit: Option<u32>,
    search_limit: Option<usize>,
    user_agent: Option<String>,
}

impl MarketDataConfigBuilder {
    /// Set Financial Modeling Prep API key
    pub fn fmp_api_key(mut self, key: impl Into<String>) -> Self {
        self.fmp_api_key = Some(key.into());
        self
    }

    /// Set Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    pub fn fmp_base_url(mut self, url: impl Into<String>) -> Self {
        self.fmp_base_url = Some(url.into());
        self
    }

    pub fn alpha_vantage_base_url(mut self, url: impl Into<String>) -> Self {
        self.alpha_vantage_base_url = Some(url.into());
        self
    }

    pub fn wikipedia_base_url(mut self, url: impl Into<String>) -> Self {
        self.wikipedia_base_url = Some(url.into());
        self
    }

    /// Set the quote fallback order
    pub fn quote_priority(mut self, providers: impl IntoIterator<Item = ProviderKind>) -> Self {
        self.quote_priority = Some(providers.into_iter().collect());
        self
    }

    /// Set the provider used for symbol search
    pub fn search_provider(mut self, provider: ProviderKind) -> Self {
        self.search_provider = Some(provider);
        self
    }

    /// Set cache TTL for quotes from one provider
    pub fn quote_ttl(mut self, provider: ProviderKind, ttl: Duration) -> Self {
        match provider {
            ProviderKind::FinancialModelingPrep => self.fmp_quote_ttl = Some(ttl),
            ProviderKind::AlphaVantage => self.alpha_vantage_quote_ttl = Some(ttl),
            ProviderKind::Wikipedia => self.context_ttl = Some(ttl),
        }
        self
    }

    /// Set cache TTL for search results
    pub fn search_ttl(mut self, ttl: Duration) -> Self {
        self.search_ttl = Some(ttl);
        self
    }

    /// Set cache TTL for company background
    pub fn context_ttl(mut self, ttl: Duration) -> Self {
        self.context_ttl = Some(ttl);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn alpha_vantage_rate_limit(mut self, per_minute: u32) -> Self {
        self.alpha_vantage_rate_limit = Some(per_minute);
        self
    }

    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = Some(limit);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Load API keys and quote priority from the environment
    ///
    /// Values set explicitly on the builder take precedence.
    pub fn with_env(mut self) -> Self {
        if self.fmp_api_key.is_none() {
            self.fmp_api_key = market_utils::env_var(ENV_FMP_API_KEY);
        }
        if self.alpha_vantage_api_key.is_none() {
            self.alpha_vantage_api_key = market_utils::env_var(ENV_ALPHA_VANTAGE_API_KEY);
        }
        self.env_priority = market_utils::env_list(ENV_PRIORITY);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MarketDataConfig> {
        let defaults = MarketDataConfig::default();

        let quote_priority = match (self.quote_priority, self.env_priority) {
            (Some(explicit), _) => explicit,
            (None, Some(names)) => parse_priority(&names)?,
            (None, None) => defaults.quote_priority,
        };

        let config = MarketDataConfig {
            fmp_api_key: self.fmp_api_key,
            alpha_vantage_api_key: self.alpha_vantage_api_key,
            fmp_base_url: self.fmp_base_url.unwrap_or(defaults.fmp_base_url),
            alpha_vantage_base_url: self
                .alpha_vantage_base_url
                .unwrap_or(defaults.alpha_vantage_base_url),
            wikipedia_base_url: self.wikipedia_base_url.unwrap_or(defaults.wikipedia_base_url),
            quote_priority,
            search_provider: self.search_provider.unwrap_or(defaults.search_provider),
            fmp_quote_ttl: self.fmp_quote_ttl.unwrap_or(defaults.fmp_quote_ttl),
            alpha_vantage_quote_ttl: self
                .alpha_vantage_quote_ttl
                .unwrap_or(defaults.alpha_vantage_quote_ttl),
            search_ttl: self.search_ttl.unwrap_or(defaults.search_ttl),
            context_ttl: self.context_ttl.unwrap_or(defaults.context_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            alpha_vantage_rate_limit: self
                .alpha_vantage_rate_limit
                .unwrap_or(defaults.alpha_vantage_rate_limit),
            search_limit: self.search_limit.unwrap_or(defaults.search_limit),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_priority(names: &[String]) -> Result<Vec<ProviderKind>> {
    names.iter().map(|name| name.parse()).collect()
}
