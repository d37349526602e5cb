//! Canonical, provider-agnostic data shapes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketDataError;

/// Upstream data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Financial Modeling Prep (quotes, search)
    #[serde(rename = "fmp")]
    FinancialModelingPrep,
    /// Alpha Vantage (quotes, search)
    AlphaVantage,
    /// Wikipedia page summaries (company background)
    Wikipedia,
}

impl ProviderKind {
    /// Stable identifier used in logs, cache keys and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinancialModelingPrep => "fmp",
            Self::AlphaVantage => "alpha_vantage",
            Self::Wikipedia => "wikipedia",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fmp" | "financial_modeling_prep" | "financialmodelingprep" => {
                Ok(Self::FinancialModelingPrep)
            },
            "alpha_vantage" | "alphavantage" | "av" => Ok(Self::AlphaVantage),
            "wikipedia" | "wiki" => Ok(Self::Wikipedia),
            other => Err(MarketDataError::UnknownProvider(other.to_string())),
        }
    }
}

/// Where a [`Quote`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Live data from an upstream provider
    Provider(ProviderKind),
    /// Static demo record used when every live provider failed
    Demo,
    /// Nothing could be retrieved; numeric fields are unset
    Unavailable,
}

impl SourceTag {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(kind) => f.write_str(kind.as_str()),
            Self::Demo => f.write_str("demo"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Canonical price record handed to the presentation layer
///
/// `price` is always set unless `source` is [`SourceTag::Unavailable`].
/// `change` and `percent_change` are taken from the same provider payload as
/// `price`; values from different providers are never combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Uppercase ticker
    pub symbol: String,
    pub company_name: Option<String>,
    pub exchange: Option<String>,
    pub price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percent_change: Option<Decimal>,
    pub currency: Option<String>,
    pub retrieved_at: DateTime<Utc>,
    pub source: SourceTag,
}

impl Quote {
    /// Quote produced by a live provider; the price is mandatory
    pub fn live(provider: ProviderKind, symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            company_name: None,
            exchange: None,
            price: Some(price),
            change: None,
            percent_change: None,
            currency: None,
            retrieved_at: Utc::now(),
            source: SourceTag::Provider(provider),
        }
    }

    /// Sentinel returned when neither providers nor the demo table have data
    pub fn unavailable(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: None,
            exchange: None,
            price: None,
            change: None,
            percent_change: None,
            currency: None,
            retrieved_at: Utc::now(),
            source: SourceTag::Unavailable,
        }
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_exchange(mut self, exchange: Option<String>) -> Self {
        self.exchange = exchange.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency.filter(|c| !c.trim().is_empty());
        self
    }

    /// Set the day change and its percentage from one provider payload
    ///
    /// When the payload carries a change but no percentage, the percentage is
    /// derived from the change relative to the previous close
    /// (`price - change`). Payloads whose arithmetic would overflow leave the
    /// percentage unset.
    pub fn with_change(mut self, change: Option<Decimal>, percent_change: Option<Decimal>) -> Self {
        self.change = change;
        self.percent_change = percent_change.or_else(|| {
            let price = self.price?;
            let change = change?;
            let previous = price.checked_sub(change)?;
            if previous.is_zero() {
                return None;
            }
            change
                .checked_div(previous)?
                .checked_mul(Decimal::ONE_HUNDRED)
                .map(|percent| percent.round_dp(4))
        });
        self
    }

    pub fn is_available(&self) -> bool {
        self.source != SourceTag::Unavailable
    }
}

/// A candidate ticker for a free-text company name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub symbol: String,
    pub display_name: String,
    pub exchange: Option<String>,
}

/// Short prose background about a company
///
/// `subject_name` follows the background provider's naming (e.g. a page
/// title), which need not match the ticker used for quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub subject_name: String,
    pub text: String,
    pub retrieved_at: DateTime<Utc>,
    pub source_url: Option<String>,
}
