//! Financial Modeling Prep API client
//!
//! Quotes come from `/api/v3/quote/{symbol}`, whose `price` is the last
//! trade price; `change` and `changesPercentage` come from the same payload.
//! Search uses `/api/v3/search`. FMP reports problems such as a bad API key
//! as an object with an `"Error Message"` field inside a 200 response.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::MarketDataProvider;
use super::http::{self, HttpSettings};
use super::parse;
use crate::config::MarketDataConfig;
use crate::error::{ProviderError, ProviderResult, Result};
use crate::model::{ProviderKind, Quote, SearchCandidate};

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com";

const KIND: ProviderKind = ProviderKind::FinancialModelingPrep;

/// Financial Modeling Prep API client
#[derive(Debug, Clone)]
pub struct FmpClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    search_limit: usize,
}

impl FmpClient {
    /// Create a new client; a missing key makes every call a configuration error
    pub fn new(api_key: Option<String>, base_url: Url, settings: &HttpSettings) -> Self {
        Self {
            client: http::build_client(settings),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
            search_limit: 10,
        }
    }

    /// Build from the shared configuration
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        let base_url = Url::parse(&config.fmp_base_url)?;
        Ok(Self::new(config.fmp_api_key.clone(), base_url, &config.http_settings())
            .with_search_limit(config.search_limit))
    }

    /// Set the maximum number of search results requested
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::config(KIND, "FMP_API_KEY is not configured"))
    }

    async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        label: &str,
    ) -> ProviderResult<Value> {
        let api_key = self.api_key()?;
        let url = http::endpoint(KIND, &self.base_url, segments)?;
        let request = self
            .client
            .get(url)
            .query(query)
            .query(&[("apikey", api_key)]);
        http::get_json(KIND, request, label).await
    }
}

#[async_trait]
impl MarketDataProvider for FmpClient {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn fetch_quote(&self, symbol: &str) -> ProviderResult<Quote> {
        let label = format!("quote/{symbol}");
        let body = self.get(&["api", "v3", "quote", symbol], &[], &label).await?;
        parse_quote(symbol, &body)
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<SearchCandidate>> {
        let limit = self.search_limit.to_string();
        let body = self
            .get(
                &["api", "v3", "search"],
                &[("query", query), ("limit", limit.as_str())],
                "search",
            )
            .await?;
        parse_search(&body)
    }
}

/// Reject `{"Error Message": ...}` bodies
fn check_error(body: &Value, what: &str) -> ProviderResult<()> {
    match parse::error_message(body, &["Error Message", "error"]) {
        Some(message) if parse::mentions_api_key(message) => {
            Err(ProviderError::config(KIND, message.to_string()))
        },
        Some(message) if message.to_ascii_lowercase().contains("limit reach") => {
            Err(ProviderError::transient(KIND, message.to_string()))
        },
        Some(message) => Err(ProviderError::not_found(KIND, format!("{what}: {message}"))),
        None => Ok(()),
    }
}

fn parse_quote(symbol: &str, body: &Value) -> ProviderResult<Quote> {
    check_error(body, symbol)?;

    let items = body.as_array().ok_or_else(|| {
        ProviderError::malformed(KIND, format!("quote for {symbol}: expected a list"))
    })?;

    let item = items
        .first()
        .ok_or_else(|| ProviderError::not_found(KIND, format!("quote for {symbol}")))?;

    let price = parse::decimal(item.get("price")).ok_or_else(|| {
        ProviderError::malformed(KIND, format!("quote for {symbol}: unusable price"))
    })?;

    let ticker = parse::text(item.get("symbol")).unwrap_or_else(|| symbol.to_string());

    Ok(Quote::live(KIND, ticker, price)
        .with_company_name(parse::text(item.get("name")))
        .with_exchange(parse::text(item.get("exchange")))
        .with_currency(parse::text(item.get("currency")))
        .with_change(
            parse::decimal(item.get("change")),
            parse::decimal(item.get("changesPercentage")),
        ))
}

fn parse_search(body: &Value) -> ProviderResult<Vec<SearchCandidate>> {
    check_error(body, "search")?;

    let items = body
        .as_array()
        .ok_or_else(|| ProviderError::malformed(KIND, "search: expected a list"))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let symbol = parse::text(item.get("symbol"))?;
            Some(SearchCandidate {
                display_name: parse::text(item.get("name")).unwrap_or_else(|| symbol.clone()),
                exchange: parse::text(item.get("exchangeShortName"))
                    .or_else(|| parse::text(item.get("stockExchange"))),
                symbol,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;
    use crate::model::SourceTag;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn client_for(server: &MockServer, api_key: Option<&str>) -> FmpClient {
        let base = Url::parse(&server.base_url()).unwrap();
        FmpClient::new(api_key.map(str::to_string), base, &HttpSettings::default())
    }

    #[test]
    fn test_parse_quote() {
        let body = json!([{
            "symbol": "AAPL",
            "name": "Apple Inc.",
            "price": 189.84,
            "changesPercentage": 1.2345,
            "change": 2.31,
            "exchange": "NASDAQ",
            "timestamp": 1_700_000_000
        }]);

        let quote = parse_quote("AAPL", &body).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.company_name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.exchange.as_deref(), Some("NASDAQ"));
        assert_eq!(quote.price, Some(dec!(189.84)));
        assert_eq!(quote.change, Some(dec!(2.31)));
        assert_eq!(quote.percent_change, Some(dec!(1.2345)));
        assert_eq!(quote.source, SourceTag::Provider(ProviderKind::FinancialModelingPrep));
    }

    #[test]
    fn test_parse_quote_numeric_text() {
        let body = json!([{ "symbol": "MSFT", "price": "402.10", "change": "-1.5" }]);
        let quote = parse_quote("MSFT", &body).unwrap();
        assert_eq!(quote.price, Some(dec!(402.10)));
        assert_eq!(quote.change, Some(dec!(-1.5)));
        assert!(quote.percent_change.is_some());
    }

    #[test]
    fn test_parse_quote_with_extreme_numbers() {
        let body = json!([{
            "symbol": "AAPL",
            "price": "79228162514264337593543950335",
            "change": "-1"
        }]);
        let quote = parse_quote("AAPL", &body).unwrap();
        assert_eq!(quote.change, Some(dec!(-1)));
        assert_eq!(quote.percent_change, None);

        let body = json!([{
            "symbol": "AAPL",
            "price": "1",
            "change": "0.9999999999999999999999999999"
        }]);
        let quote = parse_quote("AAPL", &body).unwrap();
        assert_eq!(quote.price, Some(dec!(1)));
        assert_eq!(quote.percent_change, None);
    }

    #[test]
    fn test_parse_quote_failures() {
        let err = parse_quote("ZZZZ", &json!([])).unwrap_err();
        assert_eq!(err.class(), FailureClass::NotFound);

        let err = parse_quote("AAPL", &json!({
            "Error Message": "Invalid API KEY. Feel free to create a Free API Key."
        }))
        .unwrap_err();
        assert_eq!(err.class(), FailureClass::Config);

        let limit = json!({ "Error Message": "Limit Reach . Please upgrade your plan" });
        let err = parse_quote("AAPL", &limit).unwrap_err();
        assert_eq!(err.class(), FailureClass::Transient);

        let invalid = json!({ "Error Message": "Invalid parameters" });
        let err = parse_quote("AAPL", &invalid).unwrap_err();
        assert_eq!(err.class(), FailureClass::NotFound);

        let err = parse_quote("AAPL", &json!([{ "symbol": "AAPL", "price": "n/a" }])).unwrap_err();
        assert_eq!(err.class(), FailureClass::Malformed);

        let err = parse_quote("AAPL", &json!("unexpected")).unwrap_err();
        assert_eq!(err.class(), FailureClass::Malformed);
    }

    #[test]
    fn test_parse_search_keeps_provider_order() {
        let body = json!([
            { "symbol": "AAPL", "name": "Apple Inc.", "exchangeShortName": "NASDAQ" },
            { "name": "no symbol, skipped" },
            {
                "symbol": "APLE",
                "name": "Apple Hospitality REIT",
                "stockExchange": "New York Stock Exchange"
            }
        ]);

        let candidates = parse_search(&body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].symbol, "AAPL");
        assert_eq!(candidates[0].exchange.as_deref(), Some("NASDAQ"));
        assert_eq!(candidates[1].symbol, "APLE");
        assert_eq!(candidates[1].exchange.as_deref(), Some("New York Stock Exchange"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error_without_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.path("/api/v3/quote/AAPL");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = client_for(&server, None);
        let err = client.fetch_quote("AAPL").await.unwrap_err();

        assert!(err.is_config());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_fetch_quote_over_http() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v3/quote/NVDA")
                    .query_param("apikey", "test_key");
                then.status(200).json_body(json!([{
                    "symbol": "NVDA",
                    "name": "NVIDIA Corporation",
                    "price": 875.28,
                    "change": 12.5,
                    "changesPercentage": 1.45,
                    "exchange": "NASDAQ"
                }]));
            })
            .await;

        let client = client_for(&server, Some("test_key"));
        let quote = tokio_test::assert_ok!(client.fetch_quote("NVDA").await);

        assert_eq!(quote.price, Some(dec!(875.28)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_status_classification() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/api/v3/quote/AAPL");
                then.status(429);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.path("/api/v3/quote/MSFT");
                then.status(401);
            })
            .await;

        let client = client_for(&server, Some("test_key"));
        let err = client.fetch_quote("AAPL").await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Transient);

        let err = client.fetch_quote("MSFT").await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Config);
    }

    #[tokio::test]
    #[ignore] // Requires FMP_API_KEY and network access
    async fn test_live_quote() {
        let client = FmpClient::new(
            std::env::var("FMP_API_KEY").ok(),
            Url::parse(DEFAULT_BASE_URL).unwrap(),
            &HttpSettings::default(),
        );
        let quote = client.fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert!(quote.price.is_some());
    }
}
