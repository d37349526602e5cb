//! Wikipedia page-summary client used for company background

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::MarketDataProvider;
use super::http::{self, HttpSettings};
use super::parse;
use crate::config::MarketDataConfig;
use crate::error::{ProviderError, ProviderResult, Result};
use crate::model::{ContextSummary, ProviderKind};

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

const KIND: ProviderKind = ProviderKind::Wikipedia;

/// Wikipedia REST client; needs no credentials
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: Client,
    base_url: Url,
}

impl WikipediaClient {
    pub fn new(base_url: Url, settings: &HttpSettings) -> Self {
        Self {
            client: http::build_client(settings),
            base_url,
        }
    }

    /// Build from the shared configuration
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        let base_url = Url::parse(&config.wikipedia_base_url)?;
        Ok(Self::new(base_url, &config.http_settings()))
    }
}

#[async_trait]
impl MarketDataProvider for WikipediaClient {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn fetch_context(&self, subject: &str) -> ProviderResult<ContextSummary> {
        let title = page_title(subject);
        let url = http::endpoint(
            KIND,
            &self.base_url,
            &["api", "rest_v1", "page", "summary", title.as_str()],
        )?;
        let body = http::get_json(KIND, self.client.get(url), &format!("summary/{title}")).await?;
        parse_summary(subject, &body)
    }
}

/// Page titles use underscores instead of spaces
fn page_title(subject: &str) -> String {
    subject.split_whitespace().collect::<Vec<_>>().join("_")
}

fn parse_summary(subject: &str, body: &Value) -> ProviderResult<ContextSummary> {
    let page_type = parse::text(body.get("type"));
    if page_type.as_deref() == Some("disambiguation") {
        return Err(ProviderError::not_found(
            KIND,
            format!("{subject}: ambiguous page title"),
        ));
    }
    if page_type.as_deref().is_some_and(|t| t.contains("not_found")) {
        return Err(ProviderError::not_found(KIND, subject.to_string()));
    }

    let text = parse::text(body.get("extract")).ok_or_else(|| {
        ProviderError::malformed(KIND, format!("{subject}: summary has no extract"))
    })?;

    Ok(ContextSummary {
        subject_name: parse::text(body.get("title")).unwrap_or_else(|| subject.trim().to_string()),
        text,
        retrieved_at: Utc::now(),
        source_url: parse::text(body.pointer("/content_urls/desktop/page")),
    })
}
