//! Amazon product lookup, normalized to `{available, price}`.
//!
//! Talks to a product search endpoint keyed by item title and takes the
//! first (cheapest-ranked) hit. The wire shape is normalized here so the
//! enricher only ever sees `MarketplaceResult`.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Deserialize;

use crate::config::MarketplaceConfig;
use crate::ingest::Item;
use crate::marketplace::{MarketplaceClient, MarketplaceError, MarketplaceResult};

const MAX_QUERY_LEN: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    price: Option<f64>,
    detail_page_url: Option<String>,
}

pub struct AmazonClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AmazonClient {
    /// Builds the client when an API key is configured; `None` disables
    /// Amazon lookups entirely.
    pub fn from_config(config: &MarketplaceConfig) -> Option<Self> {
        let api_key = config.amazon_api_key.clone()?;
        Some(Self::new(config.amazon_base_url.clone(), api_key))
    }

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MarketplaceClient for AmazonClient {
    fn name(&self) -> &str {
        "amazon"
    }

    async fn lookup(&self, item: &Item) -> Result<MarketplaceResult, MarketplaceError> {
        let keywords: String = item.title.chars().take(MAX_QUERY_LEN).collect();
        let url = format!("{}/items/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("keywords", keywords.as_str()), ("limit", "1")])
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| MarketplaceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketplaceError::Http(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketplaceError::Malformed(e.to_string()))?;

        let Some(hit) = body.items.into_iter().next() else {
            return Ok(MarketplaceResult::unavailable());
        };

        match hit.price.and_then(Decimal::from_f64) {
            Some(price) if price > Decimal::ZERO => {
                Ok(MarketplaceResult::listed(price.round_dp(2), hit.detail_page_url))
            }
            _ => Ok(MarketplaceResult::unavailable()),
        }
    }
}
