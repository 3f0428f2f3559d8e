//! eBay Browse API lookup, normalized to `{available, price}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::MarketplaceConfig;
use crate::ingest::Item;
use crate::marketplace::{MarketplaceClient, MarketplaceError, MarketplaceResult};

/// Search terms are truncated to keep query strings bounded.
const MAX_QUERY_LEN: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    price: Option<Price>,
    item_web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Price {
    value: Option<String>,
}

pub struct EbayClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl EbayClient {
    /// Builds the client when an access token is configured; `None`
    /// disables eBay lookups entirely.
    pub fn from_config(config: &MarketplaceConfig) -> Option<Self> {
        let access_token = config.ebay_access_token.clone()?;
        Some(Self::new(config.ebay_base_url.clone(), access_token))
    }

    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl MarketplaceClient for EbayClient {
    fn name(&self) -> &str {
        "ebay"
    }

    async fn lookup(&self, item: &Item) -> Result<MarketplaceResult, MarketplaceError> {
        let query: String = item.title.chars().take(MAX_QUERY_LEN).collect();
        let url = format!("{}/item_summary/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("limit", "1"), ("sort", "price")])
            .bearer_auth(&self.access_token)
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

        let Some(summary) = body.item_summaries.into_iter().next() else {
            return Ok(MarketplaceResult::unavailable());
        };

        match summary
            .price
            .and_then(|p| p.value)
            .and_then(|v| v.parse().ok())
        {
            Some(price) => Ok(MarketplaceResult::listed(price, summary.item_web_url)),
            // A listing without a parseable price is useless for margin math.
            None => Ok(MarketplaceResult::unavailable()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ItemFlags;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{bearer_token, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(title: &str) -> Item {
        Item {
            item_number: "E-1".to_string(),
            title: title.to_string(),
            msrp: dec!(500),
            quantity: 1,
            pallet: None,
            notes: None,
            flags: ItemFlags::default(),
        }
    }

    #[tokio::test]
    async fn parses_listed_item_with_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item_summary/search"))
            .and(query_param("q", "Air Compressor"))
            .and(bearer_token("token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "itemSummaries": [{
                    "price": {"value": "312.50", "currency": "USD"},
                    "itemWebUrl": "https://ebay.example/item/1"
                }]
            })))
            .mount(&server)
            .await;

        let client = EbayClient::new(server.uri(), "token-123");
        let result = client.lookup(&item("Air Compressor")).await.unwrap();
        assert!(result.available);
        assert_eq!(result.price, Some(dec!(312.50)));
        assert_eq!(result.url.as_deref(), Some("https://ebay.example/item/1"));
    }

    #[tokio::test]
    async fn empty_search_results_mean_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = EbayClient::new(server.uri(), "t");
        let result = client.lookup(&item("Obscure Widget")).await.unwrap();
        assert_eq!(result, MarketplaceResult::unavailable());
    }

    #[tokio::test]
    async fn http_error_is_reported_as_such() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = EbayClient::new(server.uri(), "t");
        let err = client.lookup(&item("Anything")).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Http(500)));
    }
}
