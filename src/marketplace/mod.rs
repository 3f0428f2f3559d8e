//! Marketplace enrichment: concurrent availability/price lookups against
//! independent marketplace backends, with partial-failure tolerance. A
//! marketplace that times out or errors reports `unavailable`; it never
//! fails the item or the manifest.

pub mod amazon;
pub mod ebay;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::config::MarketplaceConfig;
use crate::ingest::Item;

pub use amazon::AmazonClient;
pub use ebay::EbayClient;

/// One marketplace's report for one item. Absence of a listing is a valid
/// terminal state, not an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketplaceResult {
    pub available: bool,
    /// Present iff `available`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Listing URL when the marketplace returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MarketplaceResult {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            price: None,
            url: None,
        }
    }

    pub fn listed(price: Decimal, url: Option<String>) -> Self {
        Self {
            available: true,
            price: Some(price),
            url,
        }
    }
}

/// Map of marketplace name to its result. `BTreeMap` keeps the merge
/// commutative and associative regardless of response ordering.
pub type MarketplaceResults = BTreeMap<String, MarketplaceResult>;

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("marketplace request failed: {0}")]
    Transport(String),

    #[error("marketplace returned HTTP {0}")]
    Http(u16),

    #[error("marketplace response malformed: {0}")]
    Malformed(String),
}

/// One marketplace lookup backend. Implementations perform a single
/// attempt; the enricher owns the timeout and failure mapping.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, item: &Item) -> Result<MarketplaceResult, MarketplaceError>;
}

/// Fans one item's lookups out across every configured marketplace
/// concurrently and merges the results by marketplace name.
pub struct MarketplaceEnricher {
    clients: Vec<Arc<dyn MarketplaceClient>>,
    lookup_timeout: Duration,
}

impl MarketplaceEnricher {
    pub fn new(clients: Vec<Arc<dyn MarketplaceClient>>, lookup_timeout: Duration) -> Self {
        Self {
            clients,
            lookup_timeout,
        }
    }

    /// Builds the enricher from configuration. Marketplaces without
    /// credentials are left out entirely; an empty client list is valid
    /// and produces empty results.
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        let mut clients: Vec<Arc<dyn MarketplaceClient>> = Vec::new();
        if let Some(client) = AmazonClient::from_config(config) {
            clients.push(Arc::new(client));
        }
        if let Some(client) = EbayClient::from_config(config) {
            clients.push(Arc::new(client));
        }
        Self::new(clients, config.timeout())
    }

    pub fn marketplace_count(&self) -> usize {
        self.clients.len()
    }

    /// Queries every marketplace for one item concurrently. Timeouts and
    /// errors degrade to `unavailable` for that marketplace only.
    pub async fn enrich(&self, item: &Item) -> MarketplaceResults {
        let lookups = self.clients.iter().map(|client| {
            let client = client.clone();
            async move {
                let name = client.name().to_string();
                let result = match timeout(self.lookup_timeout, client.lookup(item)).await {
                    Ok(Ok(result)) => {
                        debug!(
                            marketplace = %name,
                            item_number = %item.item_number,
                            available = result.available,
                            "marketplace lookup completed"
                        );
                        result
                    }
                    Ok(Err(err)) => {
                        warn!(
                            marketplace = %name,
                            item_number = %item.item_number,
                            error = %err,
                            "marketplace lookup failed"
                        );
                        MarketplaceResult::unavailable()
                    }
                    Err(_) => {
                        warn!(
                            marketplace = %name,
                            item_number = %item.item_number,
                            timeout = ?self.lookup_timeout,
                            "marketplace lookup timed out"
                        );
                        MarketplaceResult::unavailable()
                    }
                };
                (name, result)
            }
        });

        join_all(lookups).await.into_iter().collect()
    }
}
