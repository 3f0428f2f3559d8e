//! Manifest run orchestration: one coordinating task per run, per-item
//! work fanned out to a bounded worker pool, and a single join point
//! before aggregation.

pub mod aggregator;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::analysis::{AnalysisEngine, Assessment};
use crate::config::PipelineConfig;
use crate::errors::ServiceError;
use crate::ingest::{parse_manifest, ColumnMapping, Item, RawManifest, SkippedRow};
use crate::marketplace::{MarketplaceEnricher, MarketplaceResults};

pub use aggregator::{ChartData, ChartSeries, ManifestSummary};

/// One item after assessment and enrichment both reached a terminal state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzedItem {
    #[serde(flatten)]
    pub item: Item,
    pub assessment: Assessment,
    pub marketplace: MarketplaceResults,
    /// `estimated_sale_price - msrp`
    pub profit: Decimal,
}

/// Output of one manifest run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub mapping: ColumnMapping,
    pub items: Vec<AnalyzedItem>,
    pub skipped: Vec<SkippedRow>,
    pub summary: ManifestSummary,
    pub charts: ChartData,
    /// True when the run deadline expired before every item finished;
    /// the output covers the finished subset only
    pub partial: bool,
}

/// SHA-256 of the raw CSV content, used to answer resubmitted files from
/// the stored analysis.
pub fn file_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// The manifest analysis pipeline. Cheap to clone via `Arc`s; one instance
/// is shared across all HTTP workers.
pub struct Pipeline {
    engine: Arc<AnalysisEngine>,
    enricher: Arc<MarketplaceEnricher>,
    max_concurrency: usize,
    run_deadline: Duration,
    purchase_cost_fraction: Decimal,
}

impl Pipeline {
    pub fn new(
        engine: AnalysisEngine,
        enricher: MarketplaceEnricher,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            enricher: Arc::new(enricher),
            max_concurrency: config.max_concurrency.max(1),
            run_deadline: config.run_deadline(),
            purchase_cost_fraction: config.purchase_cost_fraction(),
        }
    }

    /// Number of marketplaces the enricher will query per item.
    pub fn marketplace_count(&self) -> usize {
        self.enricher.marketplace_count()
    }

    /// Runs the whole pipeline for one manifest: parse, fan out per-item
    /// assessment and enrichment, join, aggregate.
    ///
    /// Only `UnrecognizedFormat` and an unreadable payload fail the run;
    /// per-item and per-marketplace trouble degrades item by item, and a
    /// blown run deadline returns the finished subset flagged partial.
    pub async fn run(&self, raw: &RawManifest) -> Result<RunOutput, ServiceError> {
        let (mapping, normalized) = parse_manifest(raw)?;
        let (items, partial) = self.enrich_all(normalized.items).await;

        if partial {
            warn!(
                filename = %raw.filename,
                finished = items.len(),
                "run deadline exceeded; returning partial result"
            );
        }

        let summary = aggregator::summarize(&items, self.purchase_cost_fraction);
        let charts = aggregator::charts(&items);

        info!(
            filename = %raw.filename,
            total_items = summary.total_items,
            total_msrp = %summary.total_msrp,
            projected_revenue = %summary.projected_revenue,
            partial,
            "manifest run completed"
        );

        Ok(RunOutput {
            mapping,
            items,
            skipped: normalized.skipped,
            summary,
            charts,
            partial,
        })
    }

    /// Fans per-item work out to the bounded worker pool and joins. Each
    /// worker writes its result into the accumulator exactly once; on
    /// deadline expiry the remaining workers are abandoned.
    async fn enrich_all(&self, items: Vec<Item>) -> (Vec<AnalyzedItem>, bool) {
        let total = items.len();
        let accumulator: Arc<DashMap<usize, AnalyzedItem>> = Arc::new(DashMap::new());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut workers = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let engine = self.engine.clone();
            let enricher = self.enricher.clone();
            let accumulator = accumulator.clone();
            let semaphore = semaphore.clone();

            workers.spawn(async move {
                // Closing the semaphore only happens on deadline expiry;
                // an error here means the worker should stand down.
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };

                let (assessment, marketplace) =
                    tokio::join!(engine.assess(&item), enricher.enrich(&item));

                let profit = assessment.estimated_sale_price - item.msrp;
                accumulator.insert(
                    index,
                    AnalyzedItem {
                        item,
                        assessment,
                        marketplace,
                        profit,
                    },
                );
            });
        }

        let joined = tokio::time::timeout(self.run_deadline, async {
            while workers.join_next().await.is_some() {}
        })
        .await;

        let partial = joined.is_err();
        if partial {
            semaphore.close();
            workers.abort_all();
            // Drain aborted handles so nothing keeps writing afterwards.
            while workers.join_next().await.is_some() {}
        }

        let mut finished: Vec<(usize, AnalyzedItem)> = accumulator
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        finished.sort_by_key(|(index, _)| *index);

        let items: Vec<AnalyzedItem> = finished.into_iter().map(|(_, item)| item).collect();
        let missing = items.len() < total;
        (items, partial && missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketplaceConfig;
    use crate::marketplace::{MarketplaceClient, MarketplaceError, MarketplaceResult};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn pipeline_config(deadline_secs: u64) -> PipelineConfig {
        PipelineConfig {
            max_concurrency: 4,
            run_deadline_secs: deadline_secs,
            ..PipelineConfig::default()
        }
    }

    fn heuristic_pipeline() -> Pipeline {
        Pipeline::new(
            AnalysisEngine::heuristic_only(),
            MarketplaceEnricher::from_config(&MarketplaceConfig::default()),
            &pipeline_config(30),
        )
    }

    #[tokio::test]
    async fn runs_the_whole_pipeline_over_a_csv() {
        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price,Extended Sell\n\
                      100,Air Compressor 20 Gal,1,\"$1,277.61\",\"$1,277.61\"\n\
                      101,Hydraulic Pump,1,$3215.93,$3215.93\n\
                      102,Axial Fan,1,$221.14,$221.14\n"
                .to_string(),
            filename: "pallet.csv".to_string(),
        };

        let output = heuristic_pipeline().run(&raw).await.unwrap();
        assert!(!output.partial);
        assert_eq!(output.items.len(), 3);
        assert_eq!(output.summary.total_msrp, dec!(4714.68));

        let expected_revenue: Decimal = output
            .items
            .iter()
            .map(|i| i.assessment.estimated_sale_price)
            .sum();
        assert_eq!(output.summary.projected_revenue, expected_revenue);
    }

    #[tokio::test]
    async fn unrecognized_format_fails_the_run() {
        let raw = RawManifest {
            content: "q,r\n1.5,2.5\n".to_string(),
            filename: "bad.csv".to_string(),
        };
        let err = heuristic_pipeline().run(&raw).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnrecognizedFormat(_)));
    }

    struct HangingMarketplace;

    #[async_trait]
    impl MarketplaceClient for HangingMarketplace {
        fn name(&self) -> &str {
            "tarpit"
        }

        async fn lookup(&self, _item: &Item) -> Result<MarketplaceResult, MarketplaceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(MarketplaceResult::unavailable())
        }
    }

    #[tokio::test]
    async fn blown_deadline_degrades_to_partial_result() {
        // Per-lookup timeout far beyond the run deadline, so the deadline
        // is what fires.
        let enricher = MarketplaceEnricher::new(
            vec![Arc::new(HangingMarketplace)],
            Duration::from_secs(3600),
        );
        let pipeline = Pipeline::new(
            AnalysisEngine::heuristic_only(),
            enricher,
            &PipelineConfig {
                max_concurrency: 2,
                run_deadline_secs: 0,
                ..PipelineConfig::default()
            },
        );

        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price\n\
                      1,Air Compressor,1,$100\n"
                .to_string(),
            filename: "slow.csv".to_string(),
        };

        let output = pipeline.run(&raw).await.unwrap();
        assert!(output.partial);
        assert!(output.items.is_empty());
    }

    #[tokio::test]
    async fn deadline_with_nothing_unfinished_is_not_partial() {
        // A zero deadline over a header-only manifest leaves no item behind,
        // so the output must not be flagged partial.
        let pipeline = Pipeline::new(
            AnalysisEngine::heuristic_only(),
            MarketplaceEnricher::from_config(&MarketplaceConfig::default()),
            &PipelineConfig {
                run_deadline_secs: 0,
                ..PipelineConfig::default()
            },
        );
        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price\n".to_string(),
            filename: "empty.csv".to_string(),
        };

        let output = pipeline.run(&raw).await.unwrap();
        assert!(!output.partial);
        assert!(output.items.is_empty());
    }

    #[tokio::test]
    async fn accumulator_receives_one_entry_per_item() {
        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price\n\
                      1,Drill,2,$50\n\
                      2,Saw,1,$80\n\
                      3,Grinder,3,$120\n\
                      4,Sander,1,$40\n\
                      5,Router,1,$90\n"
                .to_string(),
            filename: "tools.csv".to_string(),
        };

        let output = heuristic_pipeline().run(&raw).await.unwrap();
        assert_eq!(output.items.len(), 5);
        // Completion order is unconstrained but output order follows input.
        let numbers: Vec<&str> = output
            .items
            .iter()
            .map(|i| i.item.item_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn file_hash_is_stable_sha256() {
        let a = file_hash("Item,Price\nWidget,1\n");
        let b = file_hash("Item,Price\nWidget,1\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, file_hash("Item,Price\nWidget,2\n"));
    }

    #[tokio::test]
    async fn heuristic_run_is_deterministic() {
        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price\n\
                      1,Air Compressor,1,$1000\n\
                      2,Storage Cabinet,2,$400\n"
                .to_string(),
            filename: "repeat.csv".to_string(),
        };

        let pipeline = heuristic_pipeline();
        let first = pipeline.run(&raw).await.unwrap();
        let second = pipeline.run(&raw).await.unwrap();
        assert_eq!(first.items, second.items);
        assert_eq!(first.summary, second.summary);
    }
}
