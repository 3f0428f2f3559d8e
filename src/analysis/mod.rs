//! Per-item resale assessment: an AI path with bounded retries and a
//! deterministic heuristic fallback, both producing the same shape so
//! downstream code is path-agnostic.

pub mod ai;
pub mod heuristics;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::sleep;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::AiConfig;
use crate::ingest::Item;

pub use ai::{AiBackend, AiError, ChatCompletionsBackend};

/// Market demand tier for an item.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Demand {
    High,
    Medium,
    Low,
}

/// Which path produced an assessment. A visible outcome, not implicit
/// control flow: callers can always tell fallback results apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Ai,
    Heuristic,
}

/// Resale assessment attached to exactly one item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assessment {
    pub demand: Demand,
    pub estimated_sale_price: Decimal,
    pub sales_time: String,
    pub reasoning: String,
    pub source: AssessmentSource,
}

/// Produces exactly one assessment per item. The AI path is attempted when
/// a backend is configured; after the retry budget is exhausted the
/// heuristic path takes over. The sanity clamp applies to both paths.
pub struct AnalysisEngine {
    backend: Option<Arc<dyn AiBackend>>,
    max_retries: u32,
    retry_base: Duration,
    retry_cap: Duration,
}

impl AnalysisEngine {
    pub fn new(backend: Option<Arc<dyn AiBackend>>, config: &AiConfig) -> Self {
        Self {
            backend,
            max_retries: config.max_retries,
            retry_base: config.retry_base(),
            retry_cap: config.retry_cap(),
        }
    }

    /// Engine with no AI backend; every item takes the heuristic path.
    pub fn heuristic_only() -> Self {
        Self {
            backend: None,
            max_retries: 0,
            retry_base: Duration::from_millis(0),
            retry_cap: Duration::from_millis(0),
        }
    }

    /// Produces the assessment for one item. Never fails: degraded AI
    /// behavior ends in the deterministic fallback, and every outcome is
    /// recorded for observability.
    pub async fn assess(&self, item: &Item) -> Assessment {
        if let Some(backend) = &self.backend {
            match self.try_ai(backend.as_ref(), item).await {
                Some(ai) => {
                    info!(item_number = %item.item_number, "AI assessment succeeded");
                    return clamp_to_msrp(
                        Assessment {
                            demand: ai.demand,
                            estimated_sale_price: ai.estimated_sale_price,
                            sales_time: ai.sales_time,
                            reasoning: ai.reasoning,
                            source: AssessmentSource::Ai,
                        },
                        item.msrp,
                    );
                }
                None => {
                    warn!(
                        item_number = %item.item_number,
                        "AI assessment exhausted retries; using heuristic fallback"
                    );
                }
            }
        }

        clamp_to_msrp(heuristics::assess(item), item.msrp)
    }

    /// Runs the AI call with exponential backoff. `None` means every
    /// attempt failed.
    async fn try_ai(&self, backend: &dyn AiBackend, item: &Item) -> Option<ai::AiAssessment> {
        let mut delay = self.retry_base;

        for attempt in 0..=self.max_retries {
            match backend.assess(item).await {
                Ok(assessment) => return Some(assessment),
                Err(err) => {
                    if attempt == self.max_retries {
                        warn!(
                            item_number = %item.item_number,
                            attempts = attempt + 1,
                            error = %err,
                            "AI assessment failed"
                        );
                        return None;
                    }
                    warn!(
                        item_number = %item.item_number,
                        attempt = attempt + 1,
                        error = %err,
                        retry_in = ?delay,
                        "AI assessment attempt failed; retrying"
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(self.retry_cap);
                }
            }
        }

        None
    }
}

/// Sanity clamp: when MSRP is a reliable ceiling (`msrp > 0`), the
/// estimated sale price is forced into `[0, msrp]` so implausible AI output
/// cannot propagate into the financial summary.
pub fn clamp_to_msrp(mut assessment: Assessment, msrp: Decimal) -> Assessment {
    if assessment.estimated_sale_price < Decimal::ZERO {
        assessment.estimated_sale_price = Decimal::ZERO;
    }
    if msrp > Decimal::ZERO && assessment.estimated_sale_price > msrp {
        assessment.estimated_sale_price = msrp;
    }
    assessment
}
