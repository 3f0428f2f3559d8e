//! Deterministic fallback assessment. Pure function of the item's
//! attributes: the same item always yields the same assessment, which keeps
//! the pipeline testable and bounds cost when the AI backend is degraded or
//! disabled.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::analysis::{Assessment, AssessmentSource, Demand};
use crate::ingest::Item;

/// One keyword tier of the liquidation market model: matching items sell at
/// `fraction` of MSRP with the given demand and time-to-sell.
struct CategoryTier {
    keywords: &'static [&'static str],
    fraction: Decimal,
    demand: Demand,
    sales_time: &'static str,
}

/// Tiers are checked in order; the first keyword hit wins.
fn tiers() -> [CategoryTier; 6] {
    [
        CategoryTier {
            keywords: &["compressor", "vacuum", "pressure washer", "generator"],
            fraction: dec!(0.35),
            demand: Demand::High,
            sales_time: "2-4 weeks",
        },
        CategoryTier {
            keywords: &["tool", "drill", "saw", "grinder"],
            fraction: dec!(0.40),
            demand: Demand::High,
            sales_time: "1-2 weeks",
        },
        CategoryTier {
            keywords: &["motor", "pump", "fan", "blower"],
            fraction: dec!(0.32),
            demand: Demand::Medium,
            sales_time: "1-3 months",
        },
        CategoryTier {
            keywords: &["heater", "cooler", "air", "ventilation"],
            fraction: dec!(0.28),
            demand: Demand::Medium,
            sales_time: "2-4 months",
        },
        CategoryTier {
            keywords: &["cabinet", "storage", "enclosure", "box"],
            fraction: dec!(0.25),
            demand: Demand::Low,
            sales_time: "3-6 months",
        },
        CategoryTier {
            keywords: &["tank", "drum", "container", "barrel"],
            fraction: dec!(0.20),
            demand: Demand::Low,
            sales_time: "4-8 months",
        },
    ]
}

/// Liquidation sale prices stay within this band of MSRP.
const MIN_FRACTION: Decimal = dec!(0.15);
const MAX_FRACTION: Decimal = dec!(0.50);
const DEFAULT_FRACTION: Decimal = dec!(0.30);

/// Produces the deterministic heuristic assessment for an item.
pub fn assess(item: &Item) -> Assessment {
    let title = item.title.to_lowercase();

    let (fraction, demand, sales_time) = tiers()
        .iter()
        .find(|tier| tier.keywords.iter().any(|k| title.contains(k)))
        .map(|tier| (tier.fraction, tier.demand, tier.sales_time.to_string()))
        .unwrap_or((DEFAULT_FRACTION, Demand::Medium, "2-3 months".to_string()));

    let fraction = fraction.clamp(MIN_FRACTION, MAX_FRACTION);
    let estimated_sale_price = (item.msrp * fraction).round_dp(2).max(Decimal::ZERO);

    let reasoning = format!(
        "Liquidation pricing: {}% of MSRP with {} demand",
        (fraction * dec!(100)).round_dp(0),
        demand.to_string().to_lowercase()
    );

    Assessment {
        demand,
        estimated_sale_price,
        sales_time,
        reasoning,
        source: AssessmentSource::Heuristic,
    }
}
