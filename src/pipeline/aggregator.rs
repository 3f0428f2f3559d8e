//! Manifest-level aggregation: a pure function over the completed item
//! set. No network calls happen here; recommendations come from threshold
//! rules so aggregation stays deterministic and fast.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analysis::Demand;
use crate::pipeline::AnalyzedItem;

static SALES_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:-\s*(\d+)\s*)?(week|month)s?").unwrap());

/// Keyword buckets for the category breakdown chart. First hit wins;
/// anything unmatched lands in "Other".
const CATEGORY_BUCKETS: &[(&str, &[&str])] = &[
    ("Air Tools", &["compressor", "vacuum", "pressure"]),
    ("Motors & Pumps", &["motor", "pump", "fan"]),
    ("Storage & Enclosures", &["cabinet", "storage", "enclosure"]),
    ("Lifting Equipment", &["jack", "lift", "crane"]),
];

const OTHER_CATEGORY: &str = "Other";

/// Manifest-level financial summary. Derived and recomputed on every run,
/// never persisted apart from its item set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ManifestSummary {
    pub total_items: i32,
    pub total_msrp: Decimal,
    pub projected_revenue: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
    /// Average time-to-sell rendered in weeks, "N/A" when no item carries
    /// a parseable sales time
    pub avg_sales_time: String,
    pub recommendations: Vec<String>,
}

/// One labeled numeric series for chart rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<Decimal>,
}

/// Pre-bucketed chart payload returned alongside the summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartData {
    /// Cumulative projected revenue across a 12-month horizon
    pub revenue_timeline: ChartSeries,
    /// Item counts per category keyword bucket
    pub category_breakdown: ChartSeries,
    /// Item counts per demand tier
    pub demand_breakdown: ChartSeries,
}

/// Computes the manifest summary from the completed item set.
///
/// Purchase cost is `purchase_cost_fraction × projected_revenue`. Deriving
/// it from MSRP is a deprecated formula; reintroducing it is a regression.
pub fn summarize(items: &[AnalyzedItem], purchase_cost_fraction: Decimal) -> ManifestSummary {
    let total_msrp: Decimal = items
        .iter()
        .map(|i| i.item.msrp * Decimal::from(i.item.quantity))
        .sum();
    let projected_revenue: Decimal = items
        .iter()
        .map(|i| i.assessment.estimated_sale_price * Decimal::from(i.item.quantity))
        .sum();

    let purchase_cost = (projected_revenue * purchase_cost_fraction).round_dp(2);
    let total_profit = projected_revenue - purchase_cost;
    let profit_margin = if projected_revenue > Decimal::ZERO {
        (total_profit / projected_revenue).round_dp(4)
    } else {
        Decimal::ZERO
    };

    ManifestSummary {
        total_items: items.len() as i32,
        total_msrp,
        projected_revenue,
        total_profit,
        profit_margin,
        avg_sales_time: average_sales_time(items),
        recommendations: recommendations(items, total_msrp, projected_revenue, profit_margin),
    }
}

/// Builds the chart payload: a 12-month cumulative revenue projection
/// (70% of revenue in the first six months, 30% in the last six) plus
/// category and demand breakdowns.
pub fn charts(items: &[AnalyzedItem]) -> ChartData {
    let total_revenue: Decimal = items
        .iter()
        .map(|i| i.assessment.estimated_sale_price * Decimal::from(i.item.quantity))
        .sum();

    let front_monthly = total_revenue * dec!(0.7) / dec!(6);
    let back_monthly = total_revenue * dec!(0.3) / dec!(6);

    let mut timeline_labels = Vec::with_capacity(12);
    let mut timeline_data = Vec::with_capacity(12);
    let mut cumulative = Decimal::ZERO;
    for month in 1..=12 {
        cumulative += if month <= 6 { front_monthly } else { back_monthly };
        timeline_labels.push(format!("Month {}", month));
        timeline_data.push(cumulative.round_dp(2));
    }

    let mut category_labels: Vec<String> = Vec::new();
    let mut category_data: Vec<Decimal> = Vec::new();
    for item in items {
        let category = categorize(&item.item.title);
        match category_labels.iter().position(|c| c == category) {
            Some(idx) => category_data[idx] += Decimal::ONE,
            None => {
                category_labels.push(category.to_string());
                category_data.push(Decimal::ONE);
            }
        }
    }

    let demand_labels = vec!["High".to_string(), "Medium".to_string(), "Low".to_string()];
    let demand_data = [Demand::High, Demand::Medium, Demand::Low]
        .iter()
        .map(|tier| {
            Decimal::from(
                items
                    .iter()
                    .filter(|i| i.assessment.demand == *tier)
                    .count() as i64,
            )
        })
        .collect();

    ChartData {
        revenue_timeline: ChartSeries {
            labels: timeline_labels,
            data: timeline_data,
        },
        category_breakdown: ChartSeries {
            labels: category_labels,
            data: category_data,
        },
        demand_breakdown: ChartSeries {
            labels: demand_labels,
            data: demand_data,
        },
    }
}

/// Assigns a chart category from title keywords.
pub fn categorize(title: &str) -> &'static str {
    let title = title.to_lowercase();
    CATEGORY_BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| title.contains(k)))
        .map(|(name, _)| *name)
        .unwrap_or(OTHER_CATEGORY)
}

/// Converts one sales-time string to a day count via the fixed grammar:
/// "N weeks" and "N-M weeks" (midpoint) map through ×7, months through
/// ×30. Strings outside the grammar yield `None` and are excluded from
/// the average.
pub fn sales_time_days(sales_time: &str) -> Option<Decimal> {
    let captures = SALES_TIME_PATTERN.captures(sales_time)?;
    let low: Decimal = captures.get(1)?.as_str().parse().ok()?;
    let high: Decimal = match captures.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => low,
    };
    let midpoint = (low + high) / dec!(2);

    let unit_days = match captures.get(3)?.as_str().to_lowercase().as_str() {
        "week" => dec!(7),
        "month" => dec!(30),
        _ => return None,
    };

    Some(midpoint * unit_days)
}

fn average_sales_time(items: &[AnalyzedItem]) -> String {
    let day_counts: Vec<Decimal> = items
        .iter()
        .filter_map(|i| sales_time_days(&i.assessment.sales_time))
        .collect();

    if day_counts.is_empty() {
        return "N/A".to_string();
    }

    let avg_days: Decimal =
        day_counts.iter().sum::<Decimal>() / Decimal::from(day_counts.len() as i64);
    let weeks = (avg_days / dec!(7)).round();
    format!("{} weeks", weeks)
}

fn recommendations(
    items: &[AnalyzedItem],
    total_msrp: Decimal,
    projected_revenue: Decimal,
    profit_margin: Decimal,
) -> Vec<String> {
    let mut out = Vec::new();

    if profit_margin > dec!(0.3) {
        out.push(
            "High profit margin detected. Consider prioritizing these items for quick sales."
                .to_string(),
        );
    }
    if projected_revenue > total_msrp * dec!(0.8) {
        out.push(
            "Strong resale potential. Focus on marketing and competitive pricing.".to_string(),
        );
    }

    let total = items.len() as i64;
    let high = items
        .iter()
        .filter(|i| i.assessment.demand == Demand::High)
        .count() as i64;
    let low = items
        .iter()
        .filter(|i| i.assessment.demand == Demand::Low)
        .count() as i64;

    if total > 0 && high * 10 > total * 3 {
        out.push(
            "Many high-demand items identified. List these first to build momentum.".to_string(),
        );
    }
    if total > 0 && low * 2 > total {
        out.push(
            "Over half of the items are low demand. Expect slow turnover and budget conservatively."
                .to_string(),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Assessment, AssessmentSource};
    use crate::ingest::{Item, ItemFlags};
    use std::collections::BTreeMap;

    fn analyzed(title: &str, msrp: Decimal, quantity: i32, demand: Demand, price: Decimal, sales_time: &str) -> AnalyzedItem {
        let item = Item {
            item_number: format!("N-{}", title.len()),
            title: title.to_string(),
            msrp,
            quantity,
            pallet: None,
            notes: None,
            flags: ItemFlags::default(),
        };
        AnalyzedItem {
            profit: price - item.msrp,
            assessment: Assessment {
                demand,
                estimated_sale_price: price,
                sales_time: sales_time.to_string(),
                reasoning: String::new(),
                source: AssessmentSource::Heuristic,
            },
            marketplace: BTreeMap::new(),
            item,
        }
    }

    #[test]
    fn total_msrp_is_exact_quantity_weighted_sum() {
        let items = vec![
            analyzed("a", dec!(10.25), 3, Demand::Low, dec!(2), "4-8 months"),
            analyzed("b", dec!(0.10), 7, Demand::Low, dec!(0.02), "4-8 months"),
        ];
        let summary = summarize(&items, dec!(0.33));
        assert_eq!(summary.total_msrp, dec!(31.45));
    }

    #[test]
    fn margin_is_derived_from_revenue_fraction_not_msrp() {
        let items = vec![analyzed(
            "Air Compressor",
            dec!(1000),
            1,
            Demand::High,
            dec!(350),
            "2-4 weeks",
        )];
        let summary = summarize(&items, dec!(0.33));
        assert_eq!(summary.projected_revenue, dec!(350));
        assert_eq!(summary.total_profit, dec!(350) - dec!(115.50));
        // (revenue - 0.33*revenue) / revenue regardless of MSRP.
        assert_eq!(summary.profit_margin, dec!(0.67));
    }

    #[test]
    fn empty_manifest_has_zero_margin_and_na_sales_time() {
        let summary = summarize(&[], dec!(0.33));
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.profit_margin, Decimal::ZERO);
        assert_eq!(summary.avg_sales_time, "N/A");
    }

    #[test]
    fn sales_time_grammar_handles_ranges_and_units() {
        assert_eq!(sales_time_days("2-4 weeks"), Some(dec!(21)));
        assert_eq!(sales_time_days("1 week"), Some(dec!(7)));
        assert_eq!(sales_time_days("1-3 months"), Some(dec!(60)));
        assert_eq!(sales_time_days("6 months"), Some(dec!(180)));
        assert_eq!(sales_time_days("soon"), None);
        assert_eq!(sales_time_days(""), None);
    }

    #[test]
    fn avg_sales_time_is_rendered_in_weeks() {
        let items = vec![
            analyzed("a", dec!(100), 1, Demand::High, dec!(35), "2-4 weeks"),
            analyzed("b", dec!(100), 1, Demand::Medium, dec!(32), "1-3 months"),
        ];
        // (21 + 60) / 2 = 40.5 days, ~6 weeks.
        let summary = summarize(&items, dec!(0.33));
        assert_eq!(summary.avg_sales_time, "6 weeks");
    }

    #[test]
    fn unparseable_sales_times_are_excluded_from_the_average() {
        let items = vec![
            analyzed("a", dec!(100), 1, Demand::High, dec!(35), "2 weeks"),
            analyzed("b", dec!(100), 1, Demand::Low, dec!(20), "whenever"),
        ];
        let summary = summarize(&items, dec!(0.33));
        assert_eq!(summary.avg_sales_time, "2 weeks");
    }

    #[test]
    fn revenue_timeline_is_cumulative_and_front_loaded() {
        let items = vec![analyzed(
            "a",
            dec!(100),
            1,
            Demand::High,
            dec!(60),
            "1 week",
        )];
        let data = &charts(&items).revenue_timeline.data;
        assert_eq!(data.len(), 12);
        assert_eq!(data[5], dec!(42.00));
        assert_eq!(data[11], dec!(60.00));
        assert!(data.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn category_breakdown_buckets_by_keyword() {
        let items = vec![
            analyzed("Air Compressor 20 Gal", dec!(1), 1, Demand::High, dec!(1), "1 week"),
            analyzed("Sump Pump", dec!(1), 1, Demand::Medium, dec!(1), "1 week"),
            analyzed("Floor Jack", dec!(1), 1, Demand::Medium, dec!(1), "1 week"),
            analyzed("Mystery Gadget", dec!(1), 1, Demand::Low, dec!(1), "1 week"),
        ];
        let breakdown = charts(&items).category_breakdown;
        assert_eq!(
            breakdown.labels,
            vec!["Air Tools", "Motors & Pumps", "Lifting Equipment", "Other"]
        );
        assert!(breakdown.data.iter().all(|c| *c == Decimal::ONE));
    }

    #[test]
    fn low_demand_majority_triggers_caution() {
        let items = vec![
            analyzed("Tank", dec!(100), 1, Demand::Low, dec!(20), "4-8 months"),
            analyzed("Drum", dec!(100), 1, Demand::Low, dec!(20), "4-8 months"),
            analyzed("Drill", dec!(100), 1, Demand::High, dec!(40), "1-2 weeks"),
        ];
        let summary = summarize(&items, dec!(0.33));
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("low demand")));
    }

    #[test]
    fn summary_is_deterministic() {
        let items = vec![analyzed("Pump", dec!(500), 2, Demand::Medium, dec!(160), "1-3 months")];
        assert_eq!(summarize(&items, dec!(0.33)), summarize(&items, dec!(0.33)));
        assert_eq!(charts(&items), charts(&items));
    }
}
