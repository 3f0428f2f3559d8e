//! Row normalization: one source row plus a column mapping becomes a
//! canonical item, or a per-row diagnostic. A bad row never aborts the
//! manifest.

use std::collections::HashSet;

use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::ingest::detector::ColumnMapping;
use crate::ingest::formats::CanonicalField;

/// Values treated as absent wherever they appear.
const NULL_MARKERS: &[&str] = &["", "n/a", "null", "none"];

/// Quality flags attached during normalization. Flagged items stay in the
/// manifest; the flags only mark where defaults were substituted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemFlags {
    /// MSRP was missing or unparsable and defaulted to 0
    #[serde(default)]
    pub price_defaulted: bool,
    /// Another row in the same manifest carries the same item number
    #[serde(default)]
    pub duplicate_item_number: bool,
}

/// Canonical item record. Never mutated once created; enrichment attaches
/// additional data alongside rather than overwriting these fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub item_number: String,
    pub title: String,
    pub msrp: Decimal,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub flags: ItemFlags,
}

/// Diagnostic for a row that produced no item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SkippedRow {
    /// 1-based line number in the source CSV (header is line 1)
    pub line: u64,
    pub reason: String,
}

/// Result of normalizing a whole manifest body.
#[derive(Clone, Debug, Default)]
pub struct NormalizedManifest {
    pub items: Vec<Item>,
    pub skipped: Vec<SkippedRow>,
}

/// Parses a monetary string tolerating currency symbols, thousands
/// separators, and surrounding whitespace. Any other character makes the
/// value non-monetary and yields `None`; item codes like "A-1" must never
/// read as prices.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty()
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    {
        return None;
    }

    cleaned.parse::<Decimal>().ok()
}

/// Parses a quantity, tolerating decimal notation ("3.0"). Non-positive or
/// unparsable quantities yield `None` so the caller can default to 1.
fn parse_quantity(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return None;
    }
    let value = trimmed.parse::<f64>().ok()?;
    let qty = value.trunc() as i32;
    (qty >= 1).then_some(qty)
}

fn is_null_marker(value: &str) -> bool {
    NULL_MARKERS.contains(&value.to_lowercase().as_str())
}

fn field<'a>(record: &'a StringRecord, mapping: &ColumnMapping, f: CanonicalField) -> Option<&'a str> {
    let idx = mapping.column(f)?;
    let value = record.get(idx)?.trim();
    (!is_null_marker(value)).then_some(value)
}

/// Normalizes all body rows against the column mapping. Rows with an empty
/// title are skipped and counted; unparsable numerics default (flagged),
/// never fail. Duplicate item numbers are kept and flagged.
pub fn normalize_rows(
    mapping: &ColumnMapping,
    records: &[StringRecord],
) -> NormalizedManifest {
    let mut result = NormalizedManifest::default();

    for (offset, record) in records.iter().enumerate() {
        // Header occupies line 1.
        let line = offset as u64 + 2;

        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let Some(title) = field(record, mapping, CanonicalField::Title) else {
            debug!(line, "skipping row with empty title");
            result.skipped.push(SkippedRow {
                line,
                reason: "empty title".to_string(),
            });
            continue;
        };

        let mut flags = ItemFlags::default();
        let msrp = match field(record, mapping, CanonicalField::Msrp).and_then(parse_money) {
            Some(value) => value,
            None => {
                flags.price_defaulted = true;
                Decimal::ZERO
            }
        };

        let quantity = field(record, mapping, CanonicalField::Quantity)
            .and_then(parse_quantity)
            .unwrap_or(1);

        let item_number = field(record, mapping, CanonicalField::ItemNumber)
            .map(str::to_string)
            .unwrap_or_else(|| format!("item_{}", line));

        result.items.push(Item {
            item_number,
            title: title.to_string(),
            msrp,
            quantity,
            pallet: field(record, mapping, CanonicalField::Pallet).map(str::to_string),
            notes: field(record, mapping, CanonicalField::Notes).map(str::to_string),
            flags,
        });
    }

    flag_duplicates(&mut result.items);
    result
}

/// Duplicate item numbers are kept but flagged on every occurrence.
fn flag_duplicates(items: &mut [Item]) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: HashSet<String> = HashSet::new();
    for item in items.iter() {
        if !seen.insert(item.item_number.clone()) {
            duplicates.insert(item.item_number.clone());
        }
    }
    for item in items.iter_mut() {
        if duplicates.contains(&item.item_number) {
            item.flags.duplicate_item_number = true;
        }
    }
}
