//! Schema detection: classify a raw CSV header against the known supplier
//! layouts, falling back to a heuristic generic mapping.

use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::ingest::formats::{normalize_header, CanonicalField, FormatId, REGISTRY};
use crate::ingest::normalizer::parse_money;
use crate::ingest::DETECTION_SAMPLE_ROWS;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(id|sku|upc|part|model|number|ref|#)\b|item\s*#").unwrap());
static QUANTITY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(qty|quantity|count|units)\b").unwrap());
static NOTES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(notes?|comments?|remarks?)\b").unwrap());
static PALLET_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(pallet|lot|batch|location|bin)\b").unwrap());

/// Immutable mapping from canonical fields to source column indexes,
/// produced once per manifest.
#[derive(Clone, Debug)]
pub struct ColumnMapping {
    pub format_id: FormatId,
    columns: Vec<(CanonicalField, usize)>,
}

impl ColumnMapping {
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    }

    fn insert_first(&mut self, field: CanonicalField, index: usize) {
        if self.column(field).is_none() {
            self.columns.push((field, index));
        }
    }
}

/// Classifies the header (plus up to `DETECTION_SAMPLE_ROWS` body rows)
/// against the format registry. Known formats are scored by alias hits;
/// the highest score at or above the descriptor's threshold wins, ties
/// breaking toward the earliest-declared format. When nothing qualifies,
/// the generic mapping is attempted.
///
/// Fails with `UnrecognizedFormat` only when even the generic fallback
/// cannot identify a title column. A missing price column is never fatal.
pub fn detect_format(
    headers: &StringRecord,
    sample: &[StringRecord],
) -> Result<ColumnMapping, ServiceError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    if normalized.iter().all(|h| h.is_empty()) {
        return Err(ServiceError::UnrecognizedFormat(
            "manifest has no header row".to_string(),
        ));
    }

    let mut best: Option<(usize, ColumnMapping)> = None;
    for descriptor in REGISTRY {
        let mut mapping = ColumnMapping {
            format_id: descriptor.id,
            columns: Vec::new(),
        };

        for field_aliases in descriptor.fields {
            if let Some(idx) = normalized.iter().position(|h| field_aliases.matches(h)) {
                mapping.insert_first(field_aliases.field, idx);
            }
        }

        let score = mapping.columns.len();
        debug!(format = %descriptor.id, score, "scored manifest format");

        let qualifies =
            score >= descriptor.min_matches && mapping.column(CanonicalField::Title).is_some();
        // Strictly-greater keeps declaration order as the tie-break.
        if qualifies && best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, mapping));
        }
    }

    if let Some((score, mapping)) = best {
        info!(format = %mapping.format_id, score, "detected manifest format");
        return Ok(mapping);
    }

    info!("no known format cleared its threshold; using generic mapping");
    generic_mapping(&normalized, sample)
}

/// Heuristic generic mapping: id/sku/number-pattern column becomes
/// `item_number`, the first numeric-looking column becomes `msrp`, and the
/// first remaining text-like column becomes `title`.
fn generic_mapping(
    normalized: &[String],
    sample: &[StringRecord],
) -> Result<ColumnMapping, ServiceError> {
    let mut mapping = ColumnMapping {
        format_id: FormatId::Generic,
        columns: Vec::new(),
    };

    for (idx, header) in normalized.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        if ID_PATTERN.is_match(header) {
            mapping.insert_first(CanonicalField::ItemNumber, idx);
        } else if QUANTITY_PATTERN.is_match(header) {
            mapping.insert_first(CanonicalField::Quantity, idx);
        } else if NOTES_PATTERN.is_match(header) {
            mapping.insert_first(CanonicalField::Notes, idx);
        } else if PALLET_PATTERN.is_match(header) {
            mapping.insert_first(CanonicalField::Pallet, idx);
        }
    }

    // Column content classification from the body sample.
    for idx in 0..normalized.len() {
        if mapping.columns.iter().any(|(_, i)| *i == idx) {
            continue;
        }
        if column_is_numeric(idx, sample) {
            mapping.insert_first(CanonicalField::Msrp, idx);
        } else if column_is_text(idx, sample) {
            mapping.insert_first(CanonicalField::Title, idx);
        }
    }

    if mapping.column(CanonicalField::Title).is_none() {
        return Err(ServiceError::UnrecognizedFormat(
            "no title column could be identified".to_string(),
        ));
    }

    Ok(mapping)
}

/// A column is numeric-looking when every sampled non-empty value parses as
/// a monetary amount and at least one value is present.
fn column_is_numeric(idx: usize, sample: &[StringRecord]) -> bool {
    let mut seen = 0usize;
    for row in sample.iter().take(DETECTION_SAMPLE_ROWS) {
        let Some(value) = row.get(idx) else { continue };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parse_money(trimmed).is_none() {
            return false;
        }
        seen += 1;
    }
    seen > 0
}

/// A column is text-like when at least one sampled value is non-empty and
/// does not parse as a monetary amount.
fn column_is_text(idx: usize, sample: &[StringRecord]) -> bool {
    sample.iter().take(DETECTION_SAMPLE_ROWS).any(|row| {
        row.get(idx)
            .map(|v| {
                let trimmed = v.trim();
                !trimmed.is_empty() && parse_money(trimmed).is_none()
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn detects_grainger_format() {
        let headers = record(&["Grainger item #", "title line", "msrp - grainger", "notes", "pallet"]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Grainger);
        assert_eq!(mapping.column(CanonicalField::ItemNumber), Some(0));
        assert_eq!(mapping.column(CanonicalField::Title), Some(1));
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(2));
    }

    #[test]
    fn detects_liquidation_format() {
        let headers = record(&[
            "UPC",
            "Description",
            "Category",
            "Qty",
            "Retail Price",
            "Total Retail Price",
        ]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Liquidation);
        // "Retail Price" maps; "Total Retail Price" is excluded.
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(4));
        assert_eq!(mapping.column(CanonicalField::Quantity), Some(3));
    }

    #[test]
    fn detects_staples_format() {
        let headers = record(&[
            "Description",
            "Model",
            "Quantity",
            "Retail Price",
            "Ext. Retail Price",
            "Sku Restriction",
        ]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Staples);
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(3));
    }

    #[test]
    fn detects_direct_liquidation_format() {
        let headers = record(&["Item Title", "Quantity", "Retail Price", "UPC", "Brand"]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::DirectLiquidation);
        assert_eq!(mapping.column(CanonicalField::Title), Some(0));
    }

    #[test]
    fn detects_department_store_format() {
        let headers = record(&[
            "SKU",
            "Product Name",
            "Brand",
            "Condition",
            "Quantity",
            "MSRP",
            "Extended MSRP",
        ]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::DepartmentStore);
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(5));
    }

    #[test]
    fn detects_electronics_format() {
        let headers = record(&[
            "Model Number",
            "Description",
            "Condition",
            "Qty",
            "Retail Price",
            "Total Retail",
        ]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Electronics);
    }

    #[test]
    fn detects_costco_format() {
        let headers = record(&[
            "Item Number",
            "Description",
            "Quantity",
            "Sell Price",
            "Extended Sell",
            "Salvage Percent",
        ]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Costco);
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(3));
    }

    #[test]
    fn unknown_header_falls_back_to_generic() {
        let headers = record(&["Ref", "Widget", "Price Each"]);
        let sample = vec![
            record(&["A-1", "Blue widget", "$10.00"]),
            record(&["A-2", "Red widget", "12.50"]),
        ];
        let mapping = detect_format(&headers, &sample).unwrap();
        assert_eq!(mapping.format_id, FormatId::Generic);
        assert_eq!(mapping.column(CanonicalField::Title), Some(1));
        assert_eq!(mapping.column(CanonicalField::Msrp), Some(2));
    }

    #[test]
    fn generic_without_price_column_still_succeeds() {
        let headers = record(&["SKU", "Thing"]);
        let sample = vec![record(&["X1", "A very nice thing"])];
        let mapping = detect_format(&headers, &sample).unwrap();
        assert_eq!(mapping.format_id, FormatId::Generic);
        assert_eq!(mapping.column(CanonicalField::ItemNumber), Some(0));
        assert_eq!(mapping.column(CanonicalField::Title), Some(1));
        assert!(mapping.column(CanonicalField::Msrp).is_none());
    }

    #[test]
    fn unrecognized_when_no_title_column() {
        let headers = record(&["a", "b"]);
        let sample = vec![record(&["1.00", "2.00"]), record(&["3.00", "4.00"])];
        let err = detect_format(&headers, &sample).unwrap_err();
        assert!(matches!(err, ServiceError::UnrecognizedFormat(_)));
    }

    #[test]
    fn tie_breaks_toward_earliest_registered_format() {
        // This header scores 3 for liquidation, staples, and electronics
        // alike; the earliest-registered qualifying descriptor must win.
        let headers = record(&["Description", "Retail Price", "Qty"]);
        let mapping = detect_format(&headers, &[]).unwrap();
        assert_eq!(mapping.format_id, FormatId::Liquidation);
    }
}
