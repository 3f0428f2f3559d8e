//! Manifest ingestion: format-detecting CSV parsing and row normalization.

pub mod detector;
pub mod formats;
pub mod normalizer;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::info;

pub use detector::{detect_format, ColumnMapping};
pub use formats::{CanonicalField, FormatId};
pub use normalizer::{normalize_rows, Item, ItemFlags, NormalizedManifest, SkippedRow};

use crate::errors::ServiceError;

/// Number of body rows handed to the detector as a classification sample.
const DETECTION_SAMPLE_ROWS: usize = 10;

/// Raw uploaded manifest. Transient; discarded after parsing.
#[derive(Clone, Debug)]
pub struct RawManifest {
    pub content: String,
    pub filename: String,
}

/// Parses a raw CSV blob into normalized items: header detection against
/// the format registry, then per-row normalization. Only two failures are
/// fatal at this level: an unreadable payload and an unidentifiable title
/// column (`UnrecognizedFormat`).
pub fn parse_manifest(raw: &RawManifest) -> Result<(ColumnMapping, NormalizedManifest), ServiceError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(raw.content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ServiceError::UnreadableManifest(format!("failed to read CSV header: {}", e)))?
        .clone();

    let mut records: Vec<StringRecord> = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => records.push(record),
            // A malformed row is a per-row problem, not a manifest failure.
            Err(e) => info!("ignoring malformed CSV record: {}", e),
        }
    }

    let sample_len = records.len().min(DETECTION_SAMPLE_ROWS);
    let mapping = detect_format(&headers, &records[..sample_len])?;
    let normalized = normalize_rows(&mapping, &records);

    info!(
        filename = %raw.filename,
        format = %mapping.format_id,
        items = normalized.items.len(),
        skipped = normalized.skipped.len(),
        "parsed manifest"
    );

    Ok((mapping, normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn end_to_end_parse_of_costco_style_manifest() {
        let raw = RawManifest {
            content: "Item Number,Description,Quantity,Sell Price,Extended Sell\n\
                      100,Air Compressor 20 Gal,2,\"$1,299.00\",\"$2,598.00\"\n\
                      101,Floor Jack 3 Ton,1,$89.99,$89.99\n"
                .to_string(),
            filename: "costco.csv".to_string(),
        };

        let (mapping, normalized) = parse_manifest(&raw).unwrap();
        assert_eq!(mapping.format_id, FormatId::Costco);
        assert_eq!(normalized.items.len(), 2);
        assert_eq!(normalized.items[0].msrp, dec!(1299.00));
        assert_eq!(normalized.items[0].quantity, 2);
    }

    #[test]
    fn csv_without_identifiable_title_is_rejected() {
        let raw = RawManifest {
            content: "x,y\n1.0,2.0\n3.5,4.5\n".to_string(),
            filename: "numbers.csv".to_string(),
        };

        let err = parse_manifest(&raw).unwrap_err();
        assert!(matches!(err, ServiceError::UnrecognizedFormat(_)));
    }
}
