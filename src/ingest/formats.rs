//! Declarative registry of known supplier manifest layouts.
//!
//! Each supplier format is described by header-alias sets per canonical
//! field instead of a dedicated parser branch. The detector scores every
//! descriptor uniformly; adding a supplier means adding a descriptor here.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Canonical item fields a manifest column can map onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    ItemNumber,
    Title,
    Msrp,
    Quantity,
    Notes,
    Pallet,
}

/// Identified supplier layout. `Generic` is the heuristic fallback used
/// when no known format clears its match threshold.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum FormatId {
    Grainger,
    Liquidation,
    Staples,
    DirectLiquidation,
    DepartmentStore,
    Electronics,
    Costco,
    Generic,
}

/// Header aliases for one canonical field. A header cell matches when its
/// normalized text contains one of `aliases` and none of `excludes`
/// (exclusions keep "Retail Price" from matching "Total Retail Price").
pub struct FieldAliases {
    pub field: CanonicalField,
    pub aliases: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

/// One known supplier layout.
pub struct FormatDescriptor {
    pub id: FormatId,
    /// Minimum number of alias hits for this format to be a candidate
    pub min_matches: usize,
    pub fields: &'static [FieldAliases],
}

const PRICE_EXCLUDES: &[&str] = &["total", "ext", "extended"];

/// Known formats in declaration order; ties in detection score break
/// toward the earliest entry.
pub const REGISTRY: &[FormatDescriptor] = &[
    FormatDescriptor {
        id: FormatId::Grainger,
        min_matches: 2,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["grainger item", "item #", "item number"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["title line", "title", "description"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["msrp - grainger", "msrp", "g $"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["notes", "comment"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Pallet,
                aliases: &["pallet", "lot"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::Liquidation,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["upc"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["description", "product"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["retail price"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["qty", "quantity"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["category"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::Staples,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["model"],
                excludes: &["number"],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["description"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["retail price"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["quantity", "qty"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["sku restriction", "restriction"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::DirectLiquidation,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["item title"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["upc"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["retail price", "msrp"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["quantity", "qty"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["brand"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::DepartmentStore,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["sku"],
                excludes: &["restriction"],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["product name"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["msrp"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["quantity", "qty"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["brand", "condition"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::Electronics,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["model number"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["description"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["retail price"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["qty", "quantity"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["condition"],
                excludes: &[],
            },
        ],
    },
    FormatDescriptor {
        id: FormatId::Costco,
        min_matches: 3,
        fields: &[
            FieldAliases {
                field: CanonicalField::ItemNumber,
                aliases: &["item number"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Title,
                aliases: &["description"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Msrp,
                aliases: &["sell price"],
                excludes: PRICE_EXCLUDES,
            },
            FieldAliases {
                field: CanonicalField::Quantity,
                aliases: &["quantity", "qty"],
                excludes: &[],
            },
            FieldAliases {
                field: CanonicalField::Notes,
                aliases: &["salvage"],
                excludes: &[],
            },
        ],
    },
];

/// Normalizes a header cell for alias matching: lowercased with interior
/// whitespace collapsed to single spaces.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl FieldAliases {
    /// Whether a normalized header cell matches this field.
    pub fn matches(&self, normalized: &str) -> bool {
        self.aliases.iter().any(|a| normalized.contains(a))
            && !self.excludes.iter().any(|e| normalized.contains(e))
    }
}
