use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One item row of an analyzed manifest, carrying the normalized source
/// fields plus the assessment that was attached during the run.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manifest_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub manifest_id: Uuid,
    pub item_number: String,
    pub title: String,
    pub msrp: Decimal,
    pub quantity: i32,
    pub pallet: Option<String>,
    pub notes: Option<String>,
    pub estimated_sale_price: Decimal,
    pub profit: Decimal,
    pub demand: String,
    pub sales_time: String,
    pub reasoning: String,
    /// Which path produced the assessment: "ai" or "heuristic"
    pub assessment_source: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manifest::Entity",
        from = "Column::ManifestId",
        to = "super::manifest::Column::Id",
        on_delete = "Cascade"
    )]
    Manifest,
}

impl Related<super::manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
