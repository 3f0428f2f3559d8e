use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One analyzed manifest run. A manifest row is meaningless without its
/// items; deletion cascades through `manifest_item`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manifests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub created_at: DateTime<Utc>,
    pub total_items: i32,
    pub total_msrp: Decimal,
    pub projected_revenue: Decimal,
    pub profit_margin: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::manifest_item::Entity")]
    ManifestItem,
    #[sea_orm(has_one = "super::upload::Entity")]
    Upload,
}

impl Related<super::manifest_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManifestItem.def()
    }
}

impl Related<super::upload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upload.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
