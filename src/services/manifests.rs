//! Persistence gateway for completed manifest runs.
//!
//! A manifest row never exists without its items: inserts happen in one
//! transaction and deletes cascade through the item table. Reprocessing a
//! file replaces the previous results for that content hash.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::entities::{manifest, manifest_item, upload};
use crate::errors::ServiceError;
use crate::pipeline::RunOutput;

/// Stored analysis: the manifest header row plus every item row.
#[derive(Clone, Debug)]
pub struct StoredAnalysis {
    pub manifest: manifest::Model,
    pub items: Vec<manifest_item::Model>,
    pub filename: Option<String>,
    /// True when the stored run hit its deadline and covers a subset only.
    pub partial: bool,
}

#[derive(Clone)]
pub struct ManifestService {
    db: Arc<DatabaseConnection>,
}

impl ManifestService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists one completed run in a single transaction and returns the
    /// new manifest id. A previous analysis of the same file content is
    /// replaced, not duplicated.
    pub async fn save_analysis(
        &self,
        output: &RunOutput,
        filename: &str,
        file_hash: &str,
    ) -> Result<Uuid, ServiceError> {
        let manifest_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        // Replace any previous analysis of this exact file content.
        let previous = upload::Entity::find()
            .filter(upload::Column::FileHash.eq(file_hash))
            .all(&txn)
            .await?;
        for stale in previous {
            if let Some(old_manifest_id) = stale.manifest_id {
                manifest_item::Entity::delete_many()
                    .filter(manifest_item::Column::ManifestId.eq(old_manifest_id))
                    .exec(&txn)
                    .await?;
                manifest::Entity::delete_by_id(old_manifest_id)
                    .exec(&txn)
                    .await?;
            }
            upload::Entity::delete_by_id(stale.id).exec(&txn).await?;
        }

        manifest::ActiveModel {
            id: Set(manifest_id),
            created_at: Set(now),
            total_items: Set(output.summary.total_items),
            total_msrp: Set(output.summary.total_msrp),
            projected_revenue: Set(output.summary.projected_revenue),
            profit_margin: Set(output.summary.profit_margin),
        }
        .insert(&txn)
        .await?;

        for analyzed in &output.items {
            manifest_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                manifest_id: Set(manifest_id),
                item_number: Set(analyzed.item.item_number.clone()),
                title: Set(analyzed.item.title.clone()),
                msrp: Set(analyzed.item.msrp),
                quantity: Set(analyzed.item.quantity),
                pallet: Set(analyzed.item.pallet.clone()),
                notes: Set(analyzed.item.notes.clone()),
                estimated_sale_price: Set(analyzed.assessment.estimated_sale_price),
                profit: Set(analyzed.profit),
                demand: Set(analyzed.assessment.demand.to_string()),
                sales_time: Set(analyzed.assessment.sales_time.clone()),
                reasoning: Set(analyzed.assessment.reasoning.clone()),
                assessment_source: Set(analyzed.assessment.source.to_string()),
            }
            .insert(&txn)
            .await?;
        }

        upload::ActiveModel {
            id: Set(Uuid::new_v4()),
            filename: Set(filename.to_string()),
            file_hash: Set(file_hash.to_string()),
            status: Set(if output.partial {
                "partial".to_string()
            } else {
                "completed".to_string()
            }),
            total_items: Set(output.summary.total_items),
            manifest_id: Set(Some(manifest_id)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            %manifest_id,
            filename,
            items = output.summary.total_items,
            "saved manifest analysis"
        );
        Ok(manifest_id)
    }

    /// Retrieves a stored analysis by manifest id. The summary row is never
    /// returned without its items.
    pub async fn get_analysis(&self, manifest_id: Uuid) -> Result<StoredAnalysis, ServiceError> {
        let manifest = manifest::Entity::find_by_id(manifest_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("manifest {} not found", manifest_id)))?;

        let items = manifest_item::Entity::find()
            .filter(manifest_item::Column::ManifestId.eq(manifest_id))
            .all(&*self.db)
            .await?;

        let upload_row = upload::Entity::find()
            .filter(upload::Column::ManifestId.eq(manifest_id))
            .one(&*self.db)
            .await?;

        Ok(StoredAnalysis {
            manifest,
            items,
            filename: upload_row.as_ref().map(|u| u.filename.clone()),
            partial: upload_row.map_or(false, |u| u.status == "partial"),
        })
    }

    /// Looks up a previously stored analysis by file content hash. Only
    /// completed runs qualify; a partial run is not a reusable answer, so
    /// resubmitting its file triggers a fresh run.
    pub async fn find_by_file_hash(
        &self,
        file_hash: &str,
    ) -> Result<Option<StoredAnalysis>, ServiceError> {
        let existing = upload::Entity::find()
            .filter(upload::Column::FileHash.eq(file_hash))
            .filter(upload::Column::Status.eq("completed"))
            .filter(upload::Column::ManifestId.is_not_null())
            .one(&*self.db)
            .await?;

        match existing.and_then(|u| u.manifest_id) {
            Some(manifest_id) => Ok(Some(self.get_analysis(manifest_id).await?)),
            None => Ok(None),
        }
    }

    /// Deletes a manifest together with its items and upload record.
    pub async fn delete_manifest(&self, manifest_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        // Sqlite does not always enforce cascades; delete children first.
        manifest_item::Entity::delete_many()
            .filter(manifest_item::Column::ManifestId.eq(manifest_id))
            .exec(&txn)
            .await?;
        upload::Entity::delete_many()
            .filter(upload::Column::ManifestId.eq(manifest_id))
            .exec(&txn)
            .await?;

        let result = manifest::Entity::delete_by_id(manifest_id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "manifest {} not found",
                manifest_id
            )));
        }

        txn.commit().await?;
        info!(%manifest_id, "deleted manifest and its items");
        Ok(())
    }
}
