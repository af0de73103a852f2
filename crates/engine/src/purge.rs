//! Batched deletion of intermediate versions.
//!
//! Contents are walked by ascending id in pages of `batch_size`. Each page is
//! counted or deleted by one store call, so an interrupted purge leaves every
//! finished page fully applied and the rest untouched. Rerunning recomputes
//! the purgeable set from persisted flags and picks up where it stopped.

use std::sync::Arc;

use vellum_core::error::CoreError;
use vellum_core::purge::{PurgePolicy, PurgePreview, PurgeReport};
use vellum_core::store::Store;
use vellum_core::types::DbId;

/// Previews and executes purges for a collection.
#[derive(Clone)]
pub struct PurgeEngine {
    store: Arc<dyn Store>,
    batch_size: i64,
    policy: PurgePolicy,
}

impl PurgeEngine {
    pub fn new(store: Arc<dyn Store>, batch_size: i64, policy: PurgePolicy) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    /// Count what [`purge`](Self::purge) would delete. Read-only.
    pub async fn preview_purge(&self, collection_id: DbId) -> Result<PurgePreview, CoreError> {
        self.ensure_collection(collection_id).await?;

        let mut preview = PurgePreview {
            collection_id,
            ..Default::default()
        };
        let mut after = None;
        loop {
            let batch = self
                .store
                .list_content_ids(collection_id, after, self.batch_size)
                .await?;
            let Some(&last) = batch.last() else { break };

            preview.contents_scanned += batch.len() as u64;
            preview.purgeable_versions += self.store.count_purgeable(&batch, self.policy).await?;

            if (batch.len() as i64) < self.batch_size {
                break;
            }
            after = Some(last);
        }

        tracing::debug!(
            collection_id,
            contents_scanned = preview.contents_scanned,
            purgeable_versions = preview.purgeable_versions,
            "Purge preview computed"
        );
        Ok(preview)
    }

    /// Delete every version that is neither a release end nor the content's
    /// current version. Idempotent.
    pub async fn purge(&self, collection_id: DbId) -> Result<PurgeReport, CoreError> {
        self.ensure_collection(collection_id).await?;

        let mut report = PurgeReport {
            collection_id,
            ..Default::default()
        };
        let mut after = None;
        loop {
            let batch = self
                .store
                .list_content_ids(collection_id, after, self.batch_size)
                .await?;
            let Some(&last) = batch.last() else { break };

            let deleted = self.store.delete_purgeable(&batch, self.policy).await?;
            report.batches += 1;
            report.contents_scanned += batch.len() as u64;
            report.versions_deleted += deleted;
            tracing::debug!(
                collection_id,
                batch = report.batches,
                contents = batch.len(),
                deleted,
                "Purge batch applied"
            );

            if (batch.len() as i64) < self.batch_size {
                break;
            }
            after = Some(last);
        }

        tracing::info!(
            collection_id,
            batches = report.batches,
            contents_scanned = report.contents_scanned,
            versions_deleted = report.versions_deleted,
            "Purge completed"
        );
        Ok(report)
    }

    async fn ensure_collection(&self, collection_id: DbId) -> Result<(), CoreError> {
        match self.store.find_collection(collection_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("collection", collection_id)),
        }
    }
}
