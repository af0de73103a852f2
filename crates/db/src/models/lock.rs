//! `resource_locks` rows.

use sqlx::FromRow;
use vellum_core::error::StoreError;
use vellum_core::locking::{Lock, ResourceType};
use vellum_core::types::{DbId, Timestamp};

/// A row from the `resource_locks` table.
#[derive(Debug, Clone, FromRow)]
pub struct LockRow {
    pub id: DbId,
    pub resource_type: String,
    pub resource_id: String,
    pub collection_id: DbId,
    pub content_id: Option<DbId>,
    pub locked_by: DbId,
    pub locked_by_name: String,
    pub reason: Option<String>,
    pub locked_at: Timestamp,
}

impl TryFrom<LockRow> for Lock {
    type Error = StoreError;

    fn try_from(row: LockRow) -> Result<Self, Self::Error> {
        let resource_type = ResourceType::parse(&row.resource_type)
            .map_err(|e| StoreError::Backend(format!("lock {}: {e}", row.id)))?;
        Ok(Lock {
            resource_type,
            resource_id: row.resource_id,
            collection_id: row.collection_id,
            content_id: row.content_id,
            locked_by: row.locked_by,
            locked_by_name: row.locked_by_name,
            locked_at: row.locked_at,
            reason: row.reason,
        })
    }
}
