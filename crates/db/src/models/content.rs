//! `contents` rows.

use sqlx::types::Json;
use sqlx::FromRow;
use vellum_core::content::{ContentEntity, ContentStatus, Element};
use vellum_core::error::StoreError;
use vellum_core::types::{DbId, Timestamp, VersionNumber};

/// A row from the `contents` table.
#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub id: DbId,
    pub collection_id: DbId,
    pub title: String,
    pub metadata: serde_json::Value,
    pub elements: Json<Vec<Element>>,
    pub status: String,
    pub current_version: VersionNumber,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ContentRow> for ContentEntity {
    type Error = StoreError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let status = ContentStatus::parse(&row.status)
            .map_err(|e| StoreError::Backend(format!("content {}: {e}", row.id)))?;
        Ok(ContentEntity {
            id: row.id,
            collection_id: row.collection_id,
            title: row.title,
            metadata: row.metadata,
            elements: row.elements.0,
            status,
            current_version: row.current_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
