//! `content_versions` rows.

use sqlx::types::Json;
use sqlx::FromRow;
use vellum_core::content::Snapshot;
use vellum_core::types::{DbId, Timestamp, VersionNumber};
use vellum_core::versioning::VersionRecord;

/// A row from the `content_versions` table.
#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: DbId,
    pub content_id: DbId,
    pub version_number: VersionNumber,
    pub snapshot: Json<Snapshot>,
    pub release: Option<String>,
    pub is_release_end: bool,
    pub change_note: Option<String>,
    pub created_by: DbId,
    pub created_by_name: String,
    pub created_at: Timestamp,
}

impl From<VersionRow> for VersionRecord {
    fn from(row: VersionRow) -> Self {
        VersionRecord {
            id: row.id,
            content_id: row.content_id,
            version_number: row.version_number,
            snapshot: row.snapshot.0,
            release: row.release,
            is_release_end: row.is_release_end,
            change_note: row.change_note,
            created_by: row.created_by,
            created_by_name: row.created_by_name,
            created_at: row.created_at,
        }
    }
}
