//! `collections` and `releases` rows.

use sqlx::FromRow;
use vellum_core::releases::{Collection, Release};
use vellum_core::types::{DbId, Timestamp};

/// A row from the `collections` table.
#[derive(Debug, Clone, FromRow)]
pub struct CollectionRow {
    pub id: DbId,
    pub name: String,
    pub current_release: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CollectionRow {
    /// Attach the collection's releases, which must be in declaration order.
    pub fn into_collection(self, releases: Vec<ReleaseRow>) -> Collection {
        Collection {
            id: self.id,
            name: self.name,
            current_release: self.current_release,
            releases: releases.into_iter().map(Release::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A row from the `releases` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReleaseRow {
    pub id: DbId,
    pub collection_id: DbId,
    pub name: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Release {
            name: row.name,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}
