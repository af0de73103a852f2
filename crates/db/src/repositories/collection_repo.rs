//! Repository for the `collections` table and its release list.

use sqlx::PgPool;
use vellum_core::types::DbId;

use crate::models::collection::{CollectionRow, ReleaseRow};

/// Column list for `collections` queries.
pub(crate) const COLUMNS: &str = "id, name, current_release, created_at, updated_at";

/// Column list for `releases` queries.
pub(crate) const RELEASE_COLUMNS: &str = "id, collection_id, name, created_by, created_at";

/// Provides create and read operations for collections.
pub struct CollectionRepo;

impl CollectionRepo {
    /// Insert an empty collection. Fails on `uq_collections_name`.
    pub async fn create(pool: &PgPool, name: &str) -> Result<CollectionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO collections (name) VALUES ($1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CollectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = $1");
        sqlx::query_as::<_, CollectionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Releases of a collection in declaration order.
    pub async fn list_releases(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<ReleaseRow>, sqlx::Error> {
        let query = format!(
            "SELECT {RELEASE_COLUMNS} FROM releases \
             WHERE collection_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ReleaseRow>(&query)
            .bind(collection_id)
            .fetch_all(pool)
            .await
    }
}
