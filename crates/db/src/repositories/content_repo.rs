//! Repository for the `contents` table.

use sqlx::types::Json;
use sqlx::PgPool;
use vellum_core::content::{replace_element, ContentChanges, Element, NewContent};
use vellum_core::types::DbId;

use crate::models::content::ContentRow;

/// Column list for `contents` queries.
const COLUMNS: &str = "id, collection_id, title, metadata, elements, status, \
                       current_version, created_at, updated_at";

/// Provides CRUD operations for content heads.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a draft head with `current_version = 0`.
    pub async fn create(pool: &PgPool, input: &NewContent) -> Result<ContentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO contents (collection_id, title, metadata, elements) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRow>(&query)
            .bind(input.collection_id)
            .bind(&input.title)
            .bind(&input.metadata)
            .bind(Json(&input.elements))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ContentRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contents WHERE id = $1");
        sqlx::query_as::<_, ContentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply the non-`None` fields of `changes`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        changes: &ContentChanges,
    ) -> Result<Option<ContentRow>, sqlx::Error> {
        let query = format!(
            "UPDATE contents SET \
                title = COALESCE($2, title), \
                metadata = COALESCE($3, metadata), \
                elements = COALESCE($4, elements), \
                status = COALESCE($5, status) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRow>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.metadata)
            .bind(changes.elements.as_ref().map(Json))
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(pool)
            .await
    }

    /// Replace one element of the stored tree under a row lock.
    ///
    /// Returns `None` if the content does not exist and `Some(None)` if it has
    /// no element with that id, in which case nothing is written.
    pub async fn replace_element(
        pool: &PgPool,
        id: DbId,
        element_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<Option<Option<ContentRow>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let tree: Option<(Json<Vec<Element>>,)> =
            sqlx::query_as("SELECT elements FROM contents WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut elements),)) = tree else {
            return Ok(None);
        };
        if !replace_element(&mut elements, element_id, kind, data) {
            return Ok(Some(None));
        }

        let query = format!(
            "UPDATE contents SET elements = $2 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&query)
            .bind(id)
            .bind(Json(&elements))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Some(row)))
    }

    /// Content ids of a collection in ascending order, strictly after `after`.
    pub async fn list_ids(
        pool: &PgPool,
        collection_id: DbId,
        after: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM contents \
             WHERE collection_id = $1 AND ($2::BIGINT IS NULL OR id > $2) \
             ORDER BY id ASC \
             LIMIT $3",
        )
        .bind(collection_id)
        .bind(after)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
