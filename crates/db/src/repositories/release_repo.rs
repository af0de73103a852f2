//! Repository for release declaration.

use sqlx::PgPool;
use vellum_core::types::DbId;

use super::collection_repo::RELEASE_COLUMNS;
use crate::models::collection::ReleaseRow;

/// Result of a committed release declaration.
#[derive(Debug, Clone)]
pub struct DeclaredRelease {
    pub release: ReleaseRow,
    /// The release that was current before this one.
    pub closed_release: Option<String>,
    pub versions_marked: u64,
}

/// Provides release declaration, serialized per collection.
pub struct ReleaseRepo;

impl ReleaseRepo {
    /// Declare a release in one transaction.
    ///
    /// Locks the collection row `FOR UPDATE`, which waits out every version
    /// append holding `FOR SHARE` on it. Then flags the latest version of each
    /// content as a release end, records the release and makes it current.
    ///
    /// Returns `None` if the collection does not exist. A duplicate name
    /// fails on `uq_releases_collection_name` and rolls everything back.
    pub async fn declare(
        pool: &PgPool,
        collection_id: DbId,
        name: &str,
        created_by: DbId,
    ) -> Result<Option<DeclaredRelease>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT current_release FROM collections WHERE id = $1 FOR UPDATE",
        )
        .bind(collection_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((closed_release,)) = current else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO releases (collection_id, name, created_by) \
             VALUES ($1, $2, $3) \
             RETURNING {RELEASE_COLUMNS}"
        );
        let release = sqlx::query_as::<_, ReleaseRow>(&query)
            .bind(collection_id)
            .bind(name)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let marked = sqlx::query(
            "UPDATE content_versions v SET is_release_end = true \
             FROM contents c \
             WHERE c.collection_id = $1 \
               AND v.content_id = c.id \
               AND v.version_number = c.current_version",
        )
        .bind(collection_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE collections SET current_release = $2 WHERE id = $1")
            .bind(collection_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(DeclaredRelease {
            release,
            closed_release,
            versions_marked: marked.rows_affected(),
        }))
    }
}
