//! Repository for the `content_versions` table.
//!
//! Version records are immutable once inserted. Only purges delete them and
//! only release declaration flips `is_release_end`.

use sqlx::types::Json;
use sqlx::PgPool;
use vellum_core::content::{Element, Snapshot};
use vellum_core::types::{DbId, VersionNumber};
use vellum_core::versioning::NewVersion;

use crate::models::version::VersionRow;

/// Column list for `content_versions` queries.
const COLUMNS: &str = "id, content_id, version_number, snapshot, release, is_release_end, \
                       change_note, created_by, created_by_name, created_at";

/// Shared predicate selecting purgeable versions of the contents in `$1`,
/// with `$2` = keep version 1. Expects `content_versions v` and `contents c`.
const PURGEABLE: &str = "c.id = v.content_id \
                         AND v.content_id = ANY($1) \
                         AND v.is_release_end = false \
                         AND v.version_number <> c.current_version \
                         AND NOT ($2 AND v.version_number = 1)";

/// Provides append, read and purge operations for version records.
pub struct VersionRepo;

impl VersionRepo {
    /// Allocate the next number, snapshot the head and insert the record in
    /// one transaction.
    ///
    /// Takes a `FOR SHARE` lock on the owning collection row so a concurrent
    /// release declaration (which takes `FOR UPDATE`) sees this version
    /// either fully committed or not at all. The number comes from an
    /// atomic increment of `contents.current_version`; the same statement
    /// returns the head's versioned columns, and the row lock it takes keeps
    /// other head writes out until commit.
    ///
    /// Returns `None` if the content does not exist.
    pub async fn append(pool: &PgPool, input: &NewVersion) -> Result<Option<VersionRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let release: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT col.current_release \
             FROM contents c \
             JOIN collections col ON col.id = c.collection_id \
             WHERE c.id = $1 \
             FOR SHARE OF col",
        )
        .bind(input.content_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((release,)) = release else {
            return Ok(None);
        };

        let (version_number, title, metadata, Json(elements)): (
            VersionNumber,
            String,
            serde_json::Value,
            Json<Vec<Element>>,
        ) = sqlx::query_as(
            "UPDATE contents SET current_version = current_version + 1 \
             WHERE id = $1 \
             RETURNING current_version, title, metadata, elements",
        )
        .bind(input.content_id)
        .fetch_one(&mut *tx)
        .await?;
        let snapshot = Snapshot {
            title,
            metadata,
            elements,
        };

        let query = format!(
            "INSERT INTO content_versions \
                (content_id, version_number, snapshot, release, change_note, created_by, created_by_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, VersionRow>(&query)
            .bind(input.content_id)
            .bind(version_number)
            .bind(Json(&snapshot))
            .bind(&release)
            .bind(&input.change_note)
            .bind(input.created_by)
            .bind(&input.created_by_name)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    pub async fn find(
        pool: &PgPool,
        content_id: DbId,
        version_number: VersionNumber,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions \
             WHERE content_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(content_id)
            .bind(version_number)
            .fetch_optional(pool)
            .await
    }

    /// Keyset page of a content's versions, ascending by number.
    pub async fn list_after(
        pool: &PgPool,
        content_id: DbId,
        after: Option<VersionNumber>,
        limit: i64,
    ) -> Result<Vec<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions \
             WHERE content_id = $1 AND ($2::INTEGER IS NULL OR version_number > $2) \
             ORDER BY version_number ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(content_id)
            .bind(after)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Highest-numbered version whose release tag is one of `names`, or is
    /// unset when `include_untagged` is true.
    pub async fn find_latest_tagged(
        pool: &PgPool,
        content_id: DbId,
        include_untagged: bool,
        names: &[String],
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_versions \
             WHERE content_id = $1 \
               AND ((release IS NULL AND $2) OR release = ANY($3)) \
             ORDER BY version_number DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(content_id)
            .bind(include_untagged)
            .bind(names)
            .fetch_optional(pool)
            .await
    }

    /// Number of versions a purge of these contents would delete.
    pub async fn count_purgeable(
        pool: &PgPool,
        content_ids: &[DbId],
        keep_initial_version: bool,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM content_versions v, contents c \
             WHERE {PURGEABLE}"
        );
        let (count,): (i64,) = sqlx::query_as(&query)
            .bind(content_ids)
            .bind(keep_initial_version)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Delete the purgeable versions of these contents in one statement.
    pub async fn delete_purgeable(
        pool: &PgPool,
        content_ids: &[DbId],
        keep_initial_version: bool,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "DELETE FROM content_versions v USING contents c \
             WHERE {PURGEABLE}"
        );
        let result = sqlx::query(&query)
            .bind(content_ids)
            .bind(keep_initial_version)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
