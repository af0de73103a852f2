//! Repository for the `resource_locks` table.

use sqlx::PgPool;
use vellum_core::locking::NewLock;
use vellum_core::types::DbId;

use crate::models::lock::LockRow;

/// Column list for `resource_locks` queries.
const COLUMNS: &str = "id, resource_type, resource_id, collection_id, content_id, \
                       locked_by, locked_by_name, reason, locked_at";

/// Provides acquire, lookup and release operations for resource locks.
pub struct LockRepo;

impl LockRepo {
    /// Attempt to insert a lock.
    ///
    /// Uses `INSERT ... ON CONFLICT DO NOTHING` against the unique
    /// `(resource_type, resource_id)` constraint. Returns `None` if the
    /// resource is already locked.
    pub async fn acquire(pool: &PgPool, input: &NewLock) -> Result<Option<LockRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO resource_locks \
                (resource_type, resource_id, collection_id, content_id, locked_by, locked_by_name, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (resource_type, resource_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LockRow>(&query)
            .bind(input.resource.resource_type().as_str())
            .bind(input.resource.resource_id())
            .bind(input.collection_id)
            .bind(input.content_id())
            .bind(input.locked_by)
            .bind(&input.locked_by_name)
            .bind(&input.reason)
            .fetch_optional(pool)
            .await
    }

    /// The lock on a resource, or `None` if unlocked.
    pub async fn find(
        pool: &PgPool,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<LockRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = $2"
        );
        sqlx::query_as::<_, LockRow>(&query)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a lock if it is still held by `locked_by`.
    ///
    /// Returns `true` if a lock was removed.
    pub async fn release(
        pool: &PgPool,
        resource_type: &str,
        resource_id: &str,
        locked_by: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM resource_locks \
             WHERE resource_type = $1 AND resource_id = $2 AND locked_by = $3",
        )
        .bind(resource_type)
        .bind(resource_id)
        .bind(locked_by)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All locks within a collection, oldest first.
    pub async fn list_by_collection(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<LockRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resource_locks \
             WHERE collection_id = $1 \
             ORDER BY locked_at ASC, id ASC"
        );
        sqlx::query_as::<_, LockRow>(&query)
            .bind(collection_id)
            .fetch_all(pool)
            .await
    }
}
