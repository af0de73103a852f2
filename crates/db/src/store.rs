//! [`PgStore`]: the engine's storage traits over PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use vellum_core::content::{ContentChanges, ContentEntity, NewContent};
use vellum_core::error::StoreError;
use vellum_core::locking::{Lock, NewLock, ResourceType};
use vellum_core::purge::PurgePolicy;
use vellum_core::releases::{Collection, ReleaseBoundary, TagFilter};
use vellum_core::store::{
    CollectionStore, ContentStore, ElementUpdate, LockRepository, ReleaseRepository,
    VersionRepository,
};
use vellum_core::types::{DbId, VersionNumber};
use vellum_core::versioning::{NewVersion, VersionRecord};

use crate::repositories::{CollectionRepo, ContentRepo, LockRepo, ReleaseRepo, VersionRepo};

/// PostgreSQL error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Storage back end over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Classify a `sqlx` error for the engine. Only unique violations are
/// distinguished; they carry the constraint name.
fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return StoreError::UniqueViolation(constraint.to_string());
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl CollectionStore for PgStore {
    async fn insert_collection(&self, name: &str) -> Result<Collection, StoreError> {
        let row = CollectionRepo::create(&self.pool, name)
            .await
            .map_err(store_error)?;
        Ok(row.into_collection(Vec::new()))
    }

    async fn find_collection(&self, id: DbId) -> Result<Option<Collection>, StoreError> {
        let Some(row) = CollectionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        let releases = CollectionRepo::list_releases(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(Some(row.into_collection(releases)))
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn insert_content(&self, input: &NewContent) -> Result<ContentEntity, StoreError> {
        ContentRepo::create(&self.pool, input)
            .await
            .map_err(store_error)?
            .try_into()
    }

    async fn find_content(&self, id: DbId) -> Result<Option<ContentEntity>, StoreError> {
        ContentRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
            .map(ContentEntity::try_from)
            .transpose()
    }

    async fn update_content(
        &self,
        id: DbId,
        changes: &ContentChanges,
    ) -> Result<Option<ContentEntity>, StoreError> {
        ContentRepo::update(&self.pool, id, changes)
            .await
            .map_err(store_error)?
            .map(ContentEntity::try_from)
            .transpose()
    }

    async fn replace_element(
        &self,
        id: DbId,
        element_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<Option<ElementUpdate>, StoreError> {
        let replaced = ContentRepo::replace_element(&self.pool, id, element_id, kind, data)
            .await
            .map_err(store_error)?;
        match replaced {
            None => Ok(None),
            Some(None) => Ok(Some(ElementUpdate::ElementMissing)),
            Some(Some(row)) => Ok(Some(ElementUpdate::Replaced(row.try_into()?))),
        }
    }

    async fn list_content_ids(
        &self,
        collection_id: DbId,
        after: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<DbId>, StoreError> {
        ContentRepo::list_ids(&self.pool, collection_id, after, limit)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl VersionRepository for PgStore {
    async fn append_version(&self, input: &NewVersion) -> Result<Option<VersionRecord>, StoreError> {
        let row = VersionRepo::append(&self.pool, input)
            .await
            .map_err(store_error)?;
        Ok(row.map(VersionRecord::from))
    }

    async fn find_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
    ) -> Result<Option<VersionRecord>, StoreError> {
        let row = VersionRepo::find(&self.pool, content_id, version_number)
            .await
            .map_err(store_error)?;
        Ok(row.map(VersionRecord::from))
    }

    async fn list_versions(
        &self,
        content_id: DbId,
        after: Option<VersionNumber>,
        limit: i64,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        let rows = VersionRepo::list_after(&self.pool, content_id, after, limit)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(VersionRecord::from).collect())
    }

    async fn find_latest_tagged(
        &self,
        content_id: DbId,
        tags: &TagFilter,
    ) -> Result<Option<VersionRecord>, StoreError> {
        let row =
            VersionRepo::find_latest_tagged(&self.pool, content_id, tags.include_untagged, &tags.names)
                .await
                .map_err(store_error)?;
        Ok(row.map(VersionRecord::from))
    }

    async fn count_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError> {
        let count =
            VersionRepo::count_purgeable(&self.pool, content_ids, policy.keep_initial_version)
                .await
                .map_err(store_error)?;
        Ok(count.max(0) as u64)
    }

    async fn delete_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError> {
        VersionRepo::delete_purgeable(&self.pool, content_ids, policy.keep_initial_version)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl ReleaseRepository for PgStore {
    async fn declare_release(
        &self,
        collection_id: DbId,
        name: &str,
        created_by: DbId,
    ) -> Result<Option<ReleaseBoundary>, StoreError> {
        let declared = ReleaseRepo::declare(&self.pool, collection_id, name, created_by)
            .await
            .map_err(store_error)?;
        Ok(declared.map(|d| ReleaseBoundary {
            collection_id,
            release: d.release.into(),
            closed_release: d.closed_release,
            versions_marked: d.versions_marked,
        }))
    }
}

#[async_trait]
impl LockRepository for PgStore {
    async fn insert_lock(&self, input: &NewLock) -> Result<Option<Lock>, StoreError> {
        LockRepo::acquire(&self.pool, input)
            .await
            .map_err(store_error)?
            .map(Lock::try_from)
            .transpose()
    }

    async fn find_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Option<Lock>, StoreError> {
        LockRepo::find(&self.pool, resource_type.as_str(), resource_id)
            .await
            .map_err(store_error)?
            .map(Lock::try_from)
            .transpose()
    }

    async fn delete_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        locked_by: DbId,
    ) -> Result<bool, StoreError> {
        LockRepo::release(&self.pool, resource_type.as_str(), resource_id, locked_by)
            .await
            .map_err(store_error)
    }

    async fn list_locks(&self, collection_id: DbId) -> Result<Vec<Lock>, StoreError> {
        LockRepo::list_by_collection(&self.pool, collection_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Lock::try_from)
            .collect()
    }
}
