//! Storage interfaces the engine is built against.
//!
//! Implementations must honour the atomicity each method documents; the
//! engine relies on it for gap-free version numbers and for well-defined
//! release boundaries under concurrent writers.

use async_trait::async_trait;

use crate::content::{ContentChanges, ContentEntity, NewContent};
use crate::error::StoreError;
use crate::locking::{Lock, NewLock, ResourceType};
use crate::purge::PurgePolicy;
use crate::releases::{Collection, ReleaseBoundary, TagFilter};
use crate::types::{DbId, VersionNumber};
use crate::versioning::{NewVersion, VersionRecord};

/// Collections and their release lists.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn insert_collection(&self, name: &str) -> Result<Collection, StoreError>;

    async fn find_collection(&self, id: DbId) -> Result<Option<Collection>, StoreError>;
}

/// The mutable content heads.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a draft head with `current_version = 0`.
    async fn insert_content(&self, input: &NewContent) -> Result<ContentEntity, StoreError>;

    async fn find_content(&self, id: DbId) -> Result<Option<ContentEntity>, StoreError>;

    /// Apply the `Some` fields of `changes`. `None` if the content does not exist.
    async fn update_content(
        &self,
        id: DbId,
        changes: &ContentChanges,
    ) -> Result<Option<ContentEntity>, StoreError>;

    /// Replace the type and data of one element of the head's tree, reading
    /// and writing the tree as one atomic step. `None` if the content does not
    /// exist.
    async fn replace_element(
        &self,
        id: DbId,
        element_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<Option<ElementUpdate>, StoreError>;

    /// Content ids of a collection in ascending order, strictly after `after`.
    async fn list_content_ids(
        &self,
        collection_id: DbId,
        after: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<DbId>, StoreError>;
}

/// Outcome of [`ContentStore::replace_element`] on an existing content.
#[derive(Debug, Clone)]
pub enum ElementUpdate {
    Replaced(ContentEntity),
    /// No element with that id in the current tree; nothing was written.
    ElementMissing,
}

/// The append-only version records.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// In one atomic step: increment the content's `current_version`, snapshot
    /// the head as it stands at that moment, insert the record under that
    /// number tagged with the collection's current release, and return it.
    /// Head writes racing with the step land wholly before or after it. Must be serialized against
    /// [`ReleaseRepository::declare_release`] for the same collection.
    ///
    /// `None` if the content does not exist. A collision on
    /// `(content_id, version_number)` is reported as
    /// [`StoreError::UniqueViolation`].
    async fn append_version(&self, input: &NewVersion) -> Result<Option<VersionRecord>, StoreError>;

    async fn find_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
    ) -> Result<Option<VersionRecord>, StoreError>;

    /// Versions ascending by number, strictly after `after`, at most `limit`.
    async fn list_versions(
        &self,
        content_id: DbId,
        after: Option<VersionNumber>,
        limit: i64,
    ) -> Result<Vec<VersionRecord>, StoreError>;

    /// Highest-numbered version whose release tag matches `tags`.
    async fn find_latest_tagged(
        &self,
        content_id: DbId,
        tags: &TagFilter,
    ) -> Result<Option<VersionRecord>, StoreError>;

    /// Number of purgeable versions among the given contents.
    async fn count_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError>;

    /// Delete the purgeable versions among the given contents as one unit.
    async fn delete_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError>;
}

/// Release declaration.
#[async_trait]
pub trait ReleaseRepository: Send + Sync {
    /// Atomically, with every other writer to the collection excluded: flag
    /// the latest version of every content in the collection as a release
    /// end, append the release, and make it current.
    ///
    /// `None` if the collection does not exist. A duplicate name is reported
    /// as [`StoreError::UniqueViolation`] with no state change.
    async fn declare_release(
        &self,
        collection_id: DbId,
        name: &str,
        created_by: DbId,
    ) -> Result<Option<ReleaseBoundary>, StoreError>;
}

/// Resource lock rows.
#[async_trait]
pub trait LockRepository: Send + Sync {
    /// Insert unless a lock on the same resource exists. `None` on conflict.
    async fn insert_lock(&self, input: &NewLock) -> Result<Option<Lock>, StoreError>;

    async fn find_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Option<Lock>, StoreError>;

    /// Delete the lock if it is still held by `locked_by`. Returns `true` if
    /// a row was removed.
    async fn delete_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        locked_by: DbId,
    ) -> Result<bool, StoreError>;

    /// All locks whose resource belongs to the collection.
    async fn list_locks(&self, collection_id: DbId) -> Result<Vec<Lock>, StoreError>;
}

/// Everything the engine needs from one back end.
pub trait Store:
    CollectionStore + ContentStore + VersionRepository + ReleaseRepository + LockRepository
{
}

impl<T> Store for T where
    T: CollectionStore + ContentStore + VersionRepository + ReleaseRepository + LockRepository
{
}
