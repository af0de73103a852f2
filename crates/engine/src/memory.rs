//! Process-local implementation of the storage traits.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every trait method is a
//! single critical section. That gives version allocation and release
//! declaration the same atomicity the PostgreSQL store gets from row locks.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use vellum_core::content::{
    replace_element, ContentChanges, ContentEntity, ContentStatus, NewContent,
};
use vellum_core::error::StoreError;
use vellum_core::locking::{Lock, NewLock, ResourceType};
use vellum_core::purge::{is_purgeable, PurgePolicy};
use vellum_core::releases::{Collection, Release, ReleaseBoundary, TagFilter};
use vellum_core::store::{
    CollectionStore, ContentStore, ElementUpdate, LockRepository, ReleaseRepository,
    VersionRepository,
};
use vellum_core::types::{DbId, VersionNumber};
use vellum_core::versioning::{NewVersion, VersionRecord};

#[derive(Default)]
struct State {
    next_collection_id: DbId,
    next_content_id: DbId,
    next_version_id: DbId,
    collections: BTreeMap<DbId, Collection>,
    contents: BTreeMap<DbId, ContentEntity>,
    /// Keyed by `(content_id, version_number)`, so ranges walk one content in order.
    versions: BTreeMap<(DbId, VersionNumber), VersionRecord>,
    locks: HashMap<(ResourceType, String), Lock>,
}

impl State {
    fn purgeable_keys(&self, content_ids: &[DbId], policy: PurgePolicy) -> Vec<(DbId, VersionNumber)> {
        content_ids
            .iter()
            .filter_map(|id| self.contents.get(id))
            .flat_map(|content| {
                self.versions
                    .range((content.id, VersionNumber::MIN)..=(content.id, VersionNumber::MAX))
                    .filter(move |(_, v)| {
                        is_purgeable(
                            v.version_number,
                            v.is_release_end,
                            content.current_version,
                            policy,
                        )
                    })
                    .map(|(key, _)| *key)
            })
            .collect()
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of version records held, across all contents.
    pub async fn version_count(&self) -> usize {
        self.state.lock().await.versions.len()
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn insert_collection(&self, name: &str) -> Result<Collection, StoreError> {
        let mut state = self.state.lock().await;
        if state.collections.values().any(|c| c.name == name) {
            return Err(StoreError::UniqueViolation("uq_collections_name".into()));
        }
        state.next_collection_id += 1;
        let now = Utc::now();
        let collection = Collection {
            id: state.next_collection_id,
            name: name.to_string(),
            current_release: None,
            releases: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn find_collection(&self, id: DbId) -> Result<Option<Collection>, StoreError> {
        Ok(self.state.lock().await.collections.get(&id).cloned())
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn insert_content(&self, input: &NewContent) -> Result<ContentEntity, StoreError> {
        let mut state = self.state.lock().await;
        if !state.collections.contains_key(&input.collection_id) {
            return Err(StoreError::Backend(format!(
                "collection {} does not exist",
                input.collection_id
            )));
        }
        state.next_content_id += 1;
        let now = Utc::now();
        let content = ContentEntity {
            id: state.next_content_id,
            collection_id: input.collection_id,
            title: input.title.clone(),
            metadata: input.metadata.clone(),
            elements: input.elements.clone(),
            status: ContentStatus::Draft,
            current_version: 0,
            created_at: now,
            updated_at: now,
        };
        state.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn find_content(&self, id: DbId) -> Result<Option<ContentEntity>, StoreError> {
        Ok(self.state.lock().await.contents.get(&id).cloned())
    }

    async fn update_content(
        &self,
        id: DbId,
        changes: &ContentChanges,
    ) -> Result<Option<ContentEntity>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(content) = state.contents.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            content.title = title.clone();
        }
        if let Some(metadata) = &changes.metadata {
            content.metadata = metadata.clone();
        }
        if let Some(elements) = &changes.elements {
            content.elements = elements.clone();
        }
        if let Some(status) = changes.status {
            content.status = status;
        }
        content.updated_at = Utc::now();
        Ok(Some(content.clone()))
    }

    async fn replace_element(
        &self,
        id: DbId,
        element_id: &str,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<Option<ElementUpdate>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(content) = state.contents.get_mut(&id) else {
            return Ok(None);
        };
        if !replace_element(&mut content.elements, element_id, kind, data) {
            return Ok(Some(ElementUpdate::ElementMissing));
        }
        content.updated_at = Utc::now();
        Ok(Some(ElementUpdate::Replaced(content.clone())))
    }

    async fn list_content_ids(
        &self,
        collection_id: DbId,
        after: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<DbId>, StoreError> {
        let state = self.state.lock().await;
        let start = after.map_or(DbId::MIN, |a| a.saturating_add(1));
        Ok(state
            .contents
            .range(start..)
            .filter(|(_, c)| c.collection_id == collection_id)
            .take(limit.max(0) as usize)
            .map(|(id, _)| *id)
            .collect())
    }
}

#[async_trait]
impl VersionRepository for InMemoryStore {
    async fn append_version(&self, input: &NewVersion) -> Result<Option<VersionRecord>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(content) = state.contents.get(&input.content_id) else {
            return Ok(None);
        };
        let collection_id = content.collection_id;
        let version_number = content.current_version + 1;
        let snapshot = content.snapshot();
        if state.versions.contains_key(&(input.content_id, version_number)) {
            return Err(StoreError::UniqueViolation(
                "uq_content_versions_content_number".into(),
            ));
        }
        let release = state
            .collections
            .get(&collection_id)
            .and_then(|c| c.current_release.clone());

        state.next_version_id += 1;
        let record = VersionRecord {
            id: state.next_version_id,
            content_id: input.content_id,
            version_number,
            snapshot,
            release,
            is_release_end: false,
            change_note: input.change_note.clone(),
            created_by: input.created_by,
            created_by_name: input.created_by_name.clone(),
            created_at: Utc::now(),
        };
        state
            .versions
            .insert((input.content_id, version_number), record.clone());
        if let Some(content) = state.contents.get_mut(&input.content_id) {
            content.current_version = version_number;
        }
        Ok(Some(record))
    }

    async fn find_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
    ) -> Result<Option<VersionRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .versions
            .get(&(content_id, version_number))
            .cloned())
    }

    async fn list_versions(
        &self,
        content_id: DbId,
        after: Option<VersionNumber>,
        limit: i64,
    ) -> Result<Vec<VersionRecord>, StoreError> {
        let state = self.state.lock().await;
        let start = after.map_or(VersionNumber::MIN, |a| a.saturating_add(1));
        Ok(state
            .versions
            .range((content_id, start)..=(content_id, VersionNumber::MAX))
            .take(limit.max(0) as usize)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn find_latest_tagged(
        &self,
        content_id: DbId,
        tags: &TagFilter,
    ) -> Result<Option<VersionRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .range((content_id, VersionNumber::MIN)..=(content_id, VersionNumber::MAX))
            .rev()
            .map(|(_, v)| v)
            .find(|v| tags.matches(v.release.as_deref()))
            .cloned())
    }

    async fn count_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.purgeable_keys(content_ids, policy).len() as u64)
    }

    async fn delete_purgeable(
        &self,
        content_ids: &[DbId],
        policy: PurgePolicy,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let keys = state.purgeable_keys(content_ids, policy);
        for key in &keys {
            state.versions.remove(key);
        }
        Ok(keys.len() as u64)
    }
}

#[async_trait]
impl ReleaseRepository for InMemoryStore {
    async fn declare_release(
        &self,
        collection_id: DbId,
        name: &str,
        created_by: DbId,
    ) -> Result<Option<ReleaseBoundary>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(collection) = state.collections.get(&collection_id) else {
            return Ok(None);
        };
        if collection.has_release(name) {
            return Err(StoreError::UniqueViolation(
                "uq_releases_collection_name".into(),
            ));
        }
        let closed_release = collection.current_release.clone();

        let latest: Vec<(DbId, VersionNumber)> = state
            .contents
            .values()
            .filter(|c| c.collection_id == collection_id && c.current_version > 0)
            .map(|c| (c.id, c.current_version))
            .collect();
        let mut versions_marked = 0;
        for key in latest {
            if let Some(version) = state.versions.get_mut(&key) {
                version.is_release_end = true;
                versions_marked += 1;
            }
        }

        let now = Utc::now();
        let release = Release {
            name: name.to_string(),
            created_at: now,
            created_by,
        };
        if let Some(collection) = state.collections.get_mut(&collection_id) {
            collection.releases.push(release.clone());
            collection.current_release = Some(name.to_string());
            collection.updated_at = now;
        }

        Ok(Some(ReleaseBoundary {
            collection_id,
            release,
            closed_release,
            versions_marked,
        }))
    }
}

#[async_trait]
impl LockRepository for InMemoryStore {
    async fn insert_lock(&self, input: &NewLock) -> Result<Option<Lock>, StoreError> {
        let mut state = self.state.lock().await;
        let key = (input.resource.resource_type(), input.resource.resource_id());
        if state.locks.contains_key(&key) {
            return Ok(None);
        }
        let lock = Lock {
            resource_type: key.0,
            resource_id: key.1.clone(),
            collection_id: input.collection_id,
            content_id: input.content_id(),
            locked_by: input.locked_by,
            locked_by_name: input.locked_by_name.clone(),
            locked_at: Utc::now(),
            reason: input.reason.clone(),
        };
        state.locks.insert(key, lock.clone());
        Ok(Some(lock))
    }

    async fn find_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Option<Lock>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .locks
            .get(&(resource_type, resource_id.to_string()))
            .cloned())
    }

    async fn delete_lock(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        locked_by: DbId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let key = (resource_type, resource_id.to_string());
        let held = state
            .locks
            .get(&key)
            .is_some_and(|lock| lock.locked_by == locked_by);
        if held {
            state.locks.remove(&key);
        }
        Ok(held)
    }

    async fn list_locks(&self, collection_id: DbId) -> Result<Vec<Lock>, StoreError> {
        let state = self.state.lock().await;
        let mut locks: Vec<Lock> = state
            .locks
            .values()
            .filter(|l| l.collection_id == collection_id)
            .cloned()
            .collect();
        locks.sort_by(|a, b| a.locked_at.cmp(&b.locked_at));
        Ok(locks)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vellum_core::content::{Element, Snapshot};

    use super::*;

    async fn seeded() -> (InMemoryStore, DbId, DbId) {
        let store = InMemoryStore::new();
        let collection = store.insert_collection("Docs").await.unwrap();
        let content = store
            .insert_content(&NewContent {
                collection_id: collection.id,
                title: "Home".into(),
                metadata: json!({}),
                elements: Vec::new(),
            })
            .await
            .unwrap();
        (store, collection.id, content.id)
    }

    fn new_version(content_id: DbId) -> NewVersion {
        NewVersion {
            content_id,
            change_note: None,
            created_by: 1,
            created_by_name: "alice".into(),
        }
    }

    #[tokio::test]
    async fn append_allocates_from_current_version() {
        let (store, _, content_id) = seeded().await;
        let v1 = store.append_version(&new_version(content_id)).await.unwrap().unwrap();
        let v2 = store.append_version(&new_version(content_id)).await.unwrap().unwrap();
        assert_eq!((v1.version_number, v2.version_number), (1, 2));
        let content = store.find_content(content_id).await.unwrap().unwrap();
        assert_eq!(content.current_version, 2);
    }

    #[tokio::test]
    async fn append_snapshots_the_head_at_allocation() {
        let (store, _, content_id) = seeded().await;
        let changes = ContentChanges {
            title: Some("Landing".into()),
            ..Default::default()
        };
        store.update_content(content_id, &changes).await.unwrap();

        let v1 = store.append_version(&new_version(content_id)).await.unwrap().unwrap();
        assert_eq!(
            v1.snapshot,
            Snapshot {
                title: "Landing".into(),
                metadata: json!({}),
                elements: Vec::new(),
            }
        );
    }

    #[tokio::test]
    async fn replace_element_patches_the_stored_tree() {
        let (store, collection_id, _) = seeded().await;
        let content = store
            .insert_content(&NewContent {
                collection_id,
                title: "Post".into(),
                metadata: json!({}),
                elements: vec![Element::new("lead", "paragraph", json!({"text": "Hi"}))],
            })
            .await
            .unwrap();

        let update = store
            .replace_element(content.id, "lead", "quote", &json!({"text": "Yo"}))
            .await
            .unwrap();
        assert!(matches!(
            update,
            Some(ElementUpdate::Replaced(ref head)) if head.elements[0].kind == "quote"
        ));

        let missing = store
            .replace_element(content.id, "ghost", "quote", &json!({}))
            .await
            .unwrap();
        assert!(matches!(missing, Some(ElementUpdate::ElementMissing)));
        assert!(store
            .replace_element(999, "lead", "quote", &json!({}))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn append_to_missing_content_is_none() {
        let (store, _, _) = seeded().await;
        assert!(store.append_version(&new_version(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_content_ids_pages_by_key() {
        let (store, collection_id, first) = seeded().await;
        let second = store
            .insert_content(&NewContent {
                collection_id,
                title: "About".into(),
                metadata: json!({}),
                elements: Vec::new(),
            })
            .await
            .unwrap();
        let page = store.list_content_ids(collection_id, None, 1).await.unwrap();
        assert_eq!(page, vec![first]);
        let page = store.list_content_ids(collection_id, Some(first), 10).await.unwrap();
        assert_eq!(page, vec![second.id]);
    }

    #[tokio::test]
    async fn duplicate_release_leaves_state_untouched() {
        let (store, collection_id, content_id) = seeded().await;
        store.append_version(&new_version(content_id)).await.unwrap();
        store.declare_release(collection_id, "v1", 1).await.unwrap();
        let err = store.declare_release(collection_id, "v1", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        let collection = store.find_collection(collection_id).await.unwrap().unwrap();
        assert_eq!(collection.releases.len(), 1);
    }

    #[tokio::test]
    async fn delete_lock_requires_matching_holder() {
        let (store, collection_id, content_id) = seeded().await;
        let lock = NewLock {
            resource: vellum_core::locking::ResourceRef::content(content_id),
            collection_id,
            locked_by: 1,
            locked_by_name: "alice".into(),
            reason: None,
        };
        assert!(store.insert_lock(&lock).await.unwrap().is_some());
        assert!(store.insert_lock(&lock).await.unwrap().is_none());
        let id = content_id.to_string();
        assert!(!store.delete_lock(ResourceType::Content, &id, 2).await.unwrap());
        assert!(store.delete_lock(ResourceType::Content, &id, 1).await.unwrap());
    }
}
