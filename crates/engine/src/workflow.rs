//! Lock-checked content mutations that always leave a version behind.
//!
//! Every operation runs the same three steps in order: check that the actor
//! may modify the target, write the content head, snapshot it as a new
//! version. A failing step stops the sequence; nothing after it runs.

use std::sync::Arc;

use serde::Serialize;

use vellum_core::content::{
    validate_changes, validate_new_content, Actor, ContentChanges, ContentEntity, ContentStatus,
    NewContent,
};
use vellum_core::error::{CoreError, StoreError};
use vellum_core::locking::ResourceRef;
use vellum_core::releases::{validate_collection_name, Collection};
use vellum_core::store::{ElementUpdate, Store};
use vellum_core::types::{DbId, VersionNumber};
use vellum_core::versioning::VersionRecord;

use crate::locks::LockManager;
use crate::versions::VersionStore;

/// Change note recorded for the first version of new content.
pub const CREATED_NOTE: &str = "Created";

/// The head after a mutation, and the version that captured it.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation {
    pub content: ContentEntity,
    pub version: VersionRecord,
}

/// Orchestrates lock check, head write and versioning for content edits.
#[derive(Clone)]
pub struct ContentWorkflow {
    store: Arc<dyn Store>,
    locks: LockManager,
    versions: VersionStore,
}

impl ContentWorkflow {
    pub fn new(store: Arc<dyn Store>, locks: LockManager, versions: VersionStore) -> Self {
        Self {
            store,
            locks,
            versions,
        }
    }

    /// Create an empty collection.
    pub async fn create_collection(&self, name: &str) -> Result<Collection, CoreError> {
        validate_collection_name(name)?;
        let collection = match self.store.insert_collection(name).await {
            Ok(collection) => collection,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(CoreError::Conflict(format!(
                    "Collection '{name}' already exists"
                )))
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!(collection_id = collection.id, name, "Collection created");
        Ok(collection)
    }

    /// Create a content in a collection and record its first version.
    ///
    /// Blocked by a lock on the collection.
    pub async fn create_content(
        &self,
        input: NewContent,
        actor: &Actor,
        change_note: Option<&str>,
    ) -> Result<Mutation, CoreError> {
        validate_new_content(&input)?;
        self.locks
            .ensure_modifiable(&ResourceRef::collection(input.collection_id), actor)
            .await?;

        let content = self.store.insert_content(&input).await?;
        tracing::info!(
            content_id = content.id,
            collection_id = content.collection_id,
            actor_id = actor.id,
            "Content created"
        );
        self.record(content, actor, Some(change_note.unwrap_or(CREATED_NOTE)))
            .await
    }

    /// Patch the content head and record the result as a new version.
    pub async fn update_content(
        &self,
        content_id: DbId,
        changes: ContentChanges,
        actor: &Actor,
        change_note: Option<&str>,
    ) -> Result<Mutation, CoreError> {
        validate_changes(&changes)?;
        self.locks
            .ensure_modifiable(&ResourceRef::content(content_id), actor)
            .await?;

        let content = self.apply(content_id, &changes).await?;
        self.record(content, actor, change_note).await
    }

    /// Replace one element's type and data in place.
    ///
    /// Only the element's own lock and the locks above it are consulted, so
    /// two actors can edit different elements of the same content. The store
    /// patches the tree in place, so concurrent edits to sibling elements
    /// both survive.
    pub async fn update_element(
        &self,
        content_id: DbId,
        element_id: &str,
        kind: &str,
        data: serde_json::Value,
        actor: &Actor,
        change_note: Option<&str>,
    ) -> Result<Mutation, CoreError> {
        let target = ResourceRef::element(content_id, element_id);
        target.validate()?;
        if kind.trim().is_empty() {
            return Err(CoreError::Validation(
                "Element type must not be empty".to_string(),
            ));
        }
        self.locks.ensure_modifiable(&target, actor).await?;

        let content = match self
            .store
            .replace_element(content_id, element_id, kind, &data)
            .await?
        {
            Some(ElementUpdate::Replaced(content)) => content,
            Some(ElementUpdate::ElementMissing) => {
                return Err(CoreError::not_found("element", element_id))
            }
            None => return Err(CoreError::not_found("content", content_id)),
        };
        tracing::debug!(content_id, element_id, actor_id = actor.id, "Element updated");
        self.record(content, actor, change_note).await
    }

    /// Move the content to another publication status.
    pub async fn set_status(
        &self,
        content_id: DbId,
        status: ContentStatus,
        actor: &Actor,
    ) -> Result<Mutation, CoreError> {
        self.locks
            .ensure_modifiable(&ResourceRef::content(content_id), actor)
            .await?;

        let changes = ContentChanges {
            status: Some(status),
            ..Default::default()
        };
        let content = self.apply(content_id, &changes).await?;
        tracing::info!(content_id, %status, actor_id = actor.id, "Content status changed");
        let note = format!("Status set to {status}");
        self.record(content, actor, Some(&note)).await
    }

    pub async fn publish(&self, content_id: DbId, actor: &Actor) -> Result<Mutation, CoreError> {
        self.set_status(content_id, ContentStatus::Published, actor)
            .await
    }

    pub async fn unpublish(&self, content_id: DbId, actor: &Actor) -> Result<Mutation, CoreError> {
        self.set_status(content_id, ContentStatus::Draft, actor).await
    }

    pub async fn archive(&self, content_id: DbId, actor: &Actor) -> Result<Mutation, CoreError> {
        self.set_status(content_id, ContentStatus::Archived, actor)
            .await
    }

    /// Lock-checked [`VersionStore::restore_version`].
    pub async fn restore_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
        actor: &Actor,
    ) -> Result<Mutation, CoreError> {
        self.locks
            .ensure_modifiable(&ResourceRef::content(content_id), actor)
            .await?;

        let version = self
            .versions
            .restore_version(content_id, version_number, actor)
            .await?;
        let content = self.load(content_id).await?;
        Ok(Mutation { content, version })
    }

    async fn apply(
        &self,
        content_id: DbId,
        changes: &ContentChanges,
    ) -> Result<ContentEntity, CoreError> {
        self.store
            .update_content(content_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("content", content_id))
    }

    async fn load(&self, content_id: DbId) -> Result<ContentEntity, CoreError> {
        self.store
            .find_content(content_id)
            .await?
            .ok_or_else(|| CoreError::not_found("content", content_id))
    }

    async fn record(
        &self,
        mut content: ContentEntity,
        actor: &Actor,
        change_note: Option<&str>,
    ) -> Result<Mutation, CoreError> {
        let version = self
            .versions
            .create_version(content.id, actor, change_note)
            .await?;
        content.current_version = version.version_number;
        Ok(Mutation { content, version })
    }
}

