//! Advisory hierarchical resource locks.
//!
//! Locks are checked by callers before they mutate; storage does not enforce
//! them. Acquisition is first-writer-wins with no queue: a blocked caller
//! gets an immediate error and never waits.

use std::sync::Arc;

use vellum_core::content::{find_element, Actor};
use vellum_core::error::CoreError;
use vellum_core::locking::{
    first_blocking_lock, guarding_resources, normalize_reason, Lock, LockedResource, NewLock,
    ResourceRef,
};
use vellum_core::store::Store;
use vellum_core::types::DbId;

/// Attempts to insert a lock when the holder vanishes between our insert and
/// the lookup of who holds it.
const ACQUIRE_ATTEMPTS: u32 = 3;

/// Acquires, releases and checks resource locks.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn Store>,
}

impl LockManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Lock a resource for `actor`.
    ///
    /// Re-acquiring a lock the actor already holds returns the existing lock.
    /// A lock held by anyone else fails with [`CoreError::LockConflict`],
    /// which carries the holder's lock.
    pub async fn acquire_lock(
        &self,
        resource: &ResourceRef,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Lock, CoreError> {
        resource.validate()?;
        let reason = normalize_reason(reason)?;
        let collection_id = self.resolve_collection(resource, true).await?;

        let input = NewLock {
            resource: resource.clone(),
            collection_id,
            locked_by: actor.id,
            locked_by_name: actor.name.clone(),
            reason,
        };

        for _ in 0..ACQUIRE_ATTEMPTS {
            if let Some(lock) = self.store.insert_lock(&input).await? {
                tracing::info!(
                    resource_type = %lock.resource_type,
                    resource_id = %lock.resource_id,
                    actor_id = actor.id,
                    "Lock acquired"
                );
                return Ok(lock);
            }

            // Lock already held -- fetch holder info.
            match self.get_lock(resource).await? {
                Some(existing) if existing.locked_by == actor.id => return Ok(existing),
                Some(existing) => {
                    tracing::debug!(
                        resource = %resource,
                        holder_id = existing.locked_by,
                        actor_id = actor.id,
                        "Lock denied"
                    );
                    return Err(CoreError::LockConflict(Box::new(existing)));
                }
                // Released between our insert and the lookup; try again.
                None => continue,
            }
        }

        Err(CoreError::Conflict(format!(
            "Lock on {resource} is contended; try again"
        )))
    }

    /// Release a lock.
    ///
    /// Only the holder may release, unless `force` is set by a caller that
    /// has already established privileged override rights. Returns `false`
    /// when the resource was not locked.
    pub async fn release_lock(
        &self,
        resource: &ResourceRef,
        actor: &Actor,
        force: bool,
    ) -> Result<bool, CoreError> {
        resource.validate()?;

        let Some(existing) = self.get_lock(resource).await? else {
            return Ok(false);
        };

        if existing.locked_by != actor.id && !force {
            return Err(CoreError::Forbidden(format!(
                "{resource} is locked by {} (user {}); only the holder or a privileged \
                 override may release it",
                existing.locked_by_name, existing.locked_by
            )));
        }

        // Conditional on the holder we saw, so a lock re-acquired in between
        // by someone else survives.
        let released = self
            .store
            .delete_lock(
                existing.resource_type,
                &existing.resource_id,
                existing.locked_by,
            )
            .await?;

        if released && existing.locked_by != actor.id {
            tracing::warn!(
                resource = %resource,
                holder_id = existing.locked_by,
                actor_id = actor.id,
                "Lock force-released"
            );
        } else if released {
            tracing::info!(resource = %resource, actor_id = actor.id, "Lock released");
        }
        Ok(released)
    }

    /// Fail with [`CoreError::ResourceLocked`] if the resource, or any
    /// resource above it, is locked by someone other than `actor`.
    ///
    /// The error names the level the blocking lock sits on: the resource
    /// itself, its content, or its collection.
    pub async fn ensure_modifiable(
        &self,
        resource: &ResourceRef,
        actor: &Actor,
    ) -> Result<(), CoreError> {
        match self.blocking_lock(resource, actor).await? {
            None => Ok(()),
            Some(blocking) => {
                tracing::debug!(
                    resource = %resource,
                    source_level = %blocking.source_level,
                    holder_id = blocking.locked_by,
                    actor_id = actor.id,
                    "Modification blocked by lock"
                );
                Err(CoreError::ResourceLocked(Box::new(blocking)))
            }
        }
    }

    /// The nearest lock that would block `actor` from modifying `resource`.
    pub async fn blocking_lock(
        &self,
        resource: &ResourceRef,
        actor: &Actor,
    ) -> Result<Option<LockedResource>, CoreError> {
        resource.validate()?;
        let collection_id = self.resolve_collection(resource, false).await?;

        let mut levels = Vec::new();
        for (source, guard) in guarding_resources(resource, collection_id) {
            levels.push((source, self.get_lock(&guard).await?));
        }
        Ok(first_blocking_lock(&levels, actor.id))
    }

    /// The active lock on exactly this resource, if any.
    pub async fn get_lock(&self, resource: &ResourceRef) -> Result<Option<Lock>, CoreError> {
        Ok(self
            .store
            .find_lock(resource.resource_type(), &resource.resource_id())
            .await?)
    }

    /// Every lock held on the collection or anything inside it.
    pub async fn list_locks(&self, collection_id: DbId) -> Result<Vec<Lock>, CoreError> {
        if self.store.find_collection(collection_id).await?.is_none() {
            return Err(CoreError::not_found("collection", collection_id));
        }
        Ok(self.store.list_locks(collection_id).await?)
    }

    /// The collection a resource lives in. Verifies the collection or content
    /// exists; with `require_element`, also that an element exists in its
    /// content's current tree (a check for an element about to be created
    /// must not require that).
    async fn resolve_collection(
        &self,
        resource: &ResourceRef,
        require_element: bool,
    ) -> Result<DbId, CoreError> {
        match resource {
            ResourceRef::Collection { id } => {
                self.store
                    .find_collection(*id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("collection", id))?;
                Ok(*id)
            }
            ResourceRef::Content { id } => {
                let content = self
                    .store
                    .find_content(*id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("content", id))?;
                Ok(content.collection_id)
            }
            ResourceRef::Element {
                content_id,
                element_id,
            } => {
                let content = self
                    .store
                    .find_content(*content_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("content", content_id))?;
                if require_element && find_element(&content.elements, element_id).is_none() {
                    return Err(CoreError::not_found("element", element_id));
                }
                Ok(content.collection_id)
            }
        }
    }
}
