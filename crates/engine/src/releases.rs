//! Named release milestones per collection.
//!
//! Declaring a release flags the latest version of every content in the
//! collection as a release end and opens the new release for versions
//! created afterwards. Release ends are what purges preserve.

use std::sync::Arc;

use vellum_core::content::Actor;
use vellum_core::error::{CoreError, StoreError};
use vellum_core::releases::{
    tags_before, validate_release_name, Collection, Release, ReleaseBoundary,
};
use vellum_core::store::Store;
use vellum_core::types::DbId;
use vellum_core::versioning::VersionRecord;

/// Contents read per page when resolving a whole release.
const SNAPSHOT_PAGE_SIZE: i64 = 200;

/// Declares and reads releases.
#[derive(Clone)]
pub struct ReleaseManager {
    store: Arc<dyn Store>,
}

impl ReleaseManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Declare a new release on a collection.
    ///
    /// Fails with [`CoreError::Validation`] for a malformed name and with
    /// [`CoreError::Conflict`] if the collection already has a release of that
    /// name; neither failure changes any state. Name conflicts are never
    /// retried.
    pub async fn create_release(
        &self,
        collection_id: DbId,
        name: &str,
        actor: &Actor,
    ) -> Result<ReleaseBoundary, CoreError> {
        validate_release_name(name)?;

        let collection = self.get_collection(collection_id).await?;
        if collection.has_release(name) {
            return Err(duplicate(collection_id, name));
        }

        // The store re-checks the name under the collection lock; a concurrent
        // declaration of the same name lands here.
        let boundary = match self.store.declare_release(collection_id, name, actor.id).await {
            Ok(Some(boundary)) => boundary,
            Ok(None) => return Err(CoreError::not_found("collection", collection_id)),
            Err(StoreError::UniqueViolation(_)) => return Err(duplicate(collection_id, name)),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            collection_id,
            release = %name,
            closed_release = ?boundary.closed_release,
            versions_marked = boundary.versions_marked,
            actor_id = actor.id,
            "Release created"
        );
        Ok(boundary)
    }

    /// Fetch a collection with its release list.
    pub async fn get_collection(&self, collection_id: DbId) -> Result<Collection, CoreError> {
        self.store
            .find_collection(collection_id)
            .await?
            .ok_or_else(|| CoreError::not_found("collection", collection_id))
    }

    /// Releases of a collection in declaration order.
    pub async fn list_releases(&self, collection_id: DbId) -> Result<Vec<Release>, CoreError> {
        Ok(self.get_collection(collection_id).await?.releases)
    }

    /// The version of a content that `release` froze: its latest version at
    /// the moment the release was declared.
    ///
    /// `NotFound` if the release does not exist in the content's collection,
    /// or if the content had no version yet when it was declared.
    pub async fn content_at_release(
        &self,
        content_id: DbId,
        release: &str,
    ) -> Result<VersionRecord, CoreError> {
        let content = self
            .store
            .find_content(content_id)
            .await?
            .ok_or_else(|| CoreError::not_found("content", content_id))?;
        let collection = self.get_collection(content.collection_id).await?;

        let tags = tags_before(&collection, release)
            .ok_or_else(|| CoreError::not_found("release", release))?;

        let version = self
            .store
            .find_latest_tagged(content_id, &tags)
            .await?
            .ok_or_else(|| CoreError::not_found("version", format!("{content_id}@{release}")))?;

        tracing::debug!(
            content_id,
            release,
            version = version.version_number,
            "Resolved release version"
        );
        Ok(version)
    }

    /// What a release froze across the whole collection: for every content,
    /// the version [`content_at_release`](Self::content_at_release) resolves
    /// to. Contents created after the release are left out.
    pub async fn release_snapshot(
        &self,
        collection_id: DbId,
        release: &str,
    ) -> Result<Vec<VersionRecord>, CoreError> {
        let collection = self.get_collection(collection_id).await?;
        let tags = tags_before(&collection, release)
            .ok_or_else(|| CoreError::not_found("release", release))?;

        let mut frozen = Vec::new();
        let mut after = None;
        loop {
            let batch = self
                .store
                .list_content_ids(collection_id, after, SNAPSHOT_PAGE_SIZE)
                .await?;
            let Some(&last) = batch.last() else { break };

            for content_id in &batch {
                if let Some(version) = self.store.find_latest_tagged(*content_id, &tags).await? {
                    frozen.push(version);
                }
            }

            if (batch.len() as i64) < SNAPSHOT_PAGE_SIZE {
                break;
            }
            after = Some(last);
        }

        tracing::debug!(collection_id, release, contents = frozen.len(), "Resolved release snapshot");
        Ok(frozen)
    }
}

fn duplicate(collection_id: DbId, name: &str) -> CoreError {
    CoreError::Conflict(format!(
        "Release '{name}' already exists in collection {collection_id}"
    ))
}
