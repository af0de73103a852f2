//! Append-only version history for content entities.

use std::sync::Arc;

use vellum_core::content::{Actor, ContentChanges, ContentEntity};
use vellum_core::diff::{compare_snapshots, VersionDiff};
use vellum_core::error::{CoreError, StoreError};
use vellum_core::store::Store;
use vellum_core::types::{DbId, VersionNumber};
use vellum_core::versioning::{
    normalize_change_note, restore_note, validate_version_number, NewVersion, VersionCursor,
    VersionPage, VersionRecord, MAX_PAGE_LIMIT,
};

/// Creates, reads, compares and restores version records.
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<dyn Store>,
    max_attempts: u32,
}

impl VersionStore {
    pub fn new(store: Arc<dyn Store>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Snapshot the content's current head as its next version.
    ///
    /// The store reads the head, allocates the number and inserts the record
    /// in one atomic step, so the newest version always matches the head. A collision on `(content_id, version_number)` is
    /// retried up to the configured number of attempts before it surfaces as
    /// [`CoreError::Conflict`].
    pub async fn create_version(
        &self,
        content_id: DbId,
        actor: &Actor,
        change_note: Option<&str>,
    ) -> Result<VersionRecord, CoreError> {
        let change_note = normalize_change_note(change_note)?;
        let input = NewVersion::new(content_id, actor, change_note);

        for attempt in 1..=self.max_attempts {
            match self.store.append_version(&input).await {
                Ok(Some(record)) => {
                    tracing::info!(
                        content_id,
                        version = record.version_number,
                        release = ?record.release,
                        actor_id = actor.id,
                        "Version created"
                    );
                    return Ok(record);
                }
                Ok(None) => return Err(CoreError::not_found("content", content_id)),
                Err(StoreError::UniqueViolation(constraint)) => {
                    tracing::warn!(
                        content_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        %constraint,
                        "Version number collision, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CoreError::Conflict(format!(
            "Could not allocate a version number for content {content_id} after {} attempts",
            self.max_attempts
        )))
    }

    /// Fetch one version of a content.
    pub async fn get_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
    ) -> Result<VersionRecord, CoreError> {
        validate_version_number(version_number)?;
        self.store
            .find_version(content_id, version_number)
            .await?
            .ok_or_else(|| CoreError::not_found("version", format!("{content_id}@{version_number}")))
    }

    /// One page of a content's versions, ascending by number.
    ///
    /// Pass the returned `next_cursor` back in to continue; a listing can be
    /// restarted from any cursor.
    pub async fn list_versions(
        &self,
        content_id: DbId,
        cursor: VersionCursor,
    ) -> Result<VersionPage, CoreError> {
        self.load_content(content_id).await?;
        let items = self
            .store
            .list_versions(content_id, cursor.after, cursor.effective_limit())
            .await?;
        tracing::debug!(content_id, count = items.len(), after = ?cursor.after, "Listed versions");
        Ok(VersionPage::from_items(items, cursor))
    }

    /// Every stored version of a content, ascending. Drains the cursor.
    pub async fn list_all_versions(&self, content_id: DbId) -> Result<Vec<VersionRecord>, CoreError> {
        let mut all = Vec::new();
        let mut cursor = VersionCursor::first(MAX_PAGE_LIMIT);
        loop {
            let page = self.list_versions(content_id, cursor).await?;
            all.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = next,
                None => return Ok(all),
            }
        }
    }

    /// Field-level comparison of two versions.
    pub async fn compare_versions(
        &self,
        content_id: DbId,
        from: VersionNumber,
        to: VersionNumber,
    ) -> Result<VersionDiff, CoreError> {
        let older = self.get_version(content_id, from).await?;
        let newer = self.get_version(content_id, to).await?;
        Ok(VersionDiff {
            content_id,
            from_version: from,
            to_version: to,
            diff: compare_snapshots(&older.snapshot, &newer.snapshot),
        })
    }

    /// Copy version `n` back onto the content head and record that as a new
    /// forward version. Existing records are never touched.
    pub async fn restore_version(
        &self,
        content_id: DbId,
        version_number: VersionNumber,
        actor: &Actor,
    ) -> Result<VersionRecord, CoreError> {
        let source = self.get_version(content_id, version_number).await?;

        self.store
            .update_content(content_id, &ContentChanges::from_snapshot(&source.snapshot))
            .await?
            .ok_or_else(|| CoreError::not_found("content", content_id))?;

        let record = self
            .create_version(content_id, actor, Some(&restore_note(version_number)))
            .await?;

        tracing::info!(
            content_id,
            restored_from = version_number,
            new_version = record.version_number,
            actor_id = actor.id,
            "Version restored"
        );
        Ok(record)
    }

    async fn load_content(&self, content_id: DbId) -> Result<ContentEntity, CoreError> {
        self.store
            .find_content(content_id)
            .await?
            .ok_or_else(|| CoreError::not_found("content", content_id))
    }
}
