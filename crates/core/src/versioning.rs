//! Version records: immutable, sequentially numbered content snapshots.

use serde::{Deserialize, Serialize};

use crate::content::{Actor, Snapshot};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp, VersionNumber};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum allowed length for a change note.
pub const MAX_CHANGE_NOTE_LENGTH: usize = 1000;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Largest page a single `list_versions` call returns.
pub const MAX_PAGE_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An immutable snapshot of one content at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: DbId,
    pub content_id: DbId,
    pub version_number: VersionNumber,
    pub snapshot: Snapshot,
    /// Release that was open in the collection when the record was created.
    pub release: Option<String>,
    /// Set once, when a release is declared while this was the latest version.
    pub is_release_end: bool,
    pub change_note: Option<String>,
    pub created_by: DbId,
    pub created_by_name: String,
    pub created_at: Timestamp,
}

/// Input for appending a version. The store snapshots the content head,
/// allocates the number and reads the release tag inside one atomic step, so
/// the record always freezes the head as it was when its number was taken.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub content_id: DbId,
    pub change_note: Option<String>,
    pub created_by: DbId,
    pub created_by_name: String,
}

impl NewVersion {
    pub fn new(content_id: DbId, actor: &Actor, change_note: Option<String>) -> Self {
        Self {
            content_id,
            change_note,
            created_by: actor.id,
            created_by_name: actor.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Keyset cursor over a content's versions, ascending by number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCursor {
    /// Return versions strictly after this number. `None` starts at the beginning.
    pub after: Option<VersionNumber>,
    pub limit: Option<i64>,
}

impl VersionCursor {
    pub fn first(limit: i64) -> Self {
        Self {
            after: None,
            limit: Some(limit),
        }
    }

    /// Effective page size after clamping.
    pub fn effective_limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

/// One page of versions plus the cursor to fetch the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionPage {
    pub items: Vec<VersionRecord>,
    /// `None` once the listing is exhausted.
    pub next_cursor: Option<VersionCursor>,
}

impl VersionPage {
    /// Build a page from `items` fetched with `cursor`. A full page yields a
    /// continuation cursor; a short page ends the listing.
    pub fn from_items(items: Vec<VersionRecord>, cursor: VersionCursor) -> Self {
        let limit = cursor.effective_limit();
        let next_cursor = if items.len() as i64 >= limit {
            items.last().map(|last| VersionCursor {
                after: Some(last.version_number),
                limit: Some(limit),
            })
        } else {
            None
        };
        Self { items, next_cursor }
    }
}

/// Clamp a requested page size into `1..=MAX_PAGE_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a version number supplied by a caller.
pub fn validate_version_number(n: VersionNumber) -> Result<(), CoreError> {
    if n < 1 {
        return Err(CoreError::Validation(format!(
            "Version number must be positive, got {n}"
        )));
    }
    Ok(())
}

/// Validate and normalise a change note. Blank notes become `None`.
pub fn normalize_change_note(note: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if note.chars().count() > MAX_CHANGE_NOTE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Change note must not exceed {MAX_CHANGE_NOTE_LENGTH} characters"
        )));
    }
    Ok(Some(note.to_string()))
}

/// Change note recorded on the forward version a restore creates.
pub fn restore_note(from: VersionNumber) -> String {
    format!("Restored from version {from}")
}
