//! Advisory, hierarchical resource locks: types, hierarchy resolution, and
//! validation.
//!
//! A lock on a collection covers every content in it and every element of
//! those contents; a lock on a content covers its elements. This module holds
//! the pure part of that rule so the engine and both storage back ends agree
//! on it.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum allowed length for a lock reason.
pub const MAX_LOCK_REASON_LENGTH: usize = 500;

// ---------------------------------------------------------------------------
// Resource types
// ---------------------------------------------------------------------------

/// The kinds of resource that can be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Collection,
    Content,
    Element,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Content => "content",
            Self::Element => "element",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "collection" => Ok(Self::Collection),
            "content" => Ok(Self::Content),
            "element" => Ok(Self::Element),
            other => Err(CoreError::Validation(format!(
                "Invalid resource_type '{other}'. Must be one of: collection, content, element"
            ))),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lockable resource. Elements are addressed through their content, since
/// element ids only exist inside a content's element tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum ResourceRef {
    Collection { id: DbId },
    Content { id: DbId },
    Element { content_id: DbId, element_id: String },
}

impl ResourceRef {
    pub fn collection(id: DbId) -> Self {
        Self::Collection { id }
    }

    pub fn content(id: DbId) -> Self {
        Self::Content { id }
    }

    pub fn element(content_id: DbId, element_id: impl Into<String>) -> Self {
        Self::Element {
            content_id,
            element_id: element_id.into(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Collection { .. } => ResourceType::Collection,
            Self::Content { .. } => ResourceType::Content,
            Self::Element { .. } => ResourceType::Element,
        }
    }

    /// Key stored in the lock table's `resource_id` column. Element keys are
    /// prefixed with their content id, since element ids repeat across
    /// contents.
    pub fn resource_id(&self) -> String {
        match self {
            Self::Collection { id } | Self::Content { id } => id.to_string(),
            Self::Element {
                content_id,
                element_id,
            } => format!("{content_id}:{element_id}"),
        }
    }

    /// Validate ids before touching storage.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Collection { id } | Self::Content { id } if *id <= 0 => Err(
                CoreError::Validation(format!("resource id must be positive, got {id}")),
            ),
            Self::Element { content_id, .. } if *content_id <= 0 => Err(CoreError::Validation(
                format!("content id must be positive, got {content_id}"),
            )),
            Self::Element { element_id, .. } if element_id.trim().is_empty() => Err(
                CoreError::Validation("element id must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.resource_type(), self.resource_id())
    }
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

/// An active lock. At most one exists per `(resource_type, resource_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub resource_type: ResourceType,
    pub resource_id: String,
    /// Collection the resource belongs to (the resource itself for collections).
    pub collection_id: DbId,
    /// Content the resource belongs to; `None` for collection locks.
    pub content_id: Option<DbId>,
    pub locked_by: DbId,
    pub locked_by_name: String,
    pub locked_at: Timestamp,
    pub reason: Option<String>,
}

/// Input for inserting a lock row.
#[derive(Debug, Clone)]
pub struct NewLock {
    pub resource: ResourceRef,
    pub collection_id: DbId,
    pub locked_by: DbId,
    pub locked_by_name: String,
    pub reason: Option<String>,
}

impl NewLock {
    pub fn content_id(&self) -> Option<DbId> {
        match &self.resource {
            ResourceRef::Collection { .. } => None,
            ResourceRef::Content { id } => Some(*id),
            ResourceRef::Element { content_id, .. } => Some(*content_id),
        }
    }
}

/// Which level of the hierarchy a blocking lock sits on, relative to the
/// resource being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSource {
    /// The resource itself is locked.
    #[serde(rename = "self")]
    Own,
    /// The content owning the element is locked.
    Content,
    /// The collection owning the content is locked.
    Collection,
}

impl LockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "self",
            Self::Content => "content",
            Self::Collection => "collection",
        }
    }
}

impl std::fmt::Display for LockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of [`CoreError::ResourceLocked`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockedResource {
    /// Type and id of the locked resource (which may be an ancestor of the
    /// resource that was checked).
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub locked_by: DbId,
    pub locked_by_name: String,
    pub locked_at: Timestamp,
    pub reason: Option<String>,
    pub source_level: LockSource,
}

impl LockedResource {
    pub fn from_lock(lock: &Lock, source_level: LockSource) -> Self {
        Self {
            resource_type: lock.resource_type,
            resource_id: lock.resource_id.clone(),
            locked_by: lock.locked_by,
            locked_by_name: lock.locked_by_name.clone(),
            locked_at: lock.locked_at,
            reason: lock.reason.clone(),
            source_level,
        }
    }
}

impl std::fmt::Display for LockedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resource locked: {} {} is locked by {} (user {}) since {} [source: {}]",
            self.resource_type,
            self.resource_id,
            self.locked_by_name,
            self.locked_by,
            self.locked_at.to_rfc3339(),
            self.source_level
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// The resources whose locks guard `target`, nearest first.
///
/// `collection_id` is the collection that owns the target (resolved by the
/// caller from storage).
pub fn guarding_resources(target: &ResourceRef, collection_id: DbId) -> Vec<(LockSource, ResourceRef)> {
    match target {
        ResourceRef::Collection { .. } => vec![(LockSource::Own, target.clone())],
        ResourceRef::Content { .. } => vec![
            (LockSource::Own, target.clone()),
            (LockSource::Collection, ResourceRef::collection(collection_id)),
        ],
        ResourceRef::Element { content_id, .. } => vec![
            (LockSource::Own, target.clone()),
            (LockSource::Content, ResourceRef::content(*content_id)),
            (LockSource::Collection, ResourceRef::collection(collection_id)),
        ],
    }
}

/// Pick the nearest lock that blocks `actor_id`. Locks held by the actor
/// itself never block it.
pub fn first_blocking_lock(
    levels: &[(LockSource, Option<Lock>)],
    actor_id: DbId,
) -> Option<LockedResource> {
    levels.iter().find_map(|(source, lock)| {
        lock.as_ref()
            .filter(|l| l.locked_by != actor_id)
            .map(|l| LockedResource::from_lock(l, *source))
    })
}

/// Validate and normalise an optional lock reason. Blank reasons become `None`.
pub fn normalize_reason(reason: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_LOCK_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Lock reason must be at most {MAX_LOCK_REASON_LENGTH} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
