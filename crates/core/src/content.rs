//! Content entities, their block-element trees, and the acting user.
//!
//! The mutable content head is owned by the surrounding system; the engine
//! only reads it, rewrites it on restore, and snapshots it into versions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp, VersionNumber};

/// Maximum allowed length for a content title.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum allowed length for an element id.
pub const MAX_ELEMENT_ID_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The identity a mutating call is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub name: String,
}

impl Actor {
    pub fn new(id: DbId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Publication status. Transitions are governed outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parse the database representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!(
                "Invalid content status '{other}'. Must be one of: draft, published, archived"
            ))),
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// A block element in a content's nested element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }
}

/// Depth-first search for an element by id.
pub fn find_element<'a>(elements: &'a [Element], id: &str) -> Option<&'a Element> {
    for element in elements {
        if element.id == id {
            return Some(element);
        }
        if let Some(found) = find_element(&element.children, id) {
            return Some(found);
        }
    }
    None
}

/// Replace the `type` and `data` of the element with the given id, keeping
/// its position and children. Returns `false` if no such element exists.
pub fn replace_element(
    elements: &mut [Element],
    id: &str,
    kind: &str,
    data: &serde_json::Value,
) -> bool {
    for element in elements.iter_mut() {
        if element.id == id {
            element.kind = kind.to_string();
            element.data = data.clone();
            return true;
        }
        if replace_element(&mut element.children, id, kind, data) {
            return true;
        }
    }
    false
}

/// Validate that element ids are non-empty, bounded, and unique across the
/// whole tree. Diffing and element locks both key on them.
pub fn validate_elements(elements: &[Element]) -> Result<(), CoreError> {
    fn walk<'a>(
        elements: &'a [Element],
        seen: &mut std::collections::HashSet<&'a str>,
    ) -> Result<(), CoreError> {
        for element in elements {
            if element.id.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Element id must not be empty".to_string(),
                ));
            }
            if element.id.len() > MAX_ELEMENT_ID_LENGTH {
                return Err(CoreError::Validation(format!(
                    "Element id must not exceed {MAX_ELEMENT_ID_LENGTH} characters"
                )));
            }
            if !seen.insert(element.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate element id '{}'",
                    element.id
                )));
            }
            walk(&element.children, seen)?;
        }
        Ok(())
    }

    walk(elements, &mut std::collections::HashSet::new())
}

// ---------------------------------------------------------------------------
// Content head
// ---------------------------------------------------------------------------

/// The mutable head of a content entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntity {
    pub id: DbId,
    pub collection_id: DbId,
    pub title: String,
    pub metadata: serde_json::Value,
    pub elements: Vec<Element>,
    pub status: ContentStatus,
    /// Mirrors the number of the latest version; 0 until the first one exists.
    pub current_version: VersionNumber,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentEntity {
    /// Deep copy of the versioned fields.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            title: self.title.clone(),
            metadata: self.metadata.clone(),
            elements: self.elements.clone(),
        }
    }
}

/// The versioned part of a content: what a version record freezes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    pub metadata: serde_json::Value,
    pub elements: Vec<Element>,
}

/// DTO for inserting a new content head.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
    pub collection_id: DbId,
    pub title: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// DTO for patching a content head. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentChanges {
    pub title: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub elements: Option<Vec<Element>>,
    pub status: Option<ContentStatus>,
}

impl ContentChanges {
    /// Changes that overwrite every versioned field with the snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            title: Some(snapshot.title.clone()),
            metadata: Some(snapshot.metadata.clone()),
            elements: Some(snapshot.elements.clone()),
            status: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.metadata.is_none()
            && self.elements.is_none()
            && self.status.is_none()
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a content title: non-empty after trimming and bounded.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Content title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Content title must not exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that metadata is a JSON object.
pub fn validate_metadata(metadata: &serde_json::Value) -> Result<(), CoreError> {
    if metadata.is_object() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Content metadata must be a JSON object".to_string(),
        ))
    }
}

/// Validate every field present in a new content.
pub fn validate_new_content(input: &NewContent) -> Result<(), CoreError> {
    validate_title(&input.title)?;
    validate_metadata(&input.metadata)?;
    validate_elements(&input.elements)
}

/// Validate every field present in a patch.
pub fn validate_changes(changes: &ContentChanges) -> Result<(), CoreError> {
    if changes.is_empty() {
        return Err(CoreError::Validation(
            "At least one field must be changed".to_string(),
        ));
    }
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    if let Some(metadata) = &changes.metadata {
        validate_metadata(metadata)?;
    }
    if let Some(elements) = &changes.elements {
        validate_elements(elements)?;
    }
    Ok(())
}
