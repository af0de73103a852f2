//! Collections, their named releases, and release-name validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum allowed length for a release name.
pub const MAX_RELEASE_NAME_LENGTH: usize = 100;

/// Maximum allowed length for a collection name.
pub const MAX_COLLECTION_NAME_LENGTH: usize = 200;

/// A named milestone over a collection's content versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub created_at: Timestamp,
    pub created_by: DbId,
}

/// A collection of content entities sharing one release history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: DbId,
    pub name: String,
    /// The open release. New versions are tagged with it. `None` until the
    /// first release is declared.
    pub current_release: Option<String>,
    /// Append-only, in declaration order.
    pub releases: Vec<Release>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Collection {
    pub fn has_release(&self, name: &str) -> bool {
        self.releases.iter().any(|r| r.name == name)
    }
}

/// Outcome of declaring a release boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseBoundary {
    pub collection_id: DbId,
    pub release: Release,
    /// Release that was open before this one (the tag the marked versions carry).
    pub closed_release: Option<String>,
    /// Number of versions flagged `is_release_end`.
    pub versions_marked: u64,
}

/// Selects versions by release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    /// Match versions created before any release was declared.
    pub include_untagged: bool,
    pub names: Vec<String>,
}

impl TagFilter {
    pub fn matches(&self, tag: Option<&str>) -> bool {
        match tag {
            None => self.include_untagged,
            Some(name) => self.names.iter().any(|n| n == name),
        }
    }
}

/// Tags carried by versions created before `release` was declared: untagged
/// ones plus every release declared earlier. The latest such version of a
/// content is what the release froze. `None` if the release does not exist.
pub fn tags_before(collection: &Collection, release: &str) -> Option<TagFilter> {
    let index = collection.releases.iter().position(|r| r.name == release)?;
    Some(TagFilter {
        include_untagged: true,
        names: collection.releases[..index]
            .iter()
            .map(|r| r.name.clone())
            .collect(),
    })
}

/// Validate a release name: non-empty, no surrounding whitespace, no control
/// characters, and within [`MAX_RELEASE_NAME_LENGTH`].
pub fn validate_release_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Release name must not be empty".to_string(),
        ));
    }
    if trimmed.len() != name.len() {
        return Err(CoreError::Validation(
            "Release name must not have leading or trailing whitespace".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(CoreError::Validation(
            "Release name must not contain control characters".to_string(),
        ));
    }
    if name.chars().count() > MAX_RELEASE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Release name must not exceed {MAX_RELEASE_NAME_LENGTH} characters, got {}",
            name.chars().count()
        )));
    }
    Ok(())
}

/// Validate a collection name: non-empty and bounded.
pub fn validate_collection_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Collection name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_COLLECTION_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Collection name must not exceed {MAX_COLLECTION_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_release_names() {
        assert!(validate_release_name("v1").is_ok());
        assert!(validate_release_name("Spring 2026 edition").is_ok());
        assert!(validate_release_name(&"a".repeat(MAX_RELEASE_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn empty_release_name_rejected() {
        let err = validate_release_name("").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        assert!(validate_release_name("   ").is_err());
    }

    #[test]
    fn padded_release_name_rejected() {
        let err = validate_release_name(" v1").unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn control_characters_rejected() {
        assert!(validate_release_name("v1\n").is_err());
        assert!(validate_release_name("v\t1").is_err());
    }

    #[test]
    fn overlong_release_name_rejected() {
        let err = validate_release_name(&"a".repeat(MAX_RELEASE_NAME_LENGTH + 1)).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn has_release_matches_exact_name() {
        let collection = Collection {
            id: 1,
            name: "Docs".into(),
            current_release: Some("v1".into()),
            releases: vec![Release {
                name: "v1".into(),
                created_at: chrono::Utc::now(),
                created_by: 7,
            }],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(collection.has_release("v1"));
        assert!(!collection.has_release("V1"));
    }

    fn collection_with(names: &[&str]) -> Collection {
        Collection {
            id: 1,
            name: "Docs".into(),
            current_release: names.last().map(|n| n.to_string()),
            releases: names
                .iter()
                .map(|n| Release {
                    name: n.to_string(),
                    created_at: chrono::Utc::now(),
                    created_by: 1,
                })
                .collect(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn tags_before_first_release_is_untagged_only() {
        let filter = tags_before(&collection_with(&["v1", "v2"]), "v1").unwrap();
        assert!(filter.matches(None));
        assert!(!filter.matches(Some("v1")));
    }

    #[test]
    fn tags_before_later_release_includes_earlier_ones() {
        let filter = tags_before(&collection_with(&["v1", "v2", "v3"]), "v3").unwrap();
        assert!(filter.matches(None));
        assert!(filter.matches(Some("v1")));
        assert!(filter.matches(Some("v2")));
        assert!(!filter.matches(Some("v3")));
    }

    #[test]
    fn tags_before_unknown_release_is_none() {
        assert!(tags_before(&collection_with(&["v1"]), "v9").is_none());
    }

    #[test]
    fn collection_name_validation() {
        assert!(validate_collection_name("Marketing site").is_ok());
        assert!(validate_collection_name(" ").is_err());
    }
}
