use crate::locking::{Lock, LockedResource};

/// Domain error returned by every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A lock request hit a lock held by someone else.
    #[error("Conflict: {} {} is already locked by {} (user {}) since {}", .0.resource_type, .0.resource_id, .0.locked_by_name, .0.locked_by, .0.locked_at.to_rfc3339())]
    LockConflict(Box<Lock>),

    #[error("{0}")]
    ResourceLocked(Box<LockedResource>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// `true` for both kinds of conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::LockConflict(_))
    }
}

/// Failure reported by a storage back end.
///
/// Back ends only distinguish what the engine reacts to: a unique-constraint
/// hit (retried for version allocation, reported as a conflict otherwise) and
/// everything else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                CoreError::Conflict(format!("Duplicate value violates {constraint}"))
            }
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err: CoreError = StoreError::UniqueViolation("uq_releases_name".into()).into();
        assert!(matches!(err, CoreError::Conflict(msg) if msg.contains("uq_releases_name")));
    }

    #[test]
    fn backend_error_maps_to_internal() {
        let err: CoreError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, CoreError::Internal(msg) if msg == "connection reset"));
    }

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = CoreError::not_found("content", 42);
        assert_eq!(err.to_string(), "Entity not found: content with id 42");
    }
}
