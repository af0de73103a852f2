//! Retention rule for intermediate versions and purge result types.
//!
//! A version survives a purge when it closed a release (`is_release_end`) or
//! is the content's current version. Everything else is intermediate history
//! and may be deleted. The rule is recomputed from persisted flags on every
//! run, which makes purging idempotent.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, VersionNumber};

/// Contents processed per purge batch when not configured.
pub const DEFAULT_PURGE_BATCH_SIZE: i64 = 100;

/// Upper bound for a configured batch size.
pub const MAX_PURGE_BATCH_SIZE: i64 = 10_000;

/// Knobs for the retention rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgePolicy {
    /// Also keep version 1 (the creation snapshot) of every content.
    pub keep_initial_version: bool,
}

/// Returns `true` if the version may be deleted by a purge.
pub fn is_purgeable(
    version_number: VersionNumber,
    is_release_end: bool,
    current_version: VersionNumber,
    policy: PurgePolicy,
) -> bool {
    if is_release_end || version_number == current_version {
        return false;
    }
    !(policy.keep_initial_version && version_number == 1)
}

/// Result of a dry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgePreview {
    pub collection_id: DbId,
    pub contents_scanned: u64,
    pub purgeable_versions: u64,
}

/// Result of a purge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub collection_id: DbId,
    pub contents_scanned: u64,
    pub batches: u64,
    pub versions_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: PurgePolicy = PurgePolicy {
        keep_initial_version: false,
    };

    #[test]
    fn current_version_is_never_purgeable() {
        assert!(!is_purgeable(3, false, 3, DEFAULT));
    }

    #[test]
    fn release_end_is_never_purgeable() {
        assert!(!is_purgeable(2, true, 5, DEFAULT));
    }

    #[test]
    fn intermediate_versions_are_purgeable() {
        assert!(is_purgeable(1, false, 3, DEFAULT));
        assert!(is_purgeable(2, false, 3, DEFAULT));
    }

    #[test]
    fn single_version_content_is_never_purgeable() {
        assert!(!is_purgeable(1, false, 1, DEFAULT));
        assert!(!is_purgeable(1, true, 1, DEFAULT));
    }

    #[test]
    fn initial_version_kept_when_policy_says_so() {
        let keep = PurgePolicy {
            keep_initial_version: true,
        };
        assert!(!is_purgeable(1, false, 4, keep));
        assert!(is_purgeable(2, false, 4, keep));
    }
}
