//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod collection_repo;
pub mod content_repo;
pub mod lock_repo;
pub mod release_repo;
pub mod version_repo;

pub use collection_repo::CollectionRepo;
pub use content_repo::ContentRepo;
pub use lock_repo::LockRepo;
pub use release_repo::{DeclaredRelease, ReleaseRepo};
pub use version_repo::VersionRepo;
