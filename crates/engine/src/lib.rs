//! Versioning, release, purge and locking services over a pluggable store.
//!
//! Every service holds an `Arc<dyn Store>`; [`Engine`] wires them all to one
//! back end. Use [`memory::InMemoryStore`] for tests and embedding, or the
//! PostgreSQL store from `vellum-db`.

pub mod config;
pub mod locks;
pub mod memory;
pub mod purge;
pub mod releases;
pub mod versions;
pub mod workflow;

use std::sync::Arc;

use vellum_core::store::Store;

pub use config::{ConfigError, EngineConfig};
pub use locks::LockManager;
pub use memory::InMemoryStore;
pub use purge::PurgeEngine;
pub use releases::ReleaseManager;
pub use versions::VersionStore;
pub use workflow::{ContentWorkflow, Mutation};

/// All engine services sharing one store.
#[derive(Clone)]
pub struct Engine {
    pub versions: VersionStore,
    pub releases: ReleaseManager,
    pub purge: PurgeEngine,
    pub locks: LockManager,
    pub workflow: ContentWorkflow,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let versions = VersionStore::new(Arc::clone(&store), config.version_alloc_retries);
        let locks = LockManager::new(Arc::clone(&store));
        Self {
            releases: ReleaseManager::new(Arc::clone(&store)),
            purge: PurgeEngine::new(
                Arc::clone(&store),
                config.purge_batch_size,
                config.purge_policy,
            ),
            workflow: ContentWorkflow::new(store, locks.clone(), versions.clone()),
            versions,
            locks,
        }
    }
}
