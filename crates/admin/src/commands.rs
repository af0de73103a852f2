//! Command dispatch. Each command maps onto one engine operation and returns
//! its result as JSON.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use vellum_core::content::Actor;
use vellum_core::store::Store;
use vellum_core::versioning::VersionCursor;
use vellum_db::{DbPool, PgStore};
use vellum_engine::{Engine, EngineConfig};

use crate::cli::{resource_ref, ActorArgs, Command};

impl From<ActorArgs> for Actor {
    fn from(args: ActorArgs) -> Self {
        Actor::new(args.actor_id, args.actor_name)
    }
}

pub async fn run(command: Command, pool: DbPool, config: EngineConfig) -> anyhow::Result<Value> {
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let engine = Engine::new(store, config);

    match command {
        Command::Migrate => {
            vellum_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
            Ok(json!({ "status": "migrated" }))
        }
        Command::Release {
            collection,
            name,
            actor,
        } => to_json(
            engine
                .releases
                .create_release(collection, &name, &actor.into())
                .await?,
        ),
        Command::Releases { collection } => {
            to_json(engine.releases.list_releases(collection).await?)
        }
        Command::PreviewPurge { collection } => {
            to_json(engine.purge.preview_purge(collection).await?)
        }
        Command::Purge { collection } => to_json(engine.purge.purge(collection).await?),
        Command::Locks { collection } => to_json(engine.locks.list_locks(collection).await?),
        Command::Unlock {
            kind,
            id,
            content,
            force,
            actor,
        } => {
            let resource = resource_ref(kind, &id, content)?;
            let released = engine
                .locks
                .release_lock(&resource, &actor.into(), force)
                .await?;
            Ok(json!({ "resource": resource, "released": released }))
        }
        Command::Versions {
            content,
            after,
            limit,
        } => to_json(
            engine
                .versions
                .list_versions(content, VersionCursor { after, limit })
                .await?,
        ),
        Command::Diff { content, from, to } => {
            to_json(engine.versions.compare_versions(content, from, to).await?)
        }
    }
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("Failed to serialize command output")
}
