//! Integration tests for `PurgeEngine`:
//! - Only release ends and the current version survive a purge
//! - Preview counts exactly what a purge deletes
//! - A second purge deletes nothing
//! - Batching walks every content regardless of batch size
//! - `keep_initial_version` protects version 1

mod common;

use assert_matches::assert_matches;
use vellum_core::error::CoreError;
use vellum_core::purge::PurgePolicy;
use vellum_engine::EngineConfig;

use common::{alice, bump, collection, content, engine, engine_with, stored_numbers};

#[tokio::test]
async fn purge_keeps_release_ends_and_current_version() {
    let (engine, _) = engine();
    let cid = collection(&engine, "Site").await;
    let id = content(&engine, cid, "Home").await.content.id;
    bump(&engine, id, 2).await;
    engine.releases.create_release(cid, "v1", &alice()).await.unwrap();
    bump(&engine, id, 2).await;

    let preview = engine.purge.preview_purge(cid).await.unwrap();
    assert_eq!(preview.contents_scanned, 1);
    assert_eq!(preview.purgeable_versions, 3);

    let report = engine.purge.purge(cid).await.unwrap();
    assert_eq!(report.versions_deleted, 3);
    assert_eq!(stored_numbers(&engine, id).await, vec![3, 5]);
}

#[tokio::test]
async fn purge_is_idempotent() {
    let (engine, _) = engine();
    let cid = collection(&engine, "Site").await;
    let id = content(&engine, cid, "Home").await.content.id;
    bump(&engine, id, 3).await;

    assert_eq!(engine.purge.purge(cid).await.unwrap().versions_deleted, 3);
    let again = engine.purge.purge(cid).await.unwrap();
    assert_eq!(again.versions_deleted, 0);
    assert_eq!(engine.purge.preview_purge(cid).await.unwrap().purgeable_versions, 0);
    assert_eq!(stored_numbers(&engine, id).await, vec![4]);
}

#[tokio::test]
async fn single_version_content_is_never_purged() {
    let (engine, store) = engine();
    let cid = collection(&engine, "Site").await;
    content(&engine, cid, "Home").await;

    let report = engine.purge.purge(cid).await.unwrap();
    assert_eq!(report.versions_deleted, 0);
    assert_eq!(store.version_count().await, 1);
}

#[tokio::test]
async fn numbering_continues_after_purge() {
    let (engine, _) = engine();
    let cid = collection(&engine, "Site").await;
    let id = content(&engine, cid, "Home").await.content.id;
    bump(&engine, id, 2).await;
    engine.purge.purge(cid).await.unwrap();

    let next = engine.versions.create_version(id, &alice(), None).await.unwrap();
    assert_eq!(next.version_number, 4);
}

#[tokio::test]
async fn small_batches_cover_every_content() {
    let config = EngineConfig {
        purge_batch_size: 2,
        ..EngineConfig::default()
    };
    let (engine, store) = engine_with(config);
    let cid = collection(&engine, "Site").await;
    let other = collection(&engine, "Other").await;
    let mut ids = Vec::new();
    for i in 0..5 {
        let id = content(&engine, cid, &format!("Page {i}")).await.content.id;
        bump(&engine, id, 1).await;
        ids.push(id);
    }
    let untouched = content(&engine, other, "Elsewhere").await.content.id;
    bump(&engine, untouched, 1).await;

    let report = engine.purge.purge(cid).await.unwrap();
    assert_eq!(report.contents_scanned, 5);
    assert_eq!(report.batches, 3);
    assert_eq!(report.versions_deleted, 5);
    for id in ids {
        assert_eq!(stored_numbers(&engine, id).await, vec![2]);
    }
    assert_eq!(stored_numbers(&engine, untouched).await, vec![1, 2]);
    assert_eq!(store.version_count().await, 7);
}

#[tokio::test]
async fn keep_initial_version_protects_version_one() {
    let config = EngineConfig {
        purge_policy: PurgePolicy {
            keep_initial_version: true,
        },
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(config);
    let cid = collection(&engine, "Site").await;
    let id = content(&engine, cid, "Home").await.content.id;
    bump(&engine, id, 3).await;

    let report = engine.purge.purge(cid).await.unwrap();
    assert_eq!(report.versions_deleted, 2);
    assert_eq!(stored_numbers(&engine, id).await, vec![1, 4]);
}

#[tokio::test]
async fn purge_of_missing_collection_is_not_found() {
    let (engine, _) = engine();
    let err = engine.purge.preview_purge(5).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "collection", .. });
    let err = engine.purge.purge(5).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "collection", .. });
}
