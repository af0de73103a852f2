//! End-to-end walk through the content lifecycle on one collection:
//! create, edit, release, edit again, purge, lock.

mod common;

use assert_matches::assert_matches;
use serde_json::json;
use vellum_core::content::ContentChanges;
use vellum_core::error::CoreError;
use vellum_core::locking::{LockSource, ResourceRef};
use vellum_core::purge::PurgePolicy;
use vellum_engine::EngineConfig;

use common::{alice, bob, collection, engine_with, new_content, stored_numbers};

fn retitle(title: &str) -> ContentChanges {
    ContentChanges {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn content_lifecycle_end_to_end() {
    // Version 1 is the creation snapshot; keeping it leaves version 2 as the
    // only intermediate version once the release has frozen version 3.
    let config = EngineConfig {
        purge_policy: PurgePolicy {
            keep_initial_version: true,
        },
        ..EngineConfig::default()
    };
    let (engine, _) = engine_with(config);
    let cid = collection(&engine, "Marketing").await;

    // 1. Create.
    let created = engine
        .workflow
        .create_content(new_content(cid, "X"), &alice(), None)
        .await
        .unwrap();
    let x = created.content.id;
    assert_eq!(created.version.version_number, 1);
    assert_eq!(created.content.current_version, 1);

    // 2. Two updates.
    let v1 = engine.versions.get_version(x, 1).await.unwrap();
    engine.workflow.update_content(x, retitle("X'"), &alice(), None).await.unwrap();
    let third = engine
        .workflow
        .update_content(x, retitle("X''"), &alice(), None)
        .await
        .unwrap();
    assert_eq!(third.content.current_version, 3);
    assert_eq!(stored_numbers(&engine, x).await, vec![1, 2, 3]);
    assert_eq!(engine.versions.get_version(x, 1).await.unwrap(), v1);
    assert_eq!(engine.versions.get_version(x, 2).await.unwrap().snapshot.title, "X'");

    // 3. Release.
    engine.releases.create_release(cid, "v1", &alice()).await.unwrap();
    assert!(engine.versions.get_version(x, 3).await.unwrap().is_release_end);
    let collection = engine.releases.get_collection(cid).await.unwrap();
    assert_eq!(collection.current_release.as_deref(), Some("v1"));
    assert_eq!(collection.releases.len(), 1);
    assert_eq!(collection.releases[0].name, "v1");

    // 4. Update after the release.
    let fourth = engine
        .workflow
        .update_content(x, retitle("X'''"), &alice(), None)
        .await
        .unwrap();
    assert_eq!(fourth.version.version_number, 4);
    assert_eq!(fourth.version.release.as_deref(), Some("v1"));
    assert!(!fourth.version.is_release_end);

    // 5. Purge.
    let preview = engine.purge.preview_purge(cid).await.unwrap();
    assert_eq!(preview.purgeable_versions, 1);
    let report = engine.purge.purge(cid).await.unwrap();
    assert_eq!(report.versions_deleted, 1);
    assert_eq!(stored_numbers(&engine, x).await, vec![1, 3, 4]);

    // 6. Lock.
    engine
        .locks
        .acquire_lock(&ResourceRef::content(x), &alice(), Some("editing"))
        .await
        .unwrap();

    let err = engine
        .workflow
        .update_content(x, retitle("B was here"), &bob(), None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::ResourceLocked(blocking) => {
        assert_eq!(blocking.source_level, LockSource::Own);
        assert_eq!(blocking.locked_by, alice().id);
        assert_eq!(blocking.reason.as_deref(), Some("editing"));
    });

    let err = engine.workflow.publish(x, &bob()).await.unwrap_err();
    assert_matches!(err, CoreError::ResourceLocked(_));
    let err = engine.workflow.restore_version(x, 3, &bob()).await.unwrap_err();
    assert_matches!(err, CoreError::ResourceLocked(_));

    let err = engine
        .workflow
        .update_element(x, "hero", "heading", json!({"text": "B"}), &bob(), None)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::ResourceLocked(blocking) => {
        assert_eq!(blocking.source_level, LockSource::Content);
        assert_eq!(blocking.locked_by, alice().id);
    });

    assert_eq!(stored_numbers(&engine, x).await, vec![1, 3, 4]);
}

#[tokio::test]
async fn default_policy_also_purges_the_creation_snapshot() {
    let (engine, _) = common::engine();
    let cid = collection(&engine, "Marketing").await;
    let x = common::content(&engine, cid, "X").await.content.id;
    common::bump(&engine, x, 2).await;
    engine.releases.create_release(cid, "v1", &alice()).await.unwrap();
    common::bump(&engine, x, 1).await;

    assert_eq!(engine.purge.preview_purge(cid).await.unwrap().purgeable_versions, 2);
    engine.purge.purge(cid).await.unwrap();
    assert_eq!(stored_numbers(&engine, x).await, vec![3, 4]);
}
