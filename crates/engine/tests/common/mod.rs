//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use vellum_core::content::{Actor, Element, NewContent};
use vellum_core::store::Store;
use vellum_core::types::DbId;
use vellum_engine::{Engine, EngineConfig, InMemoryStore, Mutation};

pub fn alice() -> Actor {
    Actor::new(1, "alice")
}

pub fn bob() -> Actor {
    Actor::new(2, "bob")
}

pub fn admin() -> Actor {
    Actor::new(99, "admin")
}

/// An engine over a fresh in-memory store, plus the store itself.
pub fn engine() -> (Engine, Arc<InMemoryStore>) {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> (Engine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    (Engine::new(dyn_store, config), store)
}

pub fn page_elements() -> Vec<Element> {
    vec![
        Element::new("hero", "heading", json!({"text": "Welcome"})),
        Element::new("body", "section", json!({})).with_children(vec![
            Element::new("p1", "paragraph", json!({"text": "First"})),
            Element::new("p2", "paragraph", json!({"text": "Second"})),
        ]),
    ]
}

pub fn new_content(collection_id: DbId, title: &str) -> NewContent {
    NewContent {
        collection_id,
        title: title.to_string(),
        metadata: json!({"seo_title": title}),
        elements: page_elements(),
    }
}

/// Create a collection and return its id.
pub async fn collection(engine: &Engine, name: &str) -> DbId {
    engine.workflow.create_collection(name).await.unwrap().id
}

/// Create a content with its first version.
pub async fn content(engine: &Engine, collection_id: DbId, title: &str) -> Mutation {
    engine
        .workflow
        .create_content(new_content(collection_id, title), &alice(), None)
        .await
        .unwrap()
}

/// Record `count` further versions of a content by renaming it.
pub async fn bump(engine: &Engine, content_id: DbId, count: usize) {
    for i in 0..count {
        engine
            .workflow
            .update_content(
                content_id,
                vellum_core::content::ContentChanges {
                    title: Some(format!("Edit {i}")),
                    ..Default::default()
                },
                &alice(),
                None,
            )
            .await
            .unwrap();
    }
}

/// Version numbers currently stored for a content.
pub async fn stored_numbers(engine: &Engine, content_id: DbId) -> Vec<i32> {
    engine
        .versions
        .list_all_versions(content_id)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version_number)
        .collect()
}
