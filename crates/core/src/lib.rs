//! Domain types and pure logic for the Vellum content engine.
//!
//! This crate has no storage dependencies. It defines the content, version,
//! release and lock models, the validation rules and diff/retention logic
//! shared by every layer, and the storage traits the engine is built against.

pub mod content;
pub mod diff;
pub mod error;
pub mod locking;
pub mod purge;
pub mod releases;
pub mod store;
pub mod types;
pub mod versioning;
