//! Row structs for the vellum tables.
//!
//! Each submodule holds a `FromRow` struct matching the table's columns and
//! the conversion into its `vellum-core` domain type.

pub mod collection;
pub mod content;
pub mod lock;
pub mod version;
