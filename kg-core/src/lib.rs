//! Core types, identifiers, and the error taxonomy shared by every component
//! of the knowledge-graph ingestion and query engine.
//!
//! This crate has no async runtime and no storage dependency: it is the
//! vocabulary the other crates (`kg-graph`, `kg-ingest`, `kg-jobs`, ...)
//! build on, so that a dynamic row object from a graph driver never has to
//! travel past the storage adapter that produced it.

pub mod edges;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod types;

pub use error::{CoreError, Result};
