//! Core data types for the Atlas project graph.
//!
//! This crate defines the values a project graph is built from: the version
//! specification algebra, project references, typed relationships and the
//! per-project relationship collection, dependency scopes, relationship
//! filters and user configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod filter;
pub mod refs;
pub mod relationship;
pub mod relationships;
pub mod scope;
pub mod version;
