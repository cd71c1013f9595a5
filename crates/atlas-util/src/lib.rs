//! Shared utilities for the Atlas dependency-graph engine.
//!
//! This crate provides cross-cutting concerns used by the other Atlas crates:
//! the unified error type and the content hashing used for stable
//! relationship ids.

pub mod errors;
pub mod hash;
