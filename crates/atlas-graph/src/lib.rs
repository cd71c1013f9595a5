//! Project graph engine: the graph driver boundary, an in-memory driver,
//! the attribute schema written onto vertices and edges, cycle detection
//! and version-selection discovery.
//!
//! Graphs built over one globally-backed driver share cycles and selection
//! markers through the store.

pub mod conversions;
pub mod cycle;
pub mod driver;
pub mod graph;
pub mod memory;
pub mod report;
pub mod selection;
pub mod traverse;
