//! The graph driver boundary.
//!
//! The engine never touches storage directly: it reads and writes vertices,
//! edges and their attributes through a [`GraphDriver`]. Drivers own their
//! locking; every method takes `&self` so one driver can back several
//! graphs at once.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use atlas_util::errors::AtlasResult;

pub type VertexId = u64;
pub type EdgeId = u64;

/// Shared handle to a driver.
pub type DriverRef = Arc<dyn GraphDriver>;

/// Traversal direction along stored edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
        }
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Ids(Vec<i64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&[i64]> {
        match self {
            AttrValue::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Storage operations the engine relies on.
///
/// Vertices and edges are identified by string keys supplied by the caller
/// (rendered project coordinates and relationship ids respectively); the
/// driver hands out numeric ids for them.
pub trait GraphDriver: Send + Sync + fmt::Debug {
    /// Whether this store is shared by independently built graphs.
    fn is_globally_backed(&self) -> bool;

    fn vertex_by_key(&self, key: &str) -> Option<VertexId>;

    /// Look up or create the vertex for `key`. The flag is `true` when the
    /// vertex was created by this call.
    fn get_or_create_vertex(&self, key: &str) -> (VertexId, bool);

    fn vertices(&self) -> Vec<VertexId>;

    fn edge_by_key(&self, key: &str) -> Option<EdgeId>;

    /// Look up or create the edge for `key` between two existing vertices.
    /// The flag is `true` when the edge was created by this call.
    fn create_edge(&self, from: VertexId, to: VertexId, key: &str) -> AtlasResult<(EdgeId, bool)>;

    fn edges_of(&self, vertex: VertexId, direction: Direction) -> Vec<EdgeId>;

    /// `(start, end)` of an edge.
    fn edge_endpoints(&self, edge: EdgeId) -> Option<(VertexId, VertexId)>;

    fn vertex_attr(&self, vertex: VertexId, name: &str) -> Option<AttrValue>;
    fn set_vertex_attr(&self, vertex: VertexId, name: &str, value: AttrValue) -> AtlasResult<()>;
    fn remove_vertex_attr(&self, vertex: VertexId, name: &str) -> Option<AttrValue>;
    fn vertex_attr_names(&self, vertex: VertexId) -> Vec<String>;

    fn edge_attr(&self, edge: EdgeId, name: &str) -> Option<AttrValue>;
    fn set_edge_attr(&self, edge: EdgeId, name: &str, value: AttrValue) -> AtlasResult<()>;
    fn remove_edge_attr(&self, edge: EdgeId, name: &str) -> Option<AttrValue>;
    fn edge_attr_names(&self, edge: EdgeId) -> Vec<String>;

    /// Whether the id listing `name` on `edge` holds any of `targets`.
    fn id_listing_contains(&self, name: &str, edge: EdgeId, targets: &[i64]) -> bool {
        self.edge_attr(edge, name)
            .and_then(|v| v.as_ids().map(|ids| ids.iter().any(|id| targets.contains(id))))
            .unwrap_or(false)
    }

    /// Add ids to the listing `name` on `edge`, skipping ids already present.
    fn add_to_id_listing(&self, name: &str, edge: EdgeId, ids: &[i64]) -> AtlasResult<()> {
        let mut listing = self
            .edge_attr(edge, name)
            .and_then(|v| v.as_ids().map(<[i64]>::to_vec))
            .unwrap_or_default();
        for id in ids {
            if !listing.contains(id) {
                listing.push(*id);
            }
        }
        self.set_edge_attr(edge, name, AttrValue::Ids(listing))
    }

    /// Remove ids from the listing `name` on `edge`.
    fn remove_from_id_listing(&self, name: &str, edge: EdgeId, ids: &[i64]) -> AtlasResult<()> {
        let Some(listing) = self
            .edge_attr(edge, name)
            .and_then(|v| v.as_ids().map(<[i64]>::to_vec))
        else {
            return Ok(());
        };
        let kept: Vec<i64> = listing.into_iter().filter(|id| !ids.contains(id)).collect();
        self.set_edge_attr(edge, name, AttrValue::Ids(kept))
    }

    /// The subset of `roots` that exist in this store.
    fn vertices_for_roots(&self, roots: &[VertexId]) -> BTreeSet<VertexId> {
        let known: BTreeSet<VertexId> = self.vertices().into_iter().collect();
        roots.iter().copied().filter(|r| known.contains(r)).collect()
    }
}
