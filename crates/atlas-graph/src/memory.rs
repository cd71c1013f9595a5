//! In-memory graph driver backed by petgraph.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PetDirection;
use tracing::debug;

use atlas_core::config::{AtlasConfig, StoreConfig};
use atlas_util::errors::{AtlasError, AtlasResult};

use crate::driver::{AttrValue, Direction, DriverRef, EdgeId, GraphDriver, VertexId};

/// Attributes of a stored vertex or edge.
#[derive(Debug, Clone, Default)]
struct Element {
    attrs: BTreeMap<String, AttrValue>,
}

#[derive(Debug, Default)]
struct Store {
    graph: DiGraph<Element, Element>,
    vertex_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
}

impl Store {
    fn node(&self, vertex: VertexId) -> Option<NodeIndex> {
        let idx = NodeIndex::new(usize::try_from(vertex).ok()?);
        self.graph.node_weight(idx).map(|_| idx)
    }

    fn edge(&self, edge: EdgeId) -> Option<EdgeIndex> {
        let idx = EdgeIndex::new(usize::try_from(edge).ok()?);
        self.graph.edge_weight(idx).map(|_| idx)
    }
}

fn vertex_id(idx: NodeIndex) -> VertexId {
    idx.index() as VertexId
}

fn edge_id(idx: EdgeIndex) -> EdgeId {
    idx.index() as EdgeId
}

fn missing(what: &str, id: u64) -> AtlasError {
    AtlasError::InconsistentGraphState {
        message: format!("no {what} with id {id} in the store"),
    }
}

/// A [`GraphDriver`] holding everything in process memory.
///
/// A globally-backed instance is meant to be cloned (through [`DriverRef`])
/// into every graph that should share it; a private one backs one graph.
#[derive(Debug, Default)]
pub struct MemoryGraphDriver {
    globally_backed: bool,
    store: RwLock<Store>,
}

impl MemoryGraphDriver {
    /// A driver private to a single graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver shared by every graph handed the returned handle.
    pub fn shared() -> DriverRef {
        Arc::new(Self {
            globally_backed: true,
            store: RwLock::default(),
        })
    }

    pub fn private() -> DriverRef {
        Arc::new(Self::new())
    }

    pub fn from_config(config: &StoreConfig) -> DriverRef {
        if config.globally_backed {
            Self::shared()
        } else {
            Self::private()
        }
    }

    /// A driver configured from `~/.atlas/config.toml`.
    pub fn from_user_config() -> miette::Result<DriverRef> {
        let config = AtlasConfig::load()?;
        Ok(Self::from_config(&config.store))
    }

    pub fn vertex_count(&self) -> usize {
        self.read().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.read().graph.edge_count()
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GraphDriver for MemoryGraphDriver {
    fn is_globally_backed(&self) -> bool {
        self.globally_backed
    }

    fn vertex_by_key(&self, key: &str) -> Option<VertexId> {
        self.read().vertex_index.get(key).copied().map(vertex_id)
    }

    fn get_or_create_vertex(&self, key: &str) -> (VertexId, bool) {
        let mut store = self.write();
        if let Some(&idx) = store.vertex_index.get(key) {
            return (vertex_id(idx), false);
        }
        let idx = store.graph.add_node(Element::default());
        store.vertex_index.insert(key.to_string(), idx);
        debug!("created vertex {} for {key}", idx.index());
        (vertex_id(idx), true)
    }

    fn vertices(&self) -> Vec<VertexId> {
        self.read().graph.node_indices().map(vertex_id).collect()
    }

    fn edge_by_key(&self, key: &str) -> Option<EdgeId> {
        self.read().edge_index.get(key).copied().map(edge_id)
    }

    fn create_edge(&self, from: VertexId, to: VertexId, key: &str) -> AtlasResult<(EdgeId, bool)> {
        let mut store = self.write();
        if let Some(&idx) = store.edge_index.get(key) {
            return Ok((edge_id(idx), false));
        }
        let from_idx = store.node(from).ok_or_else(|| missing("vertex", from))?;
        let to_idx = store.node(to).ok_or_else(|| missing("vertex", to))?;
        let idx = store.graph.add_edge(from_idx, to_idx, Element::default());
        store.edge_index.insert(key.to_string(), idx);
        debug!("created edge {} ({from} -> {to})", idx.index());
        Ok((edge_id(idx), true))
    }

    fn edges_of(&self, vertex: VertexId, direction: Direction) -> Vec<EdgeId> {
        let store = self.read();
        let Some(idx) = store.node(vertex) else {
            return Vec::new();
        };
        let direction = match direction {
            Direction::Outgoing => PetDirection::Outgoing,
            Direction::Incoming => PetDirection::Incoming,
        };
        // petgraph yields newest first; keep insertion order.
        let mut edges: Vec<EdgeId> = store
            .graph
            .edges_directed(idx, direction)
            .map(|e| edge_id(e.id()))
            .collect();
        edges.reverse();
        edges
    }

    fn edge_endpoints(&self, edge: EdgeId) -> Option<(VertexId, VertexId)> {
        let store = self.read();
        let idx = store.edge(edge)?;
        store
            .graph
            .edge_endpoints(idx)
            .map(|(from, to)| (vertex_id(from), vertex_id(to)))
    }

    fn vertex_attr(&self, vertex: VertexId, name: &str) -> Option<AttrValue> {
        let store = self.read();
        let idx = store.node(vertex)?;
        store.graph[idx].attrs.get(name).cloned()
    }

    fn set_vertex_attr(&self, vertex: VertexId, name: &str, value: AttrValue) -> AtlasResult<()> {
        let mut store = self.write();
        let idx = store.node(vertex).ok_or_else(|| missing("vertex", vertex))?;
        store.graph[idx].attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn remove_vertex_attr(&self, vertex: VertexId, name: &str) -> Option<AttrValue> {
        let mut store = self.write();
        let idx = store.node(vertex)?;
        store.graph[idx].attrs.remove(name)
    }

    fn vertex_attr_names(&self, vertex: VertexId) -> Vec<String> {
        let store = self.read();
        store
            .node(vertex)
            .map(|idx| store.graph[idx].attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn edge_attr(&self, edge: EdgeId, name: &str) -> Option<AttrValue> {
        let store = self.read();
        let idx = store.edge(edge)?;
        store.graph[idx].attrs.get(name).cloned()
    }

    fn set_edge_attr(&self, edge: EdgeId, name: &str, value: AttrValue) -> AtlasResult<()> {
        let mut store = self.write();
        let idx = store.edge(edge).ok_or_else(|| missing("edge", edge))?;
        store.graph[idx].attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn remove_edge_attr(&self, edge: EdgeId, name: &str) -> Option<AttrValue> {
        let mut store = self.write();
        let idx = store.edge(edge)?;
        store.graph[idx].attrs.remove(name)
    }

    fn edge_attr_names(&self, edge: EdgeId) -> Vec<String> {
        let store = self.read();
        store
            .edge(edge)
            .map(|idx| store.graph[idx].attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    // Listings are read and rewritten under a single write lock.
    fn add_to_id_listing(&self, name: &str, edge: EdgeId, ids: &[i64]) -> AtlasResult<()> {
        let mut store = self.write();
        let idx = store.edge(edge).ok_or_else(|| missing("edge", edge))?;
        let attrs = &mut store.graph[idx].attrs;
        let mut listing = attrs
            .get(name)
            .and_then(|v| v.as_ids().map(<[i64]>::to_vec))
            .unwrap_or_default();
        for id in ids {
            if !listing.contains(id) {
                listing.push(*id);
            }
        }
        attrs.insert(name.to_string(), AttrValue::Ids(listing));
        Ok(())
    }

    fn remove_from_id_listing(&self, name: &str, edge: EdgeId, ids: &[i64]) -> AtlasResult<()> {
        let mut store = self.write();
        let idx = store.edge(edge).ok_or_else(|| missing("edge", edge))?;
        if let Some(AttrValue::Ids(listing)) = store.graph[idx].attrs.get_mut(name) {
            listing.retain(|id| !ids.contains(id));
        }
        Ok(())
    }
}
