//! Traversal primitives shared by cycle detection and selection.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{trace, warn};

use atlas_core::filter::FilterRef;
use atlas_core::relationship::ProjectRelationship;
use atlas_util::errors::AtlasError;

use crate::conversions::to_project_relationship;
use crate::driver::{Direction, EdgeId, GraphDriver, VertexId};

/// Tracks which vertices a run has reached, so each is expanded at most once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    visited: HashSet<VertexId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a vertex as visited. Returns `false` if already visited.
    pub fn visit(&mut self, vertex: VertexId) -> bool {
        self.visited.insert(vertex)
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.visited.contains(&vertex)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// One edge a filter accepted, with the filter for the edges beyond it.
#[derive(Debug, Clone)]
pub struct Step {
    pub edge: EdgeId,
    pub next: VertexId,
    pub relationship: ProjectRelationship,
    pub child_filter: FilterRef,
}

/// Accepted edges leaving `vertex` in `direction`.
///
/// Edges that cannot be read back as relationships are skipped; the error
/// is logged and appended to `inconsistencies`.
pub fn accepted_steps(
    driver: &dyn GraphDriver,
    vertex: VertexId,
    direction: Direction,
    filter: &FilterRef,
    inconsistencies: &mut Vec<AtlasError>,
) -> Vec<Step> {
    let mut steps = Vec::new();
    for edge in driver.edges_of(vertex, direction) {
        let Some((start, end)) = driver.edge_endpoints(edge) else {
            continue;
        };
        let relationship = match to_project_relationship(driver, edge) {
            Ok(rel) => rel,
            Err(e) => {
                warn!("skipping edge {edge}: {e}");
                inconsistencies.push(e);
                continue;
            }
        };
        if !filter.accept(&relationship) {
            trace!("{} rejected {relationship}", filter.render());
            continue;
        }
        trace!("{} accepted {relationship}", filter.render());
        let child_filter = Arc::clone(filter).child_filter(&relationship);
        let next = match direction {
            Direction::Outgoing => end,
            Direction::Incoming => start,
        };
        steps.push(Step {
            edge,
            next,
            relationship,
            child_filter,
        });
    }
    steps
}

/// Shortest unfiltered path of edges from `from` to `to`, if any.
pub fn find_path(
    driver: &dyn GraphDriver,
    from: VertexId,
    to: VertexId,
    direction: Direction,
) -> Option<Vec<EdgeId>> {
    if from == to {
        return Some(Vec::new());
    }
    let mut visited = VisitedSet::new();
    visited.visit(from);
    let mut queue: VecDeque<(VertexId, Vec<EdgeId>)> = VecDeque::from([(from, Vec::new())]);
    while let Some((vertex, path)) = queue.pop_front() {
        for edge in driver.edges_of(vertex, direction) {
            let Some((start, end)) = driver.edge_endpoints(edge) else {
                continue;
            };
            let next = match direction {
                Direction::Outgoing => end,
                Direction::Incoming => start,
            };
            let mut extended = path.clone();
            extended.push(edge);
            if next == to {
                return Some(extended);
            }
            if visited.visit(next) {
                queue.push_back((next, extended));
            }
        }
    }
    None
}
