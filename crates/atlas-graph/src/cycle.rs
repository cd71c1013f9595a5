//! Cycle discovery over a filtered view of the store.
//!
//! A depth-first walk from the roots keeps the current path. An accepted
//! edge leading back to a vertex already on that path closes a cycle: the
//! edges from that vertex onward plus the closing edge. Every cycle found is
//! injected onto each of its edges so later graphs sharing the store can
//! see it.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use atlas_core::filter::FilterRef;
use atlas_util::errors::{AtlasError, AtlasResult};

use crate::conversions::inject_cycle;
use crate::driver::{Direction, DriverRef, EdgeId, VertexId};
use crate::traverse::{accepted_steps, Step, VisitedSet};

/// Outcome of one detection run.
#[derive(Debug, Default)]
pub struct CycleScan {
    /// Every edge the filter accepted somewhere on a walked path.
    pub accepted: BTreeSet<EdgeId>,
    /// Cycles found by this run, as edge lists in path order.
    pub cycles: Vec<Vec<EdgeId>>,
    /// Unreadable edges met along the way.
    pub inconsistencies: Vec<AtlasError>,
}

/// One vertex on the current path, with the accepted steps not yet taken
/// from it. Each step carries the narrowed filter for the vertex it leads to.
struct Frame {
    vertex: VertexId,
    entered_by: Option<EdgeId>,
    steps: std::vec::IntoIter<Step>,
}

#[derive(Debug, Clone)]
pub struct CycleDetector {
    driver: DriverRef,
    roots: Vec<VertexId>,
    filter: FilterRef,
    direction: Direction,
}

impl CycleDetector {
    pub fn new<I>(driver: DriverRef, roots: I, filter: FilterRef) -> Self
    where
        I: IntoIterator<Item = VertexId>,
    {
        Self {
            driver,
            roots: roots.into_iter().collect(),
            filter,
            direction: Direction::Outgoing,
        }
    }

    /// The same detector walking edges the other way.
    pub fn reverse(&self) -> Self {
        Self {
            direction: self.direction.reverse(),
            ..self.clone()
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn run(&self) -> AtlasResult<CycleScan> {
        let mut visited = VisitedSet::new();
        let mut scan = CycleScan::default();
        for root in self.driver.vertices_for_roots(&self.roots) {
            if visited.visit(root) {
                self.walk(root, &mut visited, &mut scan)?;
            }
        }
        debug!(
            "cycle scan from {:?} visited {} vertices, found {} cycle(s)",
            self.roots,
            visited.len(),
            scan.cycles.len()
        );
        Ok(scan)
    }

    fn frame(
        &self,
        vertex: VertexId,
        entered_by: Option<EdgeId>,
        filter: &FilterRef,
        scan: &mut CycleScan,
    ) -> Frame {
        let steps = accepted_steps(
            self.driver.as_ref(),
            vertex,
            self.direction,
            filter,
            &mut scan.inconsistencies,
        );
        Frame {
            vertex,
            entered_by,
            steps: steps.into_iter(),
        }
    }

    // Depth-first over an explicit stack; `on_path` maps each vertex on the
    // current path to its stack position.
    fn walk(
        &self,
        root: VertexId,
        visited: &mut VisitedSet,
        scan: &mut CycleScan,
    ) -> AtlasResult<()> {
        let mut stack = vec![self.frame(root, None, &self.filter, scan)];
        let mut on_path: HashMap<VertexId, usize> = HashMap::from([(root, 0)]);

        while let Some(top) = stack.last_mut() {
            let Some(step) = top.steps.next() else {
                let done = top.vertex;
                stack.pop();
                on_path.remove(&done);
                continue;
            };
            scan.accepted.insert(step.edge);

            if let Some(&pos) = on_path.get(&step.next) {
                let mut cycle: Vec<EdgeId> =
                    stack[pos + 1..].iter().filter_map(|f| f.entered_by).collect();
                cycle.push(step.edge);
                self.record(cycle, scan)?;
                continue;
            }

            if !visited.visit(step.next) {
                continue;
            }
            on_path.insert(step.next, stack.len());
            let frame = self.frame(step.next, Some(step.edge), &step.child_filter, scan);
            stack.push(frame);
        }
        Ok(())
    }

    fn record(&self, cycle: Vec<EdgeId>, scan: &mut CycleScan) -> AtlasResult<()> {
        let edges: BTreeSet<EdgeId> = cycle.iter().copied().collect();
        if scan
            .cycles
            .iter()
            .any(|c| c.iter().copied().collect::<BTreeSet<_>>() == edges)
        {
            return Ok(());
        }
        for edge in &cycle {
            inject_cycle(self.driver.as_ref(), *edge, &cycle)?;
        }
        scan.cycles.push(cycle);
        Ok(())
    }
}
