//! Finding variable/selected relationship pairs for a set of roots.
//!
//! Walking outward from the start vertices (the roots unless told
//! otherwise), an accepted edge marked deselected for any root becomes the
//! variable half of a pair and one marked selected becomes the selected
//! half. Pairs are keyed by the declaring vertex and the target project, so
//! one project may carry several selections. Marked edges are dead ends.
//! Keys ending up with both halves yield a [`SelectionInfo`]; the rest are
//! reported and skipped. Paths whose start vertex is not a root are ignored.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use atlas_core::filter::FilterRef;
use atlas_core::refs::{ProjectRef, ProjectVersionRef};
use atlas_util::errors::AtlasError;

use crate::conversions::{is_deselected_for, is_selected_for, to_project_version_ref};
use crate::driver::{Direction, DriverRef, EdgeId, GraphDriver, VertexId};
use crate::report::SelectionReport;
use crate::traverse::{accepted_steps, Step, VisitedSet};

/// A variable relationship and the one selected in its place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionInfo {
    pub variable_target: ProjectVersionRef,
    pub variable_edge: EdgeId,
    pub selected_target: ProjectVersionRef,
    pub selected_edge: EdgeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Variable,
    Selected,
}

impl Half {
    fn name(self) -> &'static str {
        match self {
            Half::Variable => "variable",
            Half::Selected => "selected",
        }
    }
}

type PairKey = (VertexId, ProjectRef);

#[derive(Debug, Default, Clone, Copy)]
struct RawPair {
    variable: Option<EdgeId>,
    selected: Option<EdgeId>,
}

/// Pending steps out of one vertex, with the start of the path that reached it.
struct Frame {
    start: VertexId,
    steps: std::vec::IntoIter<Step>,
}

/// Collects selection pairs reachable from a set of roots.
///
/// A finder runs once; its results are cached until
/// [`clear_selection_infos`](Self::clear_selection_infos).
#[derive(Debug)]
pub struct SelectionFinder {
    driver: DriverRef,
    roots: Vec<VertexId>,
    starts: Option<Vec<VertexId>>,
    filter: FilterRef,
    direction: Direction,
    visited: VisitedSet,
    raw: BTreeMap<PairKey, RawPair>,
    conflicted: BTreeSet<PairKey>,
    inconsistencies: Vec<AtlasError>,
    infos: Option<BTreeSet<SelectionInfo>>,
}

impl SelectionFinder {
    pub fn new<I>(driver: DriverRef, roots: I, filter: FilterRef) -> Self
    where
        I: IntoIterator<Item = VertexId>,
    {
        Self::with_direction(driver, roots.into_iter().collect(), filter, Direction::Outgoing)
    }

    fn with_direction(
        driver: DriverRef,
        roots: Vec<VertexId>,
        filter: FilterRef,
        direction: Direction,
    ) -> Self {
        Self {
            driver,
            roots,
            starts: None,
            filter,
            direction,
            visited: VisitedSet::new(),
            raw: BTreeMap::new(),
            conflicted: BTreeSet::new(),
            inconsistencies: Vec::new(),
            infos: None,
        }
    }

    /// Walk from `starts` instead of the roots. Markers are still read
    /// against the roots, and paths starting elsewhere are dropped.
    pub fn starting_from<I>(mut self, starts: I) -> Self
    where
        I: IntoIterator<Item = VertexId>,
    {
        self.starts = Some(starts.into_iter().collect());
        self.infos = None;
        self
    }

    /// A fresh finder over the same roots, walking edges the other way.
    pub fn reverse(&self) -> Self {
        let mut reversed = Self::with_direction(
            self.driver.clone(),
            self.roots.clone(),
            self.filter.clone(),
            self.direction.reverse(),
        );
        reversed.starts = self.starts.clone();
        reversed
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn roots(&self) -> &[VertexId] {
        &self.roots
    }

    /// Pairs reachable from the roots, computed on first call.
    pub fn selection_infos(&mut self) -> &BTreeSet<SelectionInfo> {
        if self.infos.is_none() {
            self.run();
        }
        self.infos.get_or_insert_with(BTreeSet::new)
    }

    /// Drop cached results so the next call walks the store again.
    pub fn clear_selection_infos(&mut self) {
        self.infos = None;
        self.visited = VisitedSet::new();
        self.raw.clear();
        self.conflicted.clear();
        self.inconsistencies.clear();
    }

    /// Problems met during the last run.
    pub fn inconsistencies(&self) -> &[AtlasError] {
        &self.inconsistencies
    }

    pub fn report(&mut self) -> SelectionReport {
        let infos: Vec<SelectionInfo> = self.selection_infos().iter().cloned().collect();
        let problems = self.inconsistencies.iter().map(ToString::to_string).collect();
        SelectionReport::new(infos, problems)
    }

    fn run(&mut self) {
        let driver = self.driver.clone();
        let root_ids: Vec<VertexId> = driver.vertices_for_roots(&self.roots).into_iter().collect();
        let start_ids: Vec<VertexId> = match &self.starts {
            Some(starts) => driver.vertices_for_roots(starts).into_iter().collect(),
            None => root_ids.clone(),
        };
        for start in start_ids {
            if self.visited.visit(start) {
                self.walk(driver.as_ref(), start, &root_ids);
            }
        }
        let infos = self.collect(driver.as_ref());
        debug!(
            "selection scan from {:?} found {} pair(s)",
            self.roots,
            infos.len()
        );
        self.infos = Some(infos);
    }

    // Depth-first over an explicit stack. Every frame carries the vertex
    // its path started from.
    fn walk(&mut self, driver: &dyn GraphDriver, start: VertexId, roots: &[VertexId]) {
        let filter = self.filter.clone();
        let mut stack = vec![self.frame(driver, start, start, &filter)];

        while let Some(top) = stack.last_mut() {
            let Some(step) = top.steps.next() else {
                stack.pop();
                continue;
            };
            let path_start = top.start;
            if !roots.contains(&path_start) {
                debug!("ignoring path from {path_start}: not one of the configured roots");
                stack.pop();
                continue;
            }
            if !self.visited.visit(step.next) {
                continue;
            }
            if is_deselected_for(driver, step.edge, roots) {
                self.record(driver, &step, Half::Variable);
                continue;
            }
            if is_selected_for(driver, step.edge, roots) {
                self.record(driver, &step, Half::Selected);
                continue;
            }
            let frame = self.frame(driver, path_start, step.next, &step.child_filter);
            stack.push(frame);
        }
    }

    fn frame(
        &mut self,
        driver: &dyn GraphDriver,
        start: VertexId,
        vertex: VertexId,
        filter: &FilterRef,
    ) -> Frame {
        let steps = accepted_steps(driver, vertex, self.direction, filter, &mut self.inconsistencies);
        Frame {
            start,
            steps: steps.into_iter(),
        }
    }

    fn record(&mut self, driver: &dyn GraphDriver, step: &Step, half: Half) {
        let Some((declaring, _)) = driver.edge_endpoints(step.edge) else {
            return;
        };
        let edge = step.edge;
        let target = step.relationship.target().project().clone();
        let pair = self.raw.entry((declaring, target.clone())).or_default();
        let slot = match half {
            Half::Variable => &mut pair.variable,
            Half::Selected => &mut pair.selected,
        };
        match *slot {
            Some(existing) if existing != edge => {
                let e = AtlasError::InconsistentGraphState {
                    message: format!(
                        "vertex {declaring} has more than one {} relationship to {target} (edges {existing} and {edge})",
                        half.name()
                    ),
                };
                warn!("{e}");
                self.inconsistencies.push(e);
                self.conflicted.insert((declaring, target));
            }
            _ => *slot = Some(edge),
        }
    }

    fn collect(&mut self, driver: &dyn GraphDriver) -> BTreeSet<SelectionInfo> {
        let mut infos = BTreeSet::new();
        for (key, pair) in &self.raw {
            if self.conflicted.contains(key) {
                continue;
            }
            let (vertex, target) = key;
            let (Some(variable_edge), Some(selected_edge)) = (pair.variable, pair.selected) else {
                let e = AtlasError::InconsistentGraphState {
                    message: format!(
                        "vertex {vertex} has a {} relationship to {target} with no counterpart",
                        if pair.variable.is_some() { "variable" } else { "selected" }
                    ),
                };
                warn!("{e}");
                self.inconsistencies.push(e);
                continue;
            };
            match (
                target_of(driver, variable_edge),
                target_of(driver, selected_edge),
            ) {
                (Ok(variable_target), Ok(selected_target)) => {
                    infos.insert(SelectionInfo {
                        variable_target,
                        variable_edge,
                        selected_target,
                        selected_edge,
                    });
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("skipping selection pair at vertex {vertex}: {e}");
                    self.inconsistencies.push(e);
                }
            }
        }
        infos
    }
}

fn target_of(driver: &dyn GraphDriver, edge: EdgeId) -> Result<ProjectVersionRef, AtlasError> {
    let (_, end) = driver
        .edge_endpoints(edge)
        .ok_or_else(|| AtlasError::InconsistentGraphState {
            message: format!("edge {edge} has no endpoints"),
        })?;
    to_project_version_ref(driver, end)
}
