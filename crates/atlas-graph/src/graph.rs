//! Project graphs: one root project's filtered view over a driver.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, warn};

use atlas_core::filter::{AnyFilter, FilterRef};
use atlas_core::refs::ProjectVersionRef;
use atlas_core::relationship::ProjectRelationship;
use atlas_core::relationships::{ProjectKey, ProjectRelationships};
use atlas_core::version::SingleVersion;
use atlas_util::errors::{AtlasError, AtlasResult};
use atlas_util::hash::id_set_hash;

use crate::conversions::{
    find_project_vertex, inject_cycle, injected_cycles, mark_clone_of, mark_deselected_for,
    mark_selected_for, metadata, metadata_map, project_vertex, remove_selection_annotations_for,
    set_metadata, to_project_relationship, write_cycle_summary, write_relationship,
};
use crate::cycle::CycleDetector;
use crate::driver::{Direction, DriverRef, EdgeId, GraphDriver, VertexId};
use crate::report::SelectionReport;
use crate::selection::{SelectionFinder, SelectionInfo};
use crate::traverse::find_path;

/// A closed path of relationships.
///
/// Two cycles are the same cycle when they traverse the same set of edges,
/// whatever order or root they were found from.
#[derive(Debug, Clone)]
pub struct ProjectCycle {
    edges: Vec<EdgeId>,
    relationships: Vec<ProjectRelationship>,
}

impl ProjectCycle {
    fn load(driver: &dyn GraphDriver, edges: Vec<EdgeId>) -> AtlasResult<Self> {
        let relationships = edges
            .iter()
            .map(|e| to_project_relationship(driver, *e))
            .collect::<AtlasResult<Vec<_>>>()?;
        Ok(Self {
            edges,
            relationships,
        })
    }

    fn edge_set(&self) -> BTreeSet<EdgeId> {
        self.edges.iter().copied().collect()
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn relationships(&self) -> &[ProjectRelationship] {
        &self.relationships
    }

    /// Content id over the cycle's edge set.
    pub fn id(&self) -> String {
        id_set_hash(self.edges.iter().copied())
    }

    pub fn contains(&self, rel: &ProjectRelationship) -> bool {
        self.relationships.contains(rel)
    }

    /// Every declaring and target project along the cycle.
    pub fn participating_projects(&self) -> BTreeSet<ProjectVersionRef> {
        self.relationships
            .iter()
            .flat_map(|r| [r.declaring().clone(), r.target().clone()])
            .collect()
    }
}

impl PartialEq for ProjectCycle {
    fn eq(&self, other: &Self) -> bool {
        self.edge_set() == other.edge_set()
    }
}

impl Eq for ProjectCycle {}

impl Hash for ProjectCycle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.edge_set().hash(state);
    }
}

impl PartialOrd for ProjectCycle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProjectCycle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.edge_set().cmp(&other.edge_set())
    }
}

impl fmt::Display for ProjectCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cycle [")?;
        for (i, rel) in self.relationships.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", rel.declaring())?;
            }
            write!(f, " -> {}", rel.target())?;
        }
        write!(f, "]")
    }
}

/// Cached result of walking the graph under its current filter.
#[derive(Debug)]
struct View {
    accepted: BTreeSet<EdgeId>,
    cycles: BTreeSet<ProjectCycle>,
}

pub struct ProjectGraphBuilder {
    key: ProjectKey,
    driver: DriverRef,
    relationships: Vec<ProjectRelationship>,
    filter: Option<FilterRef>,
    metadata: BTreeMap<String, String>,
}

impl ProjectGraphBuilder {
    pub fn new(key: ProjectKey, driver: DriverRef) -> Self {
        Self {
            key,
            driver,
            relationships: Vec::new(),
            filter: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Relationships to store, kept with their own declaring projects.
    pub fn with_relationships<I>(mut self, relationships: I) -> Self
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        self.relationships.extend(relationships);
        self
    }

    pub fn with_project_relationships(self, relationships: &ProjectRelationships) -> Self {
        self.with_relationships(relationships.all_relationships())
    }

    pub fn with_filter(mut self, filter: FilterRef) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> AtlasResult<ProjectGraph> {
        let root = project_vertex(self.driver.as_ref(), self.key.project(), true)?;
        for (key, value) in &self.metadata {
            set_metadata(self.driver.as_ref(), root, key, value)?;
        }
        let mut graph = ProjectGraph {
            key: self.key,
            driver: self.driver,
            root,
            filter: self.filter.unwrap_or_else(AnyFilter::shared),
            view: None,
            selection: None,
        };
        graph.add_relationships(self.relationships)?;
        Ok(graph)
    }
}

/// The graph rooted at one project, seen through a relationship filter.
///
/// Several graphs may share one driver; everything a graph learns about
/// cycles and selections is written back to the store.
#[derive(Debug)]
pub struct ProjectGraph {
    key: ProjectKey,
    driver: DriverRef,
    root: VertexId,
    filter: FilterRef,
    view: Option<View>,
    selection: Option<SelectionFinder>,
}

impl ProjectGraph {
    pub fn builder(key: ProjectKey, driver: DriverRef) -> ProjectGraphBuilder {
        ProjectGraphBuilder::new(key, driver)
    }

    pub fn key(&self) -> &ProjectKey {
        &self.key
    }

    pub fn project(&self) -> &ProjectVersionRef {
        self.key.project()
    }

    pub fn root_vertex(&self) -> VertexId {
        self.root
    }

    pub fn driver(&self) -> &DriverRef {
        &self.driver
    }

    pub fn filter(&self) -> &FilterRef {
        &self.filter
    }

    /// Replace the filter. Cached cycles and selections are dropped since
    /// acceptance depends on it.
    pub fn set_filter(&mut self, filter: FilterRef) {
        debug!("graph {} now filtered by {}", self.project(), filter.render());
        self.filter = filter;
        self.invalidate();
    }

    /// Forget cached results; the next query walks the store again.
    pub fn invalidate(&mut self) {
        self.view = None;
        self.selection = None;
    }

    /// Store relationships, returning the cycles they close. Terminus
    /// parents are not stored as edges.
    ///
    /// Cycles are detected over the unfiltered store; [`cycles`](Self::cycles)
    /// reports only those visible through this graph's filter.
    pub fn add_relationships<I>(&mut self, relationships: I) -> AtlasResult<BTreeSet<ProjectCycle>>
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        let mut introduced = BTreeSet::new();
        for rel in relationships {
            if let Some(cycle) = self.store(&rel)?.1 {
                introduced.insert(cycle);
            }
        }
        self.invalidate();
        Ok(introduced)
    }

    fn store(&self, rel: &ProjectRelationship) -> AtlasResult<(Option<EdgeId>, Option<ProjectCycle>)> {
        let driver = self.driver.as_ref();
        let from = project_vertex(driver, rel.declaring(), true)?;
        if rel.is_terminus() {
            return Ok((None, None));
        }
        let to = project_vertex(driver, rel.target(), false)?;
        let (edge, created) = driver.create_edge(from, to, &rel.id())?;
        if !created {
            return Ok((Some(edge), None));
        }
        write_relationship(driver, edge, rel)?;

        let Some(path) = find_path(driver, to, from, Direction::Outgoing) else {
            return Ok((Some(edge), None));
        };
        let mut edges = vec![edge];
        edges.extend(path);
        for e in &edges {
            inject_cycle(driver, *e, &edges)?;
        }
        let cycle = ProjectCycle::load(driver, edges)?;
        write_cycle_summary(driver, &cycle.id(), cycle.edges(), &cycle.participating_projects())?;
        debug!("{rel} closes {cycle}");
        Ok((Some(edge), Some(cycle)))
    }

    /// Whether storing `rel` would close a cycle, without storing it.
    pub fn introduces_cycle(&self, rel: &ProjectRelationship) -> bool {
        if rel.is_terminus() {
            return false;
        }
        if rel.declaring() == rel.target() {
            return true;
        }
        let driver = self.driver.as_ref();
        match (
            find_project_vertex(driver, rel.declaring()),
            find_project_vertex(driver, rel.target()),
        ) {
            (Some(from), Some(to)) => find_path(driver, to, from, Direction::Outgoing).is_some(),
            _ => false,
        }
    }

    fn view(&mut self) -> AtlasResult<&View> {
        let view = match self.view.take() {
            Some(view) => view,
            None => self.scan()?,
        };
        Ok(self.view.insert(view))
    }

    fn scan(&self) -> AtlasResult<View> {
        let driver = self.driver.as_ref();
        let scan = CycleDetector::new(self.driver.clone(), [self.root], self.filter.clone()).run()?;

        let mut candidates: Vec<Vec<EdgeId>> = scan.cycles;
        for edge in &scan.accepted {
            candidates.extend(injected_cycles(driver, *edge));
        }

        let mut cycles = BTreeSet::new();
        for edges in candidates {
            if !edges.iter().all(|e| scan.accepted.contains(e)) {
                continue;
            }
            match ProjectCycle::load(driver, edges) {
                Ok(cycle) => {
                    cycles.insert(cycle);
                }
                Err(e) => warn!("skipping unreadable cycle: {e}"),
            }
        }
        Ok(View {
            accepted: scan.accepted,
            cycles,
        })
    }

    /// Cycles whose every edge this graph's filter accepts.
    pub fn cycles(&mut self) -> AtlasResult<BTreeSet<ProjectCycle>> {
        Ok(self.view()?.cycles.clone())
    }

    /// Relationships reachable from the root through the filter.
    pub fn relationships(&mut self) -> AtlasResult<Vec<ProjectRelationship>> {
        let accepted = self.view()?.accepted.clone();
        let driver = self.driver.as_ref();
        Ok(accepted
            .into_iter()
            .filter_map(|edge| match to_project_relationship(driver, edge) {
                Ok(rel) => Some(rel),
                Err(e) => {
                    warn!("skipping edge {edge}: {e}");
                    None
                }
            })
            .collect())
    }

    /// The root plus every project on a reachable relationship.
    pub fn all_projects(&mut self) -> AtlasResult<BTreeSet<ProjectVersionRef>> {
        let mut projects = BTreeSet::from([self.project().clone()]);
        for rel in self.relationships()? {
            projects.insert(rel.declaring().clone());
            projects.insert(rel.target().clone());
        }
        Ok(projects)
    }

    fn finder(&mut self) -> &mut SelectionFinder {
        let (driver, root, filter) = (self.driver.clone(), self.root, self.filter.clone());
        self.selection
            .get_or_insert_with(|| SelectionFinder::new(driver, [root], filter))
    }

    pub fn selection_infos(&mut self) -> BTreeSet<SelectionInfo> {
        self.finder().selection_infos().clone()
    }

    pub fn selection_report(&mut self) -> SelectionReport {
        self.finder().report()
    }

    fn edge_for(&self, rel: &ProjectRelationship) -> AtlasResult<EdgeId> {
        self.driver
            .edge_by_key(&rel.id())
            .ok_or_else(|| AtlasError::InconsistentGraphState {
                message: format!("relationship is not stored: {rel}"),
            })
    }

    pub fn mark_selected(&mut self, rel: &ProjectRelationship) -> AtlasResult<()> {
        let edge = self.edge_for(rel)?;
        mark_selected_for(self.driver.as_ref(), edge, self.root)?;
        self.selection = None;
        Ok(())
    }

    pub fn mark_deselected(&mut self, rel: &ProjectRelationship) -> AtlasResult<()> {
        let edge = self.edge_for(rel)?;
        mark_deselected_for(self.driver.as_ref(), edge, self.root)?;
        self.selection = None;
        Ok(())
    }

    pub fn clear_selection(&mut self, rel: &ProjectRelationship) -> AtlasResult<()> {
        let edge = self.edge_for(rel)?;
        remove_selection_annotations_for(self.driver.as_ref(), edge, self.root)?;
        self.selection = None;
        Ok(())
    }

    /// Pin a variable relationship to `version` for this graph's root.
    ///
    /// Stores a clone of `variable` targeting the selected version, marks the
    /// clone selected and the original deselected, and returns the clone.
    pub fn select_version(
        &mut self,
        variable: &ProjectRelationship,
        version: &SingleVersion,
    ) -> AtlasResult<ProjectRelationship> {
        let original = self.edge_for(variable)?;
        let target = variable.target().select_version(version)?;
        let selected = variable.with_target(target);
        if selected == *variable {
            return Err(AtlasError::InvalidReference {
                message: format!("{variable} already targets {version}"),
            });
        }

        let (edge, _) = self.store(&selected)?;
        let edge = edge.ok_or_else(|| AtlasError::InconsistentGraphState {
            message: format!("selected relationship was not stored: {selected}"),
        })?;
        let driver = self.driver.as_ref();
        mark_clone_of(driver, edge, original)?;
        mark_deselected_for(driver, original, self.root)?;
        mark_selected_for(driver, edge, self.root)?;
        self.invalidate();
        Ok(selected)
    }

    pub fn metadata(&self, key: &str) -> Option<String> {
        metadata(self.driver.as_ref(), self.root, key)
    }

    pub fn metadata_map(&self) -> BTreeMap<String, String> {
        metadata_map(self.driver.as_ref(), self.root)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> AtlasResult<()> {
        set_metadata(self.driver.as_ref(), self.root, key, value)
    }
}
