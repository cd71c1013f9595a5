//! The attribute schema: how projects, relationships, selection markers and
//! cycles are written onto driver vertices and edges, and read back.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};
use url::Url;

use atlas_core::refs::{ArtifactRef, ProjectRef, ProjectVersionRef};
use atlas_core::relationship::{
    pom_root_uri, unknown_source_uri, ProjectRelationship, RelationshipKind, RelationshipType,
};
use atlas_core::scope::DependencyScope;
use atlas_util::errors::{AtlasError, AtlasResult};

use crate::driver::{AttrValue, EdgeId, GraphDriver, VertexId};

pub const NODE_TYPE: &str = "_node_type";
pub const GROUP_ID: &str = "groupId";
pub const ARTIFACT_ID: &str = "artifactId";
pub const VERSION: &str = "version";
pub const GAV: &str = "gav";
pub const VARIABLE: &str = "_variable";
pub const CONNECTED: &str = "_connected";

pub const REL_TYPE: &str = "_rel_type";
pub const RELATIONSHIP_ID: &str = "relationship_id";
pub const INDEX: &str = "index";
pub const SOURCE_URI: &str = "source_uri";
pub const POM_LOCATION_URI: &str = "pom_location_uri";
pub const IS_MANAGED: &str = "managed";
pub const IS_REPORTING_PLUGIN: &str = "reporting";
pub const PLUGIN_GROUP_ID: &str = "plugin_groupId";
pub const PLUGIN_ARTIFACT_ID: &str = "plugin_artifactId";
pub const TYPE: &str = "type";
pub const CLASSIFIER: &str = "classifier";
pub const SCOPE: &str = "scope";
pub const OPTIONAL: &str = "optional";
pub const EXCLUDES: &str = "excludes";

pub const SELECTED_FOR: &str = "_selected_for";
pub const DESELECTED_FOR: &str = "_deselected_for";
pub const CLONE_OF: &str = "_clone_of";
pub const CYCLE_INJECTION: &str = "_cycle_injection";
pub const CYCLES_INJECTED: &str = "_cycles";

pub const CYCLE_ID: &str = "cycle_id";
pub const CYCLE_RELATIONSHIPS: &str = "relationship_participants";
pub const CYCLE_PROJECTS: &str = "project_participants";

pub const METADATA_PREFIX: &str = "_metadata_";

/// Separates successive cycles in the stored cycle listing.
pub const CYCLE_SEPARATOR: i64 = -1;

/// Vertex discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Project,
    Cycle,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Project => "PROJECT",
            NodeType::Cycle => "CYCLE",
        }
    }
}

fn inconsistent(message: impl Into<String>) -> AtlasError {
    AtlasError::InconsistentGraphState {
        message: message.into(),
    }
}

fn str_attr(driver: &dyn GraphDriver, vertex: VertexId, name: &str) -> Option<String> {
    driver
        .vertex_attr(vertex, name)
        .and_then(|v| v.as_str().map(str::to_string))
}

fn edge_str(driver: &dyn GraphDriver, edge: EdgeId, name: &str) -> Option<String> {
    driver
        .edge_attr(edge, name)
        .and_then(|v| v.as_str().map(str::to_string))
}

fn edge_bool(driver: &dyn GraphDriver, edge: EdgeId, name: &str) -> bool {
    driver
        .edge_attr(edge, name)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Encode a store id for an id listing.
pub fn listing_id(id: u64) -> AtlasResult<i64> {
    i64::try_from(id).map_err(|_| inconsistent(format!("id {id} does not fit an id listing")))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub fn is_type(driver: &dyn GraphDriver, vertex: VertexId, node_type: NodeType) -> bool {
    str_attr(driver, vertex, NODE_TYPE).as_deref() == Some(node_type.name())
}

/// Write `pvr` onto `vertex`.
pub fn write_project(
    driver: &dyn GraphDriver,
    vertex: VertexId,
    pvr: &ProjectVersionRef,
    connected: bool,
) -> AtlasResult<()> {
    driver.set_vertex_attr(vertex, NODE_TYPE, NodeType::Project.name().into())?;
    driver.set_vertex_attr(vertex, GROUP_ID, pvr.group_id().into())?;
    driver.set_vertex_attr(vertex, ARTIFACT_ID, pvr.artifact_id().into())?;
    driver.set_vertex_attr(vertex, VERSION, pvr.version_string().into())?;
    driver.set_vertex_attr(vertex, GAV, pvr.to_string().into())?;
    if pvr.is_variable_version() {
        debug!("marking {pvr} as variable");
        driver.set_vertex_attr(vertex, VARIABLE, true.into())?;
    }
    mark_connected(driver, vertex, connected)
}

/// Find or create the vertex for `pvr`. An existing vertex is only ever
/// upgraded to connected, never back.
pub fn project_vertex(
    driver: &dyn GraphDriver,
    pvr: &ProjectVersionRef,
    connected: bool,
) -> AtlasResult<VertexId> {
    let (vertex, created) = driver.get_or_create_vertex(&pvr.to_string());
    if created {
        write_project(driver, vertex, pvr, connected)?;
    } else if connected && !is_connected(driver, vertex) {
        mark_connected(driver, vertex, true)?;
    }
    Ok(vertex)
}

pub fn find_project_vertex(driver: &dyn GraphDriver, pvr: &ProjectVersionRef) -> Option<VertexId> {
    driver.vertex_by_key(&pvr.to_string())
}

/// Read the project stored on `vertex`.
pub fn to_project_version_ref(
    driver: &dyn GraphDriver,
    vertex: VertexId,
) -> AtlasResult<ProjectVersionRef> {
    if !is_type(driver, vertex, NodeType::Project) {
        return Err(inconsistent(format!(
            "vertex {vertex} is not a project reference"
        )));
    }
    let coordinate = |name: &str| {
        str_attr(driver, vertex, name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| inconsistent(format!("vertex {vertex} has no {name}")))
    };
    let group = coordinate(GROUP_ID)?;
    let artifact = coordinate(ARTIFACT_ID)?;
    let version = coordinate(VERSION)?;
    ProjectVersionRef::of(&group, &artifact, &version)
}

pub fn is_variable(driver: &dyn GraphDriver, vertex: VertexId) -> bool {
    driver
        .vertex_attr(vertex, VARIABLE)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub fn is_connected(driver: &dyn GraphDriver, vertex: VertexId) -> bool {
    driver
        .vertex_attr(vertex, CONNECTED)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub fn mark_connected(driver: &dyn GraphDriver, vertex: VertexId, connected: bool) -> AtlasResult<()> {
    driver.set_vertex_attr(vertex, CONNECTED, connected.into())
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

pub fn set_metadata(
    driver: &dyn GraphDriver,
    vertex: VertexId,
    key: &str,
    value: &str,
) -> AtlasResult<()> {
    driver.set_vertex_attr(vertex, &format!("{METADATA_PREFIX}{key}"), value.into())
}

pub fn set_metadata_map(
    driver: &dyn GraphDriver,
    vertex: VertexId,
    metadata: &BTreeMap<String, String>,
) -> AtlasResult<()> {
    for (key, value) in metadata {
        set_metadata(driver, vertex, key, value)?;
    }
    Ok(())
}

pub fn metadata(driver: &dyn GraphDriver, vertex: VertexId, key: &str) -> Option<String> {
    str_attr(driver, vertex, &format!("{METADATA_PREFIX}{key}"))
}

/// Every metadata entry on `vertex`, prefix stripped.
pub fn metadata_map(driver: &dyn GraphDriver, vertex: VertexId) -> BTreeMap<String, String> {
    driver
        .vertex_attr_names(vertex)
        .into_iter()
        .filter_map(|name| {
            let key = name.strip_prefix(METADATA_PREFIX)?.to_string();
            str_attr(driver, vertex, &name).map(|value| (key, value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Render exclusions as a comma-separated `group:artifact` list.
pub fn render_excludes(excludes: &BTreeSet<ProjectRef>) -> String {
    excludes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a stored exclusion list, skipping entries that are not
/// `group:artifact`.
pub fn parse_excludes(raw: &str, context: &str) -> BTreeSet<ProjectRef> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .filter_map(|e| match ProjectRef::parse(e) {
            Ok(r) => Some(r),
            Err(_) => {
                warn!("In: {context} skipping invalid exclude specification: '{e}'");
                None
            }
        })
        .collect()
}

fn write_artifact(driver: &dyn GraphDriver, edge: EdgeId, target: &ArtifactRef) -> AtlasResult<()> {
    driver.set_edge_attr(edge, OPTIONAL, target.is_optional().into())?;
    driver.set_edge_attr(edge, TYPE, target.artifact_type().into())?;
    if let Some(classifier) = target.classifier() {
        driver.set_edge_attr(edge, CLASSIFIER, classifier.into())?;
    }
    Ok(())
}

fn read_artifact(driver: &dyn GraphDriver, edge: EdgeId, pvr: ProjectVersionRef) -> ArtifactRef {
    let artifact_type = edge_str(driver, edge, TYPE);
    let classifier = edge_str(driver, edge, CLASSIFIER);
    ArtifactRef::new(
        pvr,
        artifact_type.as_deref(),
        classifier.as_deref(),
        edge_bool(driver, edge, OPTIONAL),
    )
}

/// Write `rel` onto `edge`.
pub fn write_relationship(
    driver: &dyn GraphDriver,
    edge: EdgeId,
    rel: &ProjectRelationship,
) -> AtlasResult<()> {
    let index = i64::try_from(rel.index())
        .map_err(|_| inconsistent(format!("index of {rel} out of range")))?;
    driver.set_edge_attr(edge, REL_TYPE, rel.relationship_type().name().into())?;
    driver.set_edge_attr(edge, RELATIONSHIP_ID, rel.id().into())?;
    driver.set_edge_attr(edge, INDEX, index.into())?;
    driver.set_edge_attr(edge, SOURCE_URI, rel.source().as_str().into())?;
    driver.set_edge_attr(edge, POM_LOCATION_URI, rel.pom_location().as_str().into())?;

    match rel.kind() {
        RelationshipKind::Dependency {
            target,
            scope,
            managed,
            excludes,
        } => {
            write_artifact(driver, edge, target)?;
            driver.set_edge_attr(edge, IS_MANAGED, (*managed).into())?;
            driver.set_edge_attr(edge, SCOPE, scope.real_name().into())?;
            if !excludes.is_empty() {
                driver.set_edge_attr(edge, EXCLUDES, render_excludes(excludes).into())?;
            }
        }
        RelationshipKind::PluginDependency {
            plugin,
            target,
            managed,
        } => {
            write_artifact(driver, edge, target)?;
            driver.set_edge_attr(edge, PLUGIN_GROUP_ID, plugin.group_id().into())?;
            driver.set_edge_attr(edge, PLUGIN_ARTIFACT_ID, plugin.artifact_id().into())?;
            driver.set_edge_attr(edge, IS_MANAGED, (*managed).into())?;
        }
        RelationshipKind::Plugin {
            managed, reporting, ..
        } => {
            driver.set_edge_attr(edge, IS_MANAGED, (*managed).into())?;
            driver.set_edge_attr(edge, IS_REPORTING_PLUGIN, (*reporting).into())?;
        }
        RelationshipKind::Parent { .. } | RelationshipKind::Extension { .. } => {}
    }
    Ok(())
}

fn uri_attr(driver: &dyn GraphDriver, edge: EdgeId, name: &str) -> Option<Url> {
    edge_str(driver, edge, name).and_then(|raw| Url::parse(&raw).ok())
}

/// Read the relationship stored on `edge`.
///
/// Fails with [`AtlasError::InconsistentGraphState`] when either endpoint is
/// not a project vertex or the edge carries no relationship type.
pub fn to_project_relationship(
    driver: &dyn GraphDriver,
    edge: EdgeId,
) -> AtlasResult<ProjectRelationship> {
    let (start, end) = driver
        .edge_endpoints(edge)
        .ok_or_else(|| inconsistent(format!("edge {edge} has no endpoints")))?;
    let rel_type = edge_str(driver, edge, REL_TYPE)
        .and_then(|name| RelationshipType::from_name(&name))
        .ok_or_else(|| inconsistent(format!("edge {edge} carries no relationship type")))?;

    let from = to_project_version_ref(driver, start)?;
    let to = to_project_version_ref(driver, end)?;
    let index = driver
        .edge_attr(edge, INDEX)
        .and_then(|v| v.as_int())
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0);
    let source = match uri_attr(driver, edge, SOURCE_URI) {
        Some(uri) => uri,
        None => unknown_source_uri()?,
    };
    let pom_location = match uri_attr(driver, edge, POM_LOCATION_URI) {
        Some(uri) => uri,
        None => pom_root_uri()?,
    };
    let managed = edge_bool(driver, edge, IS_MANAGED);

    let rel = match rel_type {
        RelationshipType::Parent => ProjectRelationship::parent(source, pom_location, from, to),
        RelationshipType::Extension => {
            ProjectRelationship::extension(source, pom_location, from, to, index)
        }
        RelationshipType::Plugin => ProjectRelationship::plugin(
            source,
            pom_location,
            from,
            to,
            index,
            managed,
            edge_bool(driver, edge, IS_REPORTING_PLUGIN),
        ),
        RelationshipType::Dependency => {
            let artifact = read_artifact(driver, edge, to);
            let raw_scope = edge_str(driver, edge, SCOPE);
            let scope = DependencyScope::get_scope(raw_scope.as_deref()).ok_or_else(|| {
                inconsistent(format!(
                    "edge {edge} has unknown scope '{}'",
                    raw_scope.as_deref().unwrap_or_default()
                ))
            })?;
            let excludes = edge_str(driver, edge, EXCLUDES)
                .map(|raw| parse_excludes(&raw, &format!("{from} -> {artifact}")))
                .unwrap_or_default();
            ProjectRelationship::dependency(
                source,
                pom_location,
                from,
                artifact,
                scope,
                index,
                managed,
            )
            .with_excludes(excludes)
        }
        RelationshipType::PluginDependency => {
            let group = edge_str(driver, edge, PLUGIN_GROUP_ID).unwrap_or_default();
            let artifact_id = edge_str(driver, edge, PLUGIN_ARTIFACT_ID).unwrap_or_default();
            let plugin = ProjectRef::new(&group, &artifact_id).map_err(|e| {
                inconsistent(format!("edge {edge} has an invalid plugin reference: {e}"))
            })?;
            ProjectRelationship::plugin_dependency(
                source,
                pom_location,
                from,
                plugin,
                read_artifact(driver, edge, to),
                index,
                managed,
            )
        }
    };
    Ok(rel)
}

// ---------------------------------------------------------------------------
// Clones
// ---------------------------------------------------------------------------

pub fn mark_clone_of(driver: &dyn GraphDriver, clone: EdgeId, original: EdgeId) -> AtlasResult<()> {
    driver.set_edge_attr(clone, CLONE_OF, listing_id(original)?.into())
}

pub fn clone_of(driver: &dyn GraphDriver, edge: EdgeId) -> Option<EdgeId> {
    driver
        .edge_attr(edge, CLONE_OF)
        .and_then(|v| v.as_int())
        .and_then(|id| EdgeId::try_from(id).ok())
}

pub fn is_clone_of(driver: &dyn GraphDriver, edge: EdgeId, original: EdgeId) -> bool {
    clone_of(driver, edge) == Some(original)
}

// ---------------------------------------------------------------------------
// Selection markers
// ---------------------------------------------------------------------------

fn describe_target(driver: &dyn GraphDriver, edge: EdgeId) -> String {
    driver
        .edge_endpoints(edge)
        .and_then(|(_, end)| str_attr(driver, end, GAV))
        .unwrap_or_else(|| format!("edge {edge}"))
}

fn describe_root(driver: &dyn GraphDriver, root: VertexId) -> String {
    str_attr(driver, root, GAV).unwrap_or_else(|| format!("vertex {root}"))
}

pub fn mark_selected_for(driver: &dyn GraphDriver, edge: EdgeId, root: VertexId) -> AtlasResult<()> {
    debug!(
        "marking selected: {} for root: {}",
        describe_target(driver, edge),
        describe_root(driver, root)
    );
    let id = listing_id(root)?;
    driver.add_to_id_listing(SELECTED_FOR, edge, &[id])?;
    driver.remove_from_id_listing(DESELECTED_FOR, edge, &[id])
}

pub fn mark_deselected_for(
    driver: &dyn GraphDriver,
    edge: EdgeId,
    root: VertexId,
) -> AtlasResult<()> {
    debug!(
        "marking de-selected: {} for root: {}",
        describe_target(driver, edge),
        describe_root(driver, root)
    );
    let id = listing_id(root)?;
    driver.remove_from_id_listing(SELECTED_FOR, edge, &[id])?;
    driver.add_to_id_listing(DESELECTED_FOR, edge, &[id])
}

pub fn remove_selection_annotations_for(
    driver: &dyn GraphDriver,
    edge: EdgeId,
    root: VertexId,
) -> AtlasResult<()> {
    debug!(
        "{}: removing all selection annotations for: {}",
        describe_target(driver, edge),
        describe_root(driver, root)
    );
    let id = listing_id(root)?;
    driver.remove_from_id_listing(SELECTED_FOR, edge, &[id])?;
    driver.remove_from_id_listing(DESELECTED_FOR, edge, &[id])
}

fn listing_ids(roots: &[VertexId]) -> Vec<i64> {
    roots.iter().filter_map(|r| i64::try_from(*r).ok()).collect()
}

pub fn is_selected_for(driver: &dyn GraphDriver, edge: EdgeId, roots: &[VertexId]) -> bool {
    driver.id_listing_contains(SELECTED_FOR, edge, &listing_ids(roots))
}

pub fn is_deselected_for(driver: &dyn GraphDriver, edge: EdgeId, roots: &[VertexId]) -> bool {
    driver.id_listing_contains(DESELECTED_FOR, edge, &listing_ids(roots))
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

/// Flatten cycles into the stored listing, separating them with
/// [`CYCLE_SEPARATOR`].
pub fn encode_cycles(cycles: &[Vec<EdgeId>]) -> AtlasResult<Vec<i64>> {
    let mut collapsed = Vec::new();
    for cycle in cycles.iter().filter(|c| !c.is_empty()) {
        if !collapsed.is_empty() {
            collapsed.push(CYCLE_SEPARATOR);
        }
        for edge in cycle {
            collapsed.push(listing_id(*edge)?);
        }
    }
    Ok(collapsed)
}

/// Split a stored listing back into cycles. Empty segments are dropped.
pub fn decode_cycles(collapsed: &[i64]) -> Vec<Vec<EdgeId>> {
    collapsed
        .split(|id| *id == CYCLE_SEPARATOR)
        .map(|segment| {
            let mut cycle: Vec<EdgeId> = Vec::new();
            for id in segment.iter().filter_map(|id| EdgeId::try_from(*id).ok()) {
                if !cycle.contains(&id) {
                    cycle.push(id);
                }
            }
            cycle
        })
        .filter(|cycle| !cycle.is_empty())
        .collect()
}

fn same_edges(a: &[EdgeId], b: &[EdgeId]) -> bool {
    let a: BTreeSet<&EdgeId> = a.iter().collect();
    let b: BTreeSet<&EdgeId> = b.iter().collect();
    a == b
}

pub fn injected_cycles(driver: &dyn GraphDriver, edge: EdgeId) -> Vec<Vec<EdgeId>> {
    driver
        .edge_attr(edge, CYCLES_INJECTED)
        .and_then(|v| v.as_ids().map(decode_cycles))
        .unwrap_or_default()
}

pub fn is_cycle_injection(driver: &dyn GraphDriver, edge: EdgeId) -> bool {
    edge_bool(driver, edge, CYCLE_INJECTION)
}

/// Record `cycle` on `edge`. The edge itself is appended when the cycle
/// does not already name it. Returns `false` when an identical edge set was
/// already recorded there.
pub fn inject_cycle(driver: &dyn GraphDriver, edge: EdgeId, cycle: &[EdgeId]) -> AtlasResult<bool> {
    let mut cycle = cycle.to_vec();
    if !cycle.contains(&edge) {
        cycle.push(edge);
    }
    let mut cycles = injected_cycles(driver, edge);
    if cycles.iter().any(|existing| same_edges(existing, &cycle)) {
        return Ok(false);
    }
    debug!("injecting cycle {cycle:?} onto edge {edge}");
    cycles.push(cycle);
    driver.set_edge_attr(edge, CYCLE_INJECTION, true.into())?;
    driver.set_edge_attr(edge, CYCLES_INJECTED, AttrValue::Ids(encode_cycles(&cycles)?))?;
    Ok(true)
}

/// Create (or refresh) the summary vertex for a cycle.
pub fn write_cycle_summary(
    driver: &dyn GraphDriver,
    cycle_id: &str,
    edges: &[EdgeId],
    projects: &BTreeSet<ProjectVersionRef>,
) -> AtlasResult<VertexId> {
    let (vertex, _) = driver.get_or_create_vertex(&format!("cycle:{cycle_id}"));
    let relationships: Vec<String> = edges.iter().map(ToString::to_string).collect();
    let projects: Vec<String> = projects.iter().map(ToString::to_string).collect();
    driver.set_vertex_attr(vertex, NODE_TYPE, NodeType::Cycle.name().into())?;
    driver.set_vertex_attr(vertex, CYCLE_ID, cycle_id.into())?;
    driver.set_vertex_attr(vertex, CYCLE_RELATIONSHIPS, relationships.join(",").into())?;
    driver.set_vertex_attr(vertex, CYCLE_PROJECTS, projects.join(";").into())?;
    Ok(vertex)
}
