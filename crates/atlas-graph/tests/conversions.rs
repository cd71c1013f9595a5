use std::collections::{BTreeMap, BTreeSet};

use atlas_core::refs::{ProjectRef, ProjectVersionRef};
use atlas_core::relationship::{
    pom_root_uri, profile_location, unknown_source_uri, uri, ProjectRelationship,
};
use atlas_core::scope::DependencyScope;
use atlas_graph::conversions::*;
use atlas_graph::driver::{AttrValue, EdgeId, GraphDriver, VertexId};
use atlas_graph::memory::MemoryGraphDriver;
use atlas_util::errors::AtlasError;

fn pvr(s: &str) -> ProjectVersionRef {
    ProjectVersionRef::parse(s).unwrap()
}

fn stored(driver: &MemoryGraphDriver, rel: &ProjectRelationship) -> EdgeId {
    let from = project_vertex(driver, rel.declaring(), true).unwrap();
    let to = project_vertex(driver, rel.target(), false).unwrap();
    let (edge, _) = driver.create_edge(from, to, &rel.id()).unwrap();
    write_relationship(driver, edge, rel).unwrap();
    edge
}

fn edge_between(driver: &MemoryGraphDriver, from: &str, to: &str) -> (VertexId, EdgeId) {
    let rel = ProjectRelationship::dependency(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        pvr(from),
        pvr(to).as_jar(),
        DependencyScope::Compile,
        0,
        false,
    );
    let edge = stored(driver, &rel);
    (find_project_vertex(driver, &pvr(from)).unwrap(), edge)
}

#[test]
fn test_project_vertex_properties() {
    let driver = MemoryGraphDriver::new();
    let range = pvr("org.foo:bar:[1.0,2.0)");
    let v = project_vertex(&driver, &range, false).unwrap();

    assert!(is_type(&driver, v, NodeType::Project));
    assert!(is_variable(&driver, v));
    assert!(!is_connected(&driver, v));
    assert_eq!(
        driver.vertex_attr(v, GAV),
        Some(AttrValue::from("org.foo:bar:[1.0,2.0)"))
    );
    assert_eq!(to_project_version_ref(&driver, v).unwrap(), range);

    // Later sightings as a declaring project connect the vertex.
    assert_eq!(project_vertex(&driver, &range, true).unwrap(), v);
    assert!(is_connected(&driver, v));
    assert_eq!(project_vertex(&driver, &range, false).unwrap(), v);
    assert!(is_connected(&driver, v));

    let concrete = project_vertex(&driver, &pvr("org.foo:bar:1.0"), true).unwrap();
    assert!(!is_variable(&driver, concrete));
}

#[test]
fn test_non_project_vertex_is_inconsistent() {
    let driver = MemoryGraphDriver::new();
    let (v, _) = driver.get_or_create_vertex("stray");
    assert!(matches!(
        to_project_version_ref(&driver, v),
        Err(AtlasError::InconsistentGraphState { .. })
    ));
}

#[test]
fn test_dependency_round_trip_with_excludes() {
    let driver = MemoryGraphDriver::new();
    let rel = ProjectRelationship::dependency(
        uri("http://repo.example.org/maven2").unwrap(),
        profile_location("ci").unwrap(),
        pvr("org.my:app:1.0"),
        pvr("org.lib:lib:2.0").as_artifact(Some("test-jar"), Some("tests"), true),
        DependencyScope::Test,
        4,
        true,
    )
    .with_excludes([
        ProjectRef::parse("org.x:one").unwrap(),
        ProjectRef::parse("org.x:two").unwrap(),
    ]);
    let edge = stored(&driver, &rel);

    assert_eq!(
        driver.edge_attr(edge, EXCLUDES),
        Some(AttrValue::from("org.x:one,org.x:two"))
    );
    assert_eq!(driver.edge_attr(edge, SCOPE), Some(AttrValue::from("test")));
    assert_eq!(
        driver.edge_attr(edge, RELATIONSHIP_ID),
        Some(AttrValue::from(rel.id()))
    );
    assert_eq!(to_project_relationship(&driver, edge).unwrap(), rel);
}

#[test]
fn test_plugin_and_plugin_dependency_round_trip() {
    let driver = MemoryGraphDriver::new();
    let app = pvr("org.my:app:1.0");
    let plugin = ProjectRelationship::plugin(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        app.clone(),
        pvr("org.plugins:compiler:3.1"),
        0,
        false,
        true,
    );
    let plugin_dep = ProjectRelationship::plugin_dependency(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        app.clone(),
        ProjectRef::parse("org.plugins:compiler").unwrap(),
        pvr("org.lib:helper:1.0").as_jar(),
        0,
        false,
    );
    let parent = ProjectRelationship::parent(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        app.clone(),
        pvr("org.my:parent:1"),
    );
    let extension = ProjectRelationship::extension(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        app,
        pvr("org.ext:wagon:2.0"),
        1,
    );

    for rel in [plugin, plugin_dep, parent, extension] {
        let edge = stored(&driver, &rel);
        assert_eq!(to_project_relationship(&driver, edge).unwrap(), rel);
    }
}

#[test]
fn test_invalid_exclude_entries_are_skipped() {
    let excludes = parse_excludes("org.x:one, bogus ,org.x:two:3,org.y:two", "test");
    let expected: BTreeSet<ProjectRef> = ["org.x:one", "org.y:two"]
        .into_iter()
        .map(|s| ProjectRef::parse(s).unwrap())
        .collect();
    assert_eq!(excludes, expected);
    assert_eq!(render_excludes(&expected), "org.x:one,org.y:two");
}

#[test]
fn test_edge_without_type_is_inconsistent() {
    let driver = MemoryGraphDriver::new();
    let a = project_vertex(&driver, &pvr("g:a:1"), true).unwrap();
    let b = project_vertex(&driver, &pvr("g:b:1"), false).unwrap();
    let (edge, _) = driver.create_edge(a, b, "untyped").unwrap();
    assert!(matches!(
        to_project_relationship(&driver, edge),
        Err(AtlasError::InconsistentGraphState { .. })
    ));
}

#[test]
fn test_metadata() {
    let driver = MemoryGraphDriver::new();
    let v = project_vertex(&driver, &pvr("g:a:1"), true).unwrap();
    set_metadata(&driver, v, "scm", "git").unwrap();
    let mut more = BTreeMap::new();
    more.insert("license".to_string(), "MIT".to_string());
    set_metadata_map(&driver, v, &more).unwrap();

    assert_eq!(metadata(&driver, v, "scm").as_deref(), Some("git"));
    assert_eq!(metadata(&driver, v, "missing"), None);
    let all = metadata_map(&driver, v);
    assert_eq!(all.len(), 2);
    assert_eq!(all.get("license").map(String::as_str), Some("MIT"));
    assert!(!all.contains_key(GAV));
}

#[test]
fn test_selection_markers_are_exclusive() {
    let driver = MemoryGraphDriver::new();
    let (root, edge) = edge_between(&driver, "g:root:1", "g:lib:1");
    let (other_root, _) = edge_between(&driver, "g:other:1", "g:lib:1");

    mark_deselected_for(&driver, edge, root).unwrap();
    mark_selected_for(&driver, edge, other_root).unwrap();
    assert!(is_deselected_for(&driver, edge, &[root]));
    assert!(!is_selected_for(&driver, edge, &[root]));
    assert!(is_selected_for(&driver, edge, &[other_root]));

    mark_selected_for(&driver, edge, root).unwrap();
    assert!(is_selected_for(&driver, edge, &[root]));
    assert!(!is_deselected_for(&driver, edge, &[root]));

    mark_deselected_for(&driver, edge, root).unwrap();
    assert!(is_deselected_for(&driver, edge, &[root]));
    assert!(!is_selected_for(&driver, edge, &[root]));

    remove_selection_annotations_for(&driver, edge, root).unwrap();
    assert!(!is_selected_for(&driver, edge, &[root]));
    assert!(!is_deselected_for(&driver, edge, &[root]));
    assert!(is_selected_for(&driver, edge, &[other_root]));
}

#[test]
fn test_cycle_injection_is_idempotent() {
    let driver = MemoryGraphDriver::new();
    let (_, ab) = edge_between(&driver, "g:a:1", "g:b:1");
    let (_, ba) = edge_between(&driver, "g:b:1", "g:a:1");
    let (_, bc) = edge_between(&driver, "g:b:1", "g:c:1");

    assert!(!is_cycle_injection(&driver, ab));
    assert!(inject_cycle(&driver, ab, &[ab, ba]).unwrap());
    let once = driver.edge_attr(ab, CYCLES_INJECTED);
    assert!(!inject_cycle(&driver, ab, &[ba, ab]).unwrap());
    assert_eq!(driver.edge_attr(ab, CYCLES_INJECTED), once);
    assert!(is_cycle_injection(&driver, ab));

    // The edge itself is added when the cycle does not name it.
    assert!(inject_cycle(&driver, ab, &[bc]).unwrap());
    assert_eq!(injected_cycles(&driver, ab), vec![vec![ab, ba], vec![bc, ab]]);
}

#[test]
fn test_cycle_listing_wire_format() {
    let encoded = encode_cycles(&[vec![1, 2], vec![], vec![3]]).unwrap();
    assert_eq!(encoded, vec![1, 2, CYCLE_SEPARATOR, 3]);
    assert_eq!(decode_cycles(&encoded), vec![vec![1, 2], vec![3]]);
    assert_eq!(decode_cycles(&[-1, 4, 4, -1, -1, 5]), vec![vec![4], vec![5]]);
    assert!(decode_cycles(&[]).is_empty());
}

#[test]
fn test_clone_of() {
    let driver = MemoryGraphDriver::new();
    let (_, original) = edge_between(&driver, "g:a:1", "g:b:[1,2)");
    let (_, clone) = edge_between(&driver, "g:a:1", "g:b:1.5");

    assert_eq!(clone_of(&driver, clone), None);
    mark_clone_of(&driver, clone, original).unwrap();
    assert!(is_clone_of(&driver, clone, original));
    assert!(!is_clone_of(&driver, original, clone));
}

#[test]
fn test_cycle_summary_vertex() {
    let driver = MemoryGraphDriver::new();
    let projects: BTreeSet<ProjectVersionRef> = [pvr("g:a:1"), pvr("g:b:1")].into_iter().collect();
    let v = write_cycle_summary(&driver, "abc", &[3, 4], &projects).unwrap();

    assert!(is_type(&driver, v, NodeType::Cycle));
    assert_eq!(driver.vertex_attr(v, CYCLE_ID), Some(AttrValue::from("abc")));
    assert_eq!(
        driver.vertex_attr(v, CYCLE_RELATIONSHIPS),
        Some(AttrValue::from("3,4"))
    );
    assert_eq!(
        driver.vertex_attr(v, CYCLE_PROJECTS),
        Some(AttrValue::from("g:a:1;g:b:1"))
    );
    assert!(to_project_version_ref(&driver, v).is_err());
    assert_eq!(write_cycle_summary(&driver, "abc", &[3, 4], &projects).unwrap(), v);
}
