use atlas_core::refs::{ProjectRef, ProjectVersionRef};
use atlas_core::relationship::{
    pom_root_uri, unknown_source_uri, ProjectRelationship, RelationshipType,
};
use atlas_core::relationships::{ProjectKey, ProjectRelationships};
use atlas_core::scope::DependencyScope;
use atlas_util::errors::AtlasError;

fn pvr(s: &str) -> ProjectVersionRef {
    ProjectVersionRef::parse(s).unwrap()
}

fn key(s: &str) -> ProjectKey {
    ProjectKey::new(unknown_source_uri().unwrap(), pvr(s)).unwrap()
}

fn plugin(declaring: &str, target: &str, managed: bool) -> ProjectRelationship {
    ProjectRelationship::plugin(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        pvr(declaring),
        pvr(target),
        0,
        managed,
        false,
    )
}

fn plugin_dep(declaring: &str, plugin: &str, target: &str, managed: bool) -> ProjectRelationship {
    ProjectRelationship::plugin_dependency(
        unknown_source_uri().unwrap(),
        pom_root_uri().unwrap(),
        pvr(declaring),
        ProjectRef::parse(plugin).unwrap(),
        pvr(target).as_jar(),
        0,
        managed,
    )
}

#[test]
fn test_build_without_parent_adds_terminus() {
    let rels = ProjectRelationships::builder(key("org:app:1.0")).build();
    assert!(rels.parent().is_terminus());
    assert!(rels.all_relationships().is_empty());
    assert_eq!(rels.exact_all_relationships().len(), 1);
}

#[test]
fn test_declared_parent_is_visible() {
    let rels = ProjectRelationships::builder(key("org:app:1.0"))
        .with_parent_ref(pvr("org:parent:3"))
        .build();
    assert!(!rels.parent().is_terminus());
    assert_eq!(rels.all_relationships().len(), 1);
}

#[test]
fn test_dependencies_dedupe_and_split_by_managed() {
    let b = ProjectRelationships::builder(key("org:app:1.0"))
        .with_dependency(pvr("org:a:1"), None, None, DependencyScope::Compile, false)
        .with_dependency(pvr("org:b:1"), None, None, DependencyScope::Test, false)
        .with_dependency(pvr("org:c:1"), None, None, DependencyScope::Compile, true);
    assert_eq!(b.next_index(RelationshipType::Dependency, false), 2);
    assert_eq!(b.next_index(RelationshipType::Dependency, true), 1);

    let rels = b.build();
    let again = rels.dependencies()[0].clone();
    let rels = ProjectRelationships::builder(rels.key().clone())
        .with_dependencies(rels.dependencies().to_vec())
        .with_dependencies([again])
        .with_dependencies(rels.managed_dependencies().to_vec())
        .build();
    assert_eq!(rels.dependencies().len(), 2);
    assert_eq!(rels.managed_dependencies().len(), 1);
    assert_eq!(rels.dependencies()[1].index(), 1);
}

#[test]
fn test_relationships_are_rehomed_onto_key_project() {
    let foreign = plugin("org:other:9", "org.plugins:compiler:3", false);
    let rels = ProjectRelationships::builder(key("org:app:1.0"))
        .with_plugins([foreign.clone()])
        .build();
    assert_eq!(rels.plugins()[0].declaring(), &pvr("org:app:1.0"));
    assert_eq!(foreign.declaring(), &pvr("org:other:9"));
}

#[test]
fn test_orphaned_plugin_dependency_fails() {
    let err = ProjectRelationships::builder(key("org:app:1.0"))
        .with_plugin_dependencies([plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false)])
        .unwrap_err();
    match err {
        AtlasError::OrphanedRelationship { plugin, .. } => {
            assert_eq!(plugin, "org.plugins:compiler")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_plugin_dependency_needs_matching_managed_flag() {
    let result = ProjectRelationships::builder(key("org:app:1.0"))
        .with_plugins([plugin("org:app:1.0", "org.plugins:compiler:3", true)])
        .with_plugin_dependencies([plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false)]);
    assert!(result.is_err());
}

#[test]
fn test_failed_plugin_dependency_batch_adds_nothing() {
    let b = ProjectRelationships::builder(key("org:app:1.0"))
        .with_plugins([plugin("org:app:1.0", "org.plugins:compiler:3", false)]);
    let good = plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false);
    let bad = plugin_dep("org:app:1.0", "org.plugins:missing", "org:asm:5", false);
    assert!(b.with_plugin_dependencies([good, bad]).is_err());
}

#[test]
fn test_with_relationships_loads_plugins_first() {
    let compiler = ProjectRef::parse("org.plugins:compiler").unwrap();
    let rels = ProjectRelationships::builder(key("org:app:1.0"))
        .with_relationships([
            plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false),
            plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false),
            plugin("org:app:1.0", "org.plugins:compiler:3", false),
        ])
        .unwrap()
        .build();
    assert_eq!(rels.plugins().len(), 1);
    assert_eq!(rels.plugin_dependencies(&compiler, false).len(), 1);
    assert!(rels.plugin_dependencies(&compiler, true).is_empty());
    assert_eq!(rels.all_relationships().len(), 2);
}

#[test]
fn test_plugin_dependency_index_is_per_plugin() {
    let compiler = ProjectRef::parse("org.plugins:compiler").unwrap();
    let b = ProjectRelationships::builder(key("org:app:1.0"))
        .with_plugin(pvr("org.plugins:compiler:3"), false)
        .with_plugin(pvr("org.plugins:surefire:2"), false)
        .with_plugin_dependencies([plugin_dep("org:app:1.0", "org.plugins:compiler", "org:asm:5", false)])
        .unwrap();
    assert_eq!(b.next_plugin_dependency_index(&compiler, false), 1);
    assert_eq!(
        b.next_plugin_dependency_index(&ProjectRef::parse("org.plugins:surefire").unwrap(), false),
        0
    );
    assert_eq!(b.next_index(RelationshipType::Plugin, false), 2);
}

#[test]
fn test_extensions() {
    let rels = ProjectRelationships::builder(key("org:app:1.0"))
        .with_extension(pvr("org:wagon:1"))
        .with_extension(pvr("org:wagon:1"))
        .build();
    assert_eq!(rels.extensions().len(), 1);
}
