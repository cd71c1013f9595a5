//! Typed relationships between projects: parents, dependencies, extensions,
//! plugins and plugin-level dependencies.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use atlas_util::errors::{AtlasError, AtlasResult};
use atlas_util::hash::sha1_hex;

use crate::refs::{ArtifactRef, ProjectRef, ProjectVersionRef};
use crate::scope::DependencyScope;

/// Source URI for relationships whose origin repository is unknown.
pub const UNKNOWN_SOURCE_URI: &str = "repo:unknown";

/// Location URI for relationships declared in the main body of a POM.
pub const POM_ROOT_URI: &str = "pom:root";

/// Parse a URI, mapping failures onto [`AtlasError::InvalidReference`].
pub fn uri(value: &str) -> AtlasResult<Url> {
    Url::parse(value).map_err(|e| AtlasError::InvalidReference {
        message: format!("invalid URI '{value}': {e}"),
    })
}

pub fn unknown_source_uri() -> AtlasResult<Url> {
    uri(UNKNOWN_SOURCE_URI)
}

pub fn pom_root_uri() -> AtlasResult<Url> {
    uri(POM_ROOT_URI)
}

/// Location URI for relationships declared inside a build profile.
pub fn profile_location(profile: &str) -> AtlasResult<Url> {
    uri(&format!("pom:profile:{profile}"))
}

/// Discriminator of a relationship's variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    Parent,
    Dependency,
    Extension,
    Plugin,
    PluginDependency,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 5] = [
        Self::Parent,
        Self::Dependency,
        Self::Extension,
        Self::Plugin,
        Self::PluginDependency,
    ];

    /// Stable name used in the graph attribute schema.
    pub fn name(self) -> &'static str {
        match self {
            Self::Parent => "PARENT",
            Self::Dependency => "DEPENDENCY",
            Self::Extension => "EXTENSION",
            Self::Plugin => "PLUGIN",
            Self::PluginDependency => "PLUGIN_DEP",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant-specific content of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKind {
    /// A terminus parent targets its own declaring project.
    Parent { target: ProjectVersionRef },
    Dependency {
        target: ArtifactRef,
        scope: DependencyScope,
        managed: bool,
        excludes: BTreeSet<ProjectRef>,
    },
    Extension { target: ProjectVersionRef },
    Plugin {
        target: ProjectVersionRef,
        managed: bool,
        reporting: bool,
    },
    PluginDependency {
        plugin: ProjectRef,
        target: ArtifactRef,
        managed: bool,
    },
}

/// One declared relationship from a project to another.
///
/// Values are immutable; equality covers every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRelationship {
    source: Url,
    pom_location: Url,
    declaring: ProjectVersionRef,
    index: usize,
    kind: RelationshipKind,
}

impl ProjectRelationship {
    pub fn new(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        index: usize,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source,
            pom_location,
            declaring,
            index,
            kind,
        }
    }

    pub fn parent(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        target: ProjectVersionRef,
    ) -> Self {
        Self::new(source, pom_location, declaring, 0, RelationshipKind::Parent { target })
    }

    /// The self-referential parent marking a project with no parent.
    pub fn terminus_parent(source: Url, pom_location: Url, declaring: ProjectVersionRef) -> Self {
        let target = declaring.clone();
        Self::parent(source, pom_location, declaring, target)
    }

    pub fn dependency(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        target: ArtifactRef,
        scope: DependencyScope,
        index: usize,
        managed: bool,
    ) -> Self {
        Self::new(
            source,
            pom_location,
            declaring,
            index,
            RelationshipKind::Dependency {
                target,
                scope,
                managed,
                excludes: BTreeSet::new(),
            },
        )
    }

    pub fn extension(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        target: ProjectVersionRef,
        index: usize,
    ) -> Self {
        Self::new(source, pom_location, declaring, index, RelationshipKind::Extension { target })
    }

    pub fn plugin(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        target: ProjectVersionRef,
        index: usize,
        managed: bool,
        reporting: bool,
    ) -> Self {
        Self::new(
            source,
            pom_location,
            declaring,
            index,
            RelationshipKind::Plugin {
                target,
                managed,
                reporting,
            },
        )
    }

    pub fn plugin_dependency(
        source: Url,
        pom_location: Url,
        declaring: ProjectVersionRef,
        plugin: ProjectRef,
        target: ArtifactRef,
        index: usize,
        managed: bool,
    ) -> Self {
        Self::new(
            source,
            pom_location,
            declaring,
            index,
            RelationshipKind::PluginDependency {
                plugin,
                target,
                managed,
            },
        )
    }

    /// Replace the exclusion set of a dependency. Other kinds are returned
    /// unchanged.
    pub fn with_excludes<I>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = ProjectRef>,
    {
        if let RelationshipKind::Dependency { excludes: current, .. } = &mut self.kind {
            *current = excludes.into_iter().collect();
        }
        self
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub fn pom_location(&self) -> &Url {
        &self.pom_location
    }

    pub fn declaring(&self) -> &ProjectVersionRef {
        &self.declaring
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &RelationshipKind {
        &self.kind
    }

    pub fn relationship_type(&self) -> RelationshipType {
        match self.kind {
            RelationshipKind::Parent { .. } => RelationshipType::Parent,
            RelationshipKind::Dependency { .. } => RelationshipType::Dependency,
            RelationshipKind::Extension { .. } => RelationshipType::Extension,
            RelationshipKind::Plugin { .. } => RelationshipType::Plugin,
            RelationshipKind::PluginDependency { .. } => RelationshipType::PluginDependency,
        }
    }

    /// The project this relationship points at.
    pub fn target(&self) -> &ProjectVersionRef {
        match &self.kind {
            RelationshipKind::Parent { target }
            | RelationshipKind::Extension { target }
            | RelationshipKind::Plugin { target, .. } => target,
            RelationshipKind::Dependency { target, .. }
            | RelationshipKind::PluginDependency { target, .. } => target.project_version(),
        }
    }

    /// The artifact for kinds that target one.
    pub fn target_artifact(&self) -> Option<&ArtifactRef> {
        match &self.kind {
            RelationshipKind::Dependency { target, .. }
            | RelationshipKind::PluginDependency { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_managed(&self) -> bool {
        match self.kind {
            RelationshipKind::Dependency { managed, .. }
            | RelationshipKind::Plugin { managed, .. }
            | RelationshipKind::PluginDependency { managed, .. } => managed,
            RelationshipKind::Parent { .. } | RelationshipKind::Extension { .. } => false,
        }
    }

    pub fn is_terminus(&self) -> bool {
        matches!(&self.kind, RelationshipKind::Parent { target } if *target == self.declaring)
    }

    pub fn scope(&self) -> Option<DependencyScope> {
        match self.kind {
            RelationshipKind::Dependency { scope, .. } => Some(scope),
            _ => None,
        }
    }

    pub fn excludes(&self) -> Option<&BTreeSet<ProjectRef>> {
        match &self.kind {
            RelationshipKind::Dependency { excludes, .. } => Some(excludes),
            _ => None,
        }
    }

    /// The same relationship declared by a different project. A terminus
    /// parent stays a terminus.
    pub fn clone_for(&self, declaring: &ProjectVersionRef) -> Self {
        let mut kind = self.kind.clone();
        if self.is_terminus() {
            kind = RelationshipKind::Parent {
                target: declaring.clone(),
            };
        }
        Self {
            source: self.source.clone(),
            pom_location: self.pom_location.clone(),
            declaring: declaring.clone(),
            index: self.index,
            kind,
        }
    }

    /// The same relationship pointing at `target`. Artifact targets keep
    /// their type, classifier and optional flag.
    pub fn with_target(&self, target: ProjectVersionRef) -> Self {
        let kind = match &self.kind {
            RelationshipKind::Parent { .. } => RelationshipKind::Parent { target },
            RelationshipKind::Extension { .. } => RelationshipKind::Extension { target },
            RelationshipKind::Plugin {
                managed, reporting, ..
            } => RelationshipKind::Plugin {
                target,
                managed: *managed,
                reporting: *reporting,
            },
            RelationshipKind::Dependency {
                target: artifact,
                scope,
                managed,
                excludes,
            } => RelationshipKind::Dependency {
                target: artifact.with_project_version(target),
                scope: *scope,
                managed: *managed,
                excludes: excludes.clone(),
            },
            RelationshipKind::PluginDependency {
                plugin,
                target: artifact,
                managed,
            } => RelationshipKind::PluginDependency {
                plugin: plugin.clone(),
                target: artifact.with_project_version(target),
                managed: *managed,
            },
        };
        Self {
            source: self.source.clone(),
            pom_location: self.pom_location.clone(),
            declaring: self.declaring.clone(),
            index: self.index,
            kind,
        }
    }

    /// Stable external id: the SHA-1 of this relationship's rendering.
    pub fn id(&self) -> String {
        sha1_hex(&self.to_string())
    }
}

impl fmt::Display for ProjectRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> ", self.relationship_type(), self.declaring)?;
        match &self.kind {
            RelationshipKind::Parent { target } | RelationshipKind::Extension { target } => {
                write!(f, "{target}")?
            }
            RelationshipKind::Dependency {
                target,
                scope,
                managed,
                excludes,
            } => {
                write!(f, "{target} [scope={scope}, managed={managed}")?;
                if !excludes.is_empty() {
                    let rendered: Vec<String> = excludes.iter().map(ToString::to_string).collect();
                    write!(f, ", excludes={}", rendered.join(","))?;
                }
                f.write_str("]")?
            }
            RelationshipKind::Plugin {
                target,
                managed,
                reporting,
            } => write!(f, "{target} [managed={managed}, reporting={reporting}]")?,
            RelationshipKind::PluginDependency {
                plugin,
                target,
                managed,
            } => write!(f, "{target} [plugin={plugin}, managed={managed}]")?,
        }
        write!(
            f,
            " #{} ({} @ {})",
            self.index, self.source, self.pom_location
        )
    }
}

/// Every declaring project in `relationships`.
pub fn declarers<'a, I>(relationships: I) -> BTreeSet<ProjectVersionRef>
where
    I: IntoIterator<Item = &'a ProjectRelationship>,
{
    relationships
        .into_iter()
        .map(|r| r.declaring().clone())
        .collect()
}

/// Every target project in `relationships`.
pub fn targets<'a, I>(relationships: I) -> BTreeSet<ProjectVersionRef>
where
    I: IntoIterator<Item = &'a ProjectRelationship>,
{
    relationships
        .into_iter()
        .map(|r| r.target().clone())
        .collect()
}

pub fn filter_terminal_parents(relationships: &mut Vec<ProjectRelationship>) {
    relationships.retain(|r| !r.is_terminus());
}

/// Keep only relationships of the given types. An empty type list keeps
/// everything.
pub fn filter_by_type(relationships: &mut Vec<ProjectRelationship>, types: &[RelationshipType]) {
    if types.is_empty() {
        return;
    }
    relationships.retain(|r| types.contains(&r.relationship_type()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pvr(s: &str) -> ProjectVersionRef {
        ProjectVersionRef::parse(s).unwrap()
    }

    fn dep(from: &str, to: &str) -> ProjectRelationship {
        ProjectRelationship::dependency(
            unknown_source_uri().unwrap(),
            pom_root_uri().unwrap(),
            pvr(from),
            pvr(to).as_jar(),
            DependencyScope::Compile,
            0,
            false,
        )
    }

    #[test]
    fn standard_uris() {
        assert_eq!(unknown_source_uri().unwrap().as_str(), "repo:unknown");
        assert_eq!(pom_root_uri().unwrap().as_str(), "pom:root");
        assert_eq!(profile_location("dev").unwrap().as_str(), "pom:profile:dev");
    }

    #[test]
    fn terminus_parent() {
        let p = ProjectRelationship::terminus_parent(
            unknown_source_uri().unwrap(),
            pom_root_uri().unwrap(),
            pvr("g:a:1"),
        );
        assert!(p.is_terminus());
        let moved = p.clone_for(&pvr("g:b:2"));
        assert!(moved.is_terminus());
        assert_eq!(moved.target(), &pvr("g:b:2"));
    }

    #[test]
    fn clone_for_rewrites_declaring_only() {
        let original = dep("g:a:1", "g:b:2");
        let cloned = original.clone_for(&pvr("g:c:3"));
        assert_eq!(original.declaring(), &pvr("g:a:1"));
        assert_eq!(cloned.declaring(), &pvr("g:c:3"));
        assert_eq!(cloned.target(), original.target());
        assert_ne!(cloned, original);
    }

    #[test]
    fn with_target_keeps_artifact_shape() {
        let original = ProjectRelationship::dependency(
            unknown_source_uri().unwrap(),
            pom_root_uri().unwrap(),
            pvr("g:a:1"),
            pvr("g:b:[1,2)").as_artifact(Some("pom"), Some("tests"), true),
            DependencyScope::Test,
            3,
            false,
        );
        let selected = original.with_target(pvr("g:b:1.5"));
        assert_eq!(selected.target(), &pvr("g:b:1.5"));
        let artifact = selected.target_artifact().unwrap();
        assert_eq!(artifact.artifact_type(), "pom");
        assert_eq!(artifact.classifier(), Some("tests"));
        assert!(artifact.is_optional());
        assert_eq!(selected.scope(), Some(DependencyScope::Test));
        assert_eq!(selected.index(), 3);
        assert_ne!(selected.id(), original.id());
    }

    #[test]
    fn id_is_stable_and_field_sensitive() {
        let a = dep("g:a:1", "g:b:2");
        assert_eq!(a.id(), dep("g:a:1", "g:b:2").id());
        assert_eq!(a.id().len(), 40);
        let excluded = a.clone().with_excludes([ProjectRef::parse("x:y").unwrap()]);
        assert_ne!(a.id(), excluded.id());
    }

    #[test]
    fn type_names() {
        for t in RelationshipType::ALL {
            assert_eq!(RelationshipType::from_name(t.name()), Some(t));
        }
        assert_eq!(RelationshipType::PluginDependency.name(), "PLUGIN_DEP");
    }

    #[test]
    fn projections_and_type_filter() {
        let mut rels = vec![
            dep("g:a:1", "g:b:2"),
            ProjectRelationship::extension(
                unknown_source_uri().unwrap(),
                pom_root_uri().unwrap(),
                pvr("g:a:1"),
                pvr("g:ext:1"),
                0,
            ),
        ];
        assert_eq!(declarers(&rels).len(), 1);
        assert_eq!(targets(&rels).len(), 2);
        filter_by_type(&mut rels, &[RelationshipType::Extension]);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relationship_type(), RelationshipType::Extension);
    }
}
