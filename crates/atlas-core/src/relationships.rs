//! Per-project relationship collections and their builder.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};
use url::Url;

use atlas_util::errors::{AtlasError, AtlasResult};

use crate::refs::{ProjectRef, ProjectVersionRef};
use crate::relationship::{pom_root_uri, ProjectRelationship, RelationshipKind, RelationshipType};
use crate::scope::DependencyScope;

/// Identifies one project as read from one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectKey {
    source: Url,
    pom_location: Url,
    project: ProjectVersionRef,
}

impl ProjectKey {
    /// A key whose relationships are declared at the POM root.
    pub fn new(source: Url, project: ProjectVersionRef) -> AtlasResult<Self> {
        Ok(Self::with_pom_location(source, pom_root_uri()?, project))
    }

    pub fn with_pom_location(source: Url, pom_location: Url, project: ProjectVersionRef) -> Self {
        Self {
            source,
            pom_location,
            project,
        }
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub fn pom_location(&self) -> &Url {
        &self.pom_location
    }

    pub fn project(&self) -> &ProjectVersionRef {
        &self.project
    }
}

/// Plugin dependencies are grouped by the owning plugin's project and
/// whether it was declared as managed.
type PluginKey = (ProjectRef, bool);

/// The relationships declared by one project, grouped by kind.
#[derive(Debug, Clone)]
pub struct ProjectRelationships {
    key: ProjectKey,
    parent: ProjectRelationship,
    dependencies: Vec<ProjectRelationship>,
    managed_dependencies: Vec<ProjectRelationship>,
    plugins: Vec<ProjectRelationship>,
    managed_plugins: Vec<ProjectRelationship>,
    extensions: Vec<ProjectRelationship>,
    plugin_dependencies: BTreeMap<PluginKey, Vec<ProjectRelationship>>,
}

impl ProjectRelationships {
    pub fn builder(key: ProjectKey) -> ProjectRelationshipsBuilder {
        ProjectRelationshipsBuilder::new(key)
    }

    pub fn key(&self) -> &ProjectKey {
        &self.key
    }

    pub fn project(&self) -> &ProjectVersionRef {
        self.key.project()
    }

    /// The parent link; a terminus parent when none was declared.
    pub fn parent(&self) -> &ProjectRelationship {
        &self.parent
    }

    pub fn dependencies(&self) -> &[ProjectRelationship] {
        &self.dependencies
    }

    pub fn managed_dependencies(&self) -> &[ProjectRelationship] {
        &self.managed_dependencies
    }

    pub fn plugins(&self) -> &[ProjectRelationship] {
        &self.plugins
    }

    pub fn managed_plugins(&self) -> &[ProjectRelationship] {
        &self.managed_plugins
    }

    pub fn extensions(&self) -> &[ProjectRelationship] {
        &self.extensions
    }

    /// Dependencies declared inside the given plugin.
    pub fn plugin_dependencies(&self, plugin: &ProjectRef, managed: bool) -> &[ProjectRelationship] {
        self.plugin_dependencies
            .get(&(plugin.clone(), managed))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every relationship except a terminus parent.
    pub fn all_relationships(&self) -> Vec<ProjectRelationship> {
        let mut rels = self.exact_all_relationships();
        crate::relationship::filter_terminal_parents(&mut rels);
        rels
    }

    /// Every relationship, terminus parent included.
    pub fn exact_all_relationships(&self) -> Vec<ProjectRelationship> {
        std::iter::once(&self.parent)
            .chain(&self.dependencies)
            .chain(&self.managed_dependencies)
            .chain(&self.plugins)
            .chain(&self.managed_plugins)
            .chain(&self.extensions)
            .chain(self.plugin_dependencies.values().flatten())
            .cloned()
            .collect()
    }
}

/// Accumulates relationships for one project, deduplicating by equality and
/// rehoming each onto the key's project.
#[derive(Debug)]
pub struct ProjectRelationshipsBuilder {
    key: ProjectKey,
    parent: Option<ProjectRelationship>,
    dependencies: Vec<ProjectRelationship>,
    managed_dependencies: Vec<ProjectRelationship>,
    plugins: Vec<ProjectRelationship>,
    managed_plugins: Vec<ProjectRelationship>,
    extensions: Vec<ProjectRelationship>,
    plugin_dependencies: BTreeMap<PluginKey, Vec<ProjectRelationship>>,
}

fn push_unique(list: &mut Vec<ProjectRelationship>, rel: ProjectRelationship) {
    if !list.contains(&rel) {
        list.push(rel);
    }
}

impl ProjectRelationshipsBuilder {
    pub fn new(key: ProjectKey) -> Self {
        Self {
            key,
            parent: None,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            plugins: Vec::new(),
            managed_plugins: Vec::new(),
            extensions: Vec::new(),
            plugin_dependencies: BTreeMap::new(),
        }
    }

    fn adjust_declaring(&self, rel: ProjectRelationship) -> ProjectRelationship {
        if rel.declaring() == self.key.project() {
            rel
        } else {
            rel.clone_for(self.key.project())
        }
    }

    pub fn build(self) -> ProjectRelationships {
        let parent = self.parent.unwrap_or_else(|| {
            ProjectRelationship::terminus_parent(
                self.key.source().clone(),
                self.key.pom_location().clone(),
                self.key.project().clone(),
            )
        });
        ProjectRelationships {
            key: self.key,
            parent,
            dependencies: self.dependencies,
            managed_dependencies: self.managed_dependencies,
            plugins: self.plugins,
            managed_plugins: self.managed_plugins,
            extensions: self.extensions,
            plugin_dependencies: self.plugin_dependencies,
        }
    }

    /// Set the parent relationship. Non-parent relationships are ignored.
    pub fn with_parent(mut self, parent: ProjectRelationship) -> Self {
        if parent.relationship_type() == RelationshipType::Parent {
            self.parent = Some(self.adjust_declaring(parent));
        }
        self
    }

    pub fn with_parent_ref(self, parent: ProjectVersionRef) -> Self {
        let rel = ProjectRelationship::parent(
            self.key.source().clone(),
            self.key.pom_location().clone(),
            self.key.project().clone(),
            parent,
        );
        self.with_parent(rel)
    }

    pub fn with_dependencies<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        for dep in deps {
            if dep.relationship_type() != RelationshipType::Dependency {
                continue;
            }
            let dep = self.adjust_declaring(dep);
            if dep.is_managed() {
                push_unique(&mut self.managed_dependencies, dep);
            } else {
                push_unique(&mut self.dependencies, dep);
            }
        }
        self
    }

    pub fn with_plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        for plugin in plugins {
            if plugin.relationship_type() != RelationshipType::Plugin {
                continue;
            }
            let plugin = self.adjust_declaring(plugin);
            if plugin.is_managed() {
                push_unique(&mut self.managed_plugins, plugin);
            } else {
                push_unique(&mut self.plugins, plugin);
            }
        }
        self
    }

    /// Add plugin-level dependencies. Each must belong to a plugin already
    /// added with the same managed flag; otherwise nothing is added and
    /// [`AtlasError::OrphanedRelationship`] names the missing plugin.
    pub fn with_plugin_dependencies<I>(mut self, deps: I) -> AtlasResult<Self>
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        let mut accepted = Vec::new();
        for dep in deps {
            let (plugin, managed) = match dep.kind() {
                RelationshipKind::PluginDependency {
                    plugin, managed, ..
                } => (plugin.clone(), *managed),
                _ => continue,
            };
            let owners = if managed {
                &self.managed_plugins
            } else {
                &self.plugins
            };
            if !owners.iter().any(|p| *p.target().project() == plugin) {
                warn!("orphaned plugin dependency for {plugin} in {}", self.key.project());
                return Err(AtlasError::OrphanedRelationship {
                    plugin: plugin.to_string(),
                    relationship: dep.to_string(),
                });
            }
            accepted.push(((plugin, managed), self.adjust_declaring(dep)));
        }

        debug!(
            "adding {} plugin dependencies to {}",
            accepted.len(),
            self.key.project()
        );
        for (key, dep) in accepted {
            push_unique(self.plugin_dependencies.entry(key).or_default(), dep);
        }
        Ok(self)
    }

    pub fn with_extensions<I>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        for ext in exts {
            if ext.relationship_type() != RelationshipType::Extension {
                continue;
            }
            let ext = self.adjust_declaring(ext);
            push_unique(&mut self.extensions, ext);
        }
        self
    }

    /// Add relationships of any kind. Plugin dependencies are loaded after
    /// every plugin in the batch.
    pub fn with_relationships<I>(mut self, relationships: I) -> AtlasResult<Self>
    where
        I: IntoIterator<Item = ProjectRelationship>,
    {
        let mut plugin_deps = Vec::new();
        let mut seen = HashSet::new();
        for rel in relationships {
            match rel.relationship_type() {
                RelationshipType::Parent => self = self.with_parent(rel),
                RelationshipType::Dependency => self = self.with_dependencies([rel]),
                RelationshipType::Extension => self = self.with_extensions([rel]),
                RelationshipType::Plugin => self = self.with_plugins([rel]),
                RelationshipType::PluginDependency => {
                    if seen.insert(rel.clone()) {
                        plugin_deps.push(rel);
                    }
                }
            }
        }
        self.with_plugin_dependencies(plugin_deps)
    }

    /// The next dense index for relationships of `kind`. Parents always sit
    /// at index zero; plugin dependencies are indexed per plugin, see
    /// [`Self::next_plugin_dependency_index`].
    pub fn next_index(&self, kind: RelationshipType, managed: bool) -> usize {
        match (kind, managed) {
            (RelationshipType::Dependency, false) => self.dependencies.len(),
            (RelationshipType::Dependency, true) => self.managed_dependencies.len(),
            (RelationshipType::Plugin, false) => self.plugins.len(),
            (RelationshipType::Plugin, true) => self.managed_plugins.len(),
            (RelationshipType::Extension, _) => self.extensions.len(),
            (RelationshipType::Parent, _) => 0,
            (RelationshipType::PluginDependency, _) => self
                .plugin_dependencies
                .iter()
                .filter(|((_, m), _)| *m == managed)
                .map(|(_, deps)| deps.len())
                .sum(),
        }
    }

    pub fn next_plugin_dependency_index(&self, plugin: &ProjectRef, managed: bool) -> usize {
        self.plugin_dependencies
            .get(&(plugin.clone(), managed))
            .map_or(0, Vec::len)
    }

    pub fn with_dependency(
        self,
        target: ProjectVersionRef,
        artifact_type: Option<&str>,
        classifier: Option<&str>,
        scope: DependencyScope,
        managed: bool,
    ) -> Self {
        let rel = ProjectRelationship::dependency(
            self.key.source().clone(),
            self.key.pom_location().clone(),
            self.key.project().clone(),
            target.as_artifact(artifact_type, classifier, false),
            scope,
            self.next_index(RelationshipType::Dependency, managed),
            managed,
        );
        self.with_dependencies([rel])
    }

    pub fn with_plugin(self, target: ProjectVersionRef, managed: bool) -> Self {
        let rel = ProjectRelationship::plugin(
            self.key.source().clone(),
            self.key.pom_location().clone(),
            self.key.project().clone(),
            target,
            self.next_index(RelationshipType::Plugin, managed),
            managed,
            false,
        );
        self.with_plugins([rel])
    }

    pub fn with_extension(self, target: ProjectVersionRef) -> Self {
        let rel = ProjectRelationship::extension(
            self.key.source().clone(),
            self.key.pom_location().clone(),
            self.key.project().clone(),
            target,
            self.next_index(RelationshipType::Extension, false),
        );
        self.with_extensions([rel])
    }
}
