//! Relationship filters.
//!
//! A filter decides whether a traversal follows an edge, and hands back the
//! filter to apply one level further down the path. Filters are immutable
//! and shared through [`FilterRef`]; narrowing always builds a new value.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::refs::ProjectRef;
use crate::relationship::{ProjectRelationship, RelationshipType};
use crate::scope::DependencyScope;

/// Shared handle to a filter.
pub type FilterRef = Arc<dyn ProjectRelationshipFilter>;

pub trait ProjectRelationshipFilter: Send + Sync + fmt::Debug {
    fn accept(&self, rel: &ProjectRelationship) -> bool;

    /// The filter for edges below `parent`, which this filter accepted.
    fn child_filter(self: Arc<Self>, parent: &ProjectRelationship) -> FilterRef;

    /// Human-readable form, used in logs and reports.
    fn render(&self) -> String;
}

/// Remove every relationship `filter` rejects.
pub fn retain_accepted(rels: &mut Vec<ProjectRelationship>, filter: &dyn ProjectRelationshipFilter) {
    rels.retain(|r| filter.accept(r));
}

/// Accepts everything and never narrows.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyFilter;

impl AnyFilter {
    pub fn shared() -> FilterRef {
        Arc::new(AnyFilter)
    }
}

impl ProjectRelationshipFilter for AnyFilter {
    fn accept(&self, _rel: &ProjectRelationship) -> bool {
        true
    }

    fn child_filter(self: Arc<Self>, _parent: &ProjectRelationship) -> FilterRef {
        self
    }

    fn render(&self) -> String {
        "ANY".to_string()
    }
}

/// Rejects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneFilter;

impl ProjectRelationshipFilter for NoneFilter {
    fn accept(&self, _rel: &ProjectRelationship) -> bool {
        false
    }

    fn child_filter(self: Arc<Self>, _parent: &ProjectRelationship) -> FilterRef {
        self
    }

    fn render(&self) -> String {
        "NONE".to_string()
    }
}

/// Follows dependency edges whose scope is implied by `scope`.
///
/// Below an accepted edge, test and runtime views narrow to `runtime` and
/// compile/provided views narrow to `compile`; the edge's own exclusions
/// are added to the filter's.
#[derive(Debug, Clone)]
pub struct DependencyFilter {
    scope: DependencyScope,
    include_managed: bool,
    excludes: BTreeSet<ProjectRef>,
}

impl DependencyFilter {
    pub fn new(scope: DependencyScope) -> Self {
        Self {
            scope,
            include_managed: false,
            excludes: BTreeSet::new(),
        }
    }

    pub fn include_managed(mut self, include: bool) -> Self {
        self.include_managed = include;
        self
    }

    pub fn with_excludes<I>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = ProjectRef>,
    {
        self.excludes.extend(excludes);
        self
    }

    pub fn scope(&self) -> DependencyScope {
        self.scope
    }

    pub fn excludes(&self) -> &BTreeSet<ProjectRef> {
        &self.excludes
    }

    fn transitive_scope(&self) -> DependencyScope {
        match self.scope {
            DependencyScope::Test | DependencyScope::Runtime => DependencyScope::Runtime,
            DependencyScope::Compile | DependencyScope::Provided => DependencyScope::Compile,
            other => other,
        }
    }
}

impl ProjectRelationshipFilter for DependencyFilter {
    fn accept(&self, rel: &ProjectRelationship) -> bool {
        let Some(scope) = rel.scope() else {
            return false;
        };
        if rel.is_managed() && !self.include_managed {
            return false;
        }
        self.scope.implies(scope) && !self.excludes.contains(rel.target().project())
    }

    fn child_filter(self: Arc<Self>, parent: &ProjectRelationship) -> FilterRef {
        let parent_excludes = parent.excludes().filter(|e| !e.is_empty());
        let scope = self.transitive_scope();
        if parent_excludes.is_none() && scope == self.scope {
            return self;
        }
        let mut child = (*self).clone();
        child.scope = scope;
        if let Some(excludes) = parent_excludes {
            child.excludes.extend(excludes.iter().cloned());
        }
        Arc::new(child)
    }

    fn render(&self) -> String {
        let mut out = format!("DEPENDENCIES[scope: {}", self.scope);
        if self.include_managed {
            out.push_str(", managed");
        }
        if !self.excludes.is_empty() {
            let excludes: Vec<String> = self.excludes.iter().map(ToString::to_string).collect();
            out.push_str(&format!(", excludes: {{{}}}", excludes.join(", ")));
        }
        out.push(']');
        out
    }
}

/// Follows edges of the listed types.
#[derive(Debug, Clone)]
pub struct RelationshipTypeFilter {
    types: BTreeSet<RelationshipType>,
    include_managed: bool,
}

impl RelationshipTypeFilter {
    pub fn new<I>(types: I, include_managed: bool) -> Self
    where
        I: IntoIterator<Item = RelationshipType>,
    {
        Self {
            types: types.into_iter().collect(),
            include_managed,
        }
    }
}

impl ProjectRelationshipFilter for RelationshipTypeFilter {
    fn accept(&self, rel: &ProjectRelationship) -> bool {
        self.types.contains(&rel.relationship_type()) && (self.include_managed || !rel.is_managed())
    }

    fn child_filter(self: Arc<Self>, _parent: &ProjectRelationship) -> FilterRef {
        self
    }

    fn render(&self) -> String {
        let types: Vec<&str> = self.types.iter().map(|t| t.name()).collect();
        format!("TYPES[{}]", types.join(", "))
    }
}

/// Rejects edges targeting any of the excluded projects.
#[derive(Debug, Clone)]
pub struct ExcludingFilter {
    excludes: BTreeSet<ProjectRef>,
}

impl ExcludingFilter {
    pub fn new<I>(excludes: I) -> Self
    where
        I: IntoIterator<Item = ProjectRef>,
    {
        Self {
            excludes: excludes.into_iter().collect(),
        }
    }
}

impl ProjectRelationshipFilter for ExcludingFilter {
    fn accept(&self, rel: &ProjectRelationship) -> bool {
        !self.excludes.contains(rel.target().project())
    }

    fn child_filter(self: Arc<Self>, _parent: &ProjectRelationship) -> FilterRef {
        self
    }

    fn render(&self) -> String {
        let excludes: Vec<String> = self.excludes.iter().map(ToString::to_string).collect();
        format!("EXCLUDE[{}]", excludes.join(", "))
    }
}

fn child_filters(filters: &[FilterRef], parent: &ProjectRelationship) -> Vec<FilterRef> {
    filters
        .iter()
        .map(|f| Arc::clone(f).child_filter(parent))
        .collect()
}

fn render_joined(filters: &[FilterRef], op: &str) -> String {
    let parts: Vec<String> = filters.iter().map(|f| f.render()).collect();
    format!("[{}]", parts.join(op))
}

/// Accepts an edge only when every child does. Children are consulted in
/// order and evaluation stops at the first rejection.
#[derive(Debug, Clone)]
pub struct AndFilter {
    filters: Vec<FilterRef>,
}

impl AndFilter {
    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[FilterRef] {
        &self.filters
    }
}

impl ProjectRelationshipFilter for AndFilter {
    fn accept(&self, rel: &ProjectRelationship) -> bool {
        self.filters.iter().all(|f| f.accept(rel))
    }

    fn child_filter(self: Arc<Self>, parent: &ProjectRelationship) -> FilterRef {
        Arc::new(AndFilter::new(child_filters(&self.filters, parent)))
    }

    fn render(&self) -> String {
        render_joined(&self.filters, " && ")
    }
}

/// Accepts an edge when any child does.
#[derive(Debug, Clone)]
pub struct OrFilter {
    filters: Vec<FilterRef>,
}

impl OrFilter {
    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[FilterRef] {
        &self.filters
    }
}

impl ProjectRelationshipFilter for OrFilter {
    fn accept(&self, rel: &ProjectRelationship) -> bool {
        self.filters.iter().any(|f| f.accept(rel))
    }

    fn child_filter(self: Arc<Self>, parent: &ProjectRelationship) -> FilterRef {
        Arc::new(OrFilter::new(child_filters(&self.filters, parent)))
    }

    fn render(&self) -> String {
        render_joined(&self.filters, " || ")
    }
}
