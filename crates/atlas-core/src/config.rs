use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use atlas_util::errors::{AtlasError, AtlasResult};

use crate::filter::{
    AndFilter, DependencyFilter, ExcludingFilter, FilterRef, OrFilter, RelationshipTypeFilter,
};
use crate::refs::ProjectRef;
use crate::relationship::RelationshipType;
use crate::scope::DependencyScope;

/// User configuration loaded from `~/.atlas/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Default traversal filter settings from `[traversal]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_scope")]
    pub scope: DependencyScope,
    #[serde(default, rename = "include-managed")]
    pub include_managed: bool,
    #[serde(default = "default_true", rename = "include-plugins")]
    pub include_plugins: bool,
    #[serde(default = "default_true", rename = "include-extensions")]
    pub include_extensions: bool,
    #[serde(default = "default_true", rename = "include-parents")]
    pub include_parents: bool,
    /// `group:artifact` refs never followed.
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            include_managed: false,
            include_plugins: true,
            include_extensions: true,
            include_parents: true,
            excludes: Vec::new(),
        }
    }
}

fn default_scope() -> DependencyScope {
    DependencyScope::Runtime
}

fn default_true() -> bool {
    true
}

impl TraversalConfig {
    pub fn exclude_refs(&self) -> AtlasResult<Vec<ProjectRef>> {
        self.excludes.iter().map(|e| ProjectRef::parse(e)).collect()
    }

    /// Build the filter chain these settings describe: dependencies in scope
    /// or any enabled non-dependency kind, minus the excluded projects.
    pub fn to_filter(&self) -> AtlasResult<FilterRef> {
        let excludes = self.exclude_refs()?;
        let deps: FilterRef = Arc::new(
            DependencyFilter::new(self.scope)
                .include_managed(self.include_managed)
                .with_excludes(excludes.iter().cloned()),
        );

        let mut types = Vec::new();
        if self.include_parents {
            types.push(RelationshipType::Parent);
        }
        if self.include_extensions {
            types.push(RelationshipType::Extension);
        }
        if self.include_plugins {
            types.push(RelationshipType::Plugin);
            types.push(RelationshipType::PluginDependency);
        }

        let followed: FilterRef = if types.is_empty() {
            deps
        } else {
            Arc::new(OrFilter::new(vec![
                deps,
                Arc::new(RelationshipTypeFilter::new(types, self.include_managed)),
            ]))
        };

        if excludes.is_empty() {
            Ok(followed)
        } else {
            Ok(Arc::new(AndFilter::new(vec![
                followed,
                Arc::new(ExcludingFilter::new(excludes)),
            ])))
        }
    }
}

/// Backing store settings from `[store]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_true", rename = "globally-backed")]
    pub globally_backed: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            globally_backed: true,
        }
    }
}

impl AtlasConfig {
    /// Load the configuration from `~/.atlas/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            debug!("loading configuration from {}", path.display());
            Ok(Self::from_path(&path)?)
        } else {
            debug!("no configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_path(path: &Path) -> AtlasResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AtlasResult<Self> {
        toml::from_str(content).map_err(|e| AtlasError::Config {
            message: format!("Failed to parse config: {e}"),
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Atlas data directory (`~/.atlas/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".atlas")
}
