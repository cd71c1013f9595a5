use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Atlas operations.
#[derive(Debug, Error, Diagnostic)]
pub enum AtlasError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A literal version could not be parsed.
    #[error("Invalid version specification '{version}': {reason}")]
    InvalidVersionSpecification { version: String, reason: String },

    /// A version range was declared without any bound.
    #[error("Invalid version range '{expression}': at least a lower or upper bound is required")]
    InvalidRange { expression: String },

    /// A plugin-level dependency was added before its owning plugin.
    #[error("Orphaned plugin-level dependency for plugin {plugin}: {relationship}")]
    #[diagnostic(help(
        "Load plugin relationships before the plugin-dependency relationships that belong to them"
    ))]
    OrphanedRelationship {
        plugin: String,
        relationship: String,
    },

    /// The backing store holds data the engine cannot reconcile.
    #[error("Inconsistent graph state: {message}")]
    InconsistentGraphState { message: String },

    /// A project or artifact reference is malformed.
    #[error("Invalid reference: {message}")]
    InvalidReference { message: String },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.atlas/config.toml for syntax errors"))]
    Config { message: String },
}

/// Convenience alias for results carrying an [`AtlasError`].
pub type AtlasResult<T> = Result<T, AtlasError>;
