use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use atlas_util::errors::AtlasError;

/// Maven-compatible dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Default for DependencyScope {
    fn default() -> Self {
        Self::Compile
    }
}

impl DependencyScope {
    pub const ALL: [DependencyScope; 6] = [
        Self::Compile,
        Self::Provided,
        Self::Runtime,
        Self::Test,
        Self::System,
        Self::Import,
    ];

    /// The name used in build descriptors.
    pub fn real_name(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Look up a scope by name, case-insensitively. A missing or blank name
    /// means `compile`.
    pub fn get_scope(name: Option<&str>) -> Option<DependencyScope> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match name {
            None => Some(Self::Compile),
            Some(n) => Self::ALL
                .into_iter()
                .find(|s| s.real_name().eq_ignore_ascii_case(n)),
        }
    }

    /// Scopes whose dependencies are visible on this scope's classpath.
    pub fn implied(self) -> &'static [DependencyScope] {
        match self {
            Self::Compile => &[Self::Compile, Self::Provided, Self::System],
            Self::Provided => &[Self::Provided],
            Self::Runtime => &[Self::Compile, Self::Runtime],
            Self::Test => &[
                Self::Compile,
                Self::Provided,
                Self::Runtime,
                Self::Test,
                Self::System,
            ],
            Self::System => &[Self::System],
            Self::Import => &[Self::Import],
        }
    }

    pub fn implies(self, other: DependencyScope) -> bool {
        self.implied().contains(&other)
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.real_name())
    }
}

impl FromStr for DependencyScope {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::get_scope(Some(s)).ok_or_else(|| AtlasError::InvalidReference {
            message: format!("unknown dependency scope '{s}'"),
        })
    }
}
