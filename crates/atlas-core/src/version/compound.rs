//! Comma-joined version specs such as `[1.0,2.0),[1.5,3.0)`.

use std::fmt;

use atlas_util::errors::{AtlasError, AtlasResult};

use super::single::SingleVersion;
use super::VersionSpec;

/// An ordered sequence of specs, satisfied only when every member is.
#[derive(Debug, Clone)]
pub struct CompoundVersionSpec {
    raw: String,
    members: Vec<VersionSpec>,
}

impl CompoundVersionSpec {
    pub fn new(raw: impl Into<String>, members: Vec<VersionSpec>) -> AtlasResult<Self> {
        let raw = raw.into();
        if members.is_empty() {
            return Err(AtlasError::InvalidVersionSpecification {
                version: raw,
                reason: "a compound spec needs at least one member".to_string(),
            });
        }
        Ok(Self { raw, members })
    }

    pub fn members(&self) -> &[VersionSpec] {
        &self.members
    }

    pub fn contains(&self, spec: &VersionSpec) -> bool {
        self.members.iter().all(|m| m.contains(spec))
    }

    pub fn is_snapshot(&self) -> bool {
        self.members.iter().any(VersionSpec::is_snapshot)
    }

    pub fn is_release(&self) -> bool {
        !self.is_snapshot()
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete_version().is_some()
    }

    /// Only a single concrete member makes the compound concrete.
    pub fn concrete_version(&self) -> Option<&SingleVersion> {
        match self.members.as_slice() {
            [only] => only.concrete_version(),
            _ => None,
        }
    }

    pub fn render_standard(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CompoundVersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'a> IntoIterator for &'a CompoundVersionSpec {
    type Item = &'a VersionSpec;
    type IntoIter = std::slice::Iter<'a, VersionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
