//! Project coordinates: `group:artifact`, `group:artifact:version` and
//! typed artifact references.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use atlas_util::errors::{AtlasError, AtlasResult};

use crate::version::{SingleVersion, VersionSpec};

/// Default artifact type when none is declared.
pub const DEFAULT_TYPE: &str = "jar";

fn invalid(message: impl Into<String>) -> AtlasError {
    AtlasError::InvalidReference {
        message: message.into(),
    }
}

fn coordinate(value: &str, what: &str) -> AtlasResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{what} must not be empty")));
    }
    if value.contains(':') {
        return Err(invalid(format!("{what} '{value}' must not contain ':'")));
    }
    Ok(value.to_string())
}

/// Project identity without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRef {
    group_id: String,
    artifact_id: String,
}

impl ProjectRef {
    pub fn new(group_id: &str, artifact_id: &str) -> AtlasResult<Self> {
        Ok(Self {
            group_id: coordinate(group_id, "groupId")?,
            artifact_id: coordinate(artifact_id, "artifactId")?,
        })
    }

    /// Parse `"group:artifact"`.
    pub fn parse(s: &str) -> AtlasResult<Self> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, artifact] => Self::new(group, artifact),
            _ => Err(invalid(format!("'{s}' is not of the form group:artifact"))),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Attach a version to this project.
    pub fn with_version(&self, version: &str) -> AtlasResult<ProjectVersionRef> {
        ProjectVersionRef::new(self.clone(), version)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A project at a version (or version spec).
///
/// Equality, hashing and ordering use the group, artifact and the version
/// string as written; the parsed spec is carried alongside.
#[derive(Debug, Clone)]
pub struct ProjectVersionRef {
    project: ProjectRef,
    version: String,
    spec: VersionSpec,
}

impl ProjectVersionRef {
    pub fn new(project: ProjectRef, version: &str) -> AtlasResult<Self> {
        let version = version.trim();
        let spec = VersionSpec::parse(version)?;
        Ok(Self {
            project,
            version: version.to_string(),
            spec,
        })
    }

    pub fn of(group_id: &str, artifact_id: &str, version: &str) -> AtlasResult<Self> {
        Self::new(ProjectRef::new(group_id, artifact_id)?, version)
    }

    /// Parse `"group:artifact:version"`.
    pub fn parse(s: &str) -> AtlasResult<Self> {
        // ranges may contain ',' but never ':'
        match s.splitn(3, ':').collect::<Vec<_>>().as_slice() {
            [group, artifact, version] => Self::of(group, artifact, version),
            _ => Err(invalid(format!(
                "'{s}' is not of the form group:artifact:version"
            ))),
        }
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn group_id(&self) -> &str {
        self.project.group_id()
    }

    pub fn artifact_id(&self) -> &str {
        self.project.artifact_id()
    }

    pub fn version_string(&self) -> &str {
        &self.version
    }

    pub fn version_spec(&self) -> &VersionSpec {
        &self.spec
    }

    /// A range, compound or snapshot version that may resolve differently
    /// over time.
    pub fn is_variable_version(&self) -> bool {
        !self.spec.is_concrete() || self.spec.is_snapshot()
    }

    pub fn is_release(&self) -> bool {
        self.spec.is_release()
    }

    pub fn is_snapshot(&self) -> bool {
        self.spec.is_snapshot()
    }

    /// Same group, artifact and an equal version spec, regardless of how the
    /// version was written (`1.0` matches `1.0.0`).
    pub fn version_equivalent(&self, other: &ProjectVersionRef) -> bool {
        self.project == other.project && self.spec == other.spec
    }

    /// Pick a concrete version admitted by this ref's spec.
    pub fn select_version(&self, version: &SingleVersion) -> AtlasResult<ProjectVersionRef> {
        let candidate = VersionSpec::Single(version.clone());
        if !self.spec.contains(&candidate) {
            return Err(invalid(format!(
                "version {version} is not admitted by {self}"
            )));
        }
        Ok(Self {
            project: self.project.clone(),
            version: version.render_standard().to_string(),
            spec: candidate,
        })
    }

    pub fn as_artifact(
        &self,
        artifact_type: Option<&str>,
        classifier: Option<&str>,
        optional: bool,
    ) -> ArtifactRef {
        ArtifactRef::new(self.clone(), artifact_type, classifier, optional)
    }

    pub fn as_jar(&self) -> ArtifactRef {
        self.as_artifact(None, None, false)
    }
}

impl PartialEq for ProjectVersionRef {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project && self.version == other.version
    }
}

impl Eq for ProjectVersionRef {}

impl Hash for ProjectVersionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.project.hash(state);
        self.version.hash(state);
    }
}

impl Ord for ProjectVersionRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.project
            .cmp(&other.project)
            .then_with(|| self.spec.cmp(&other.spec))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for ProjectVersionRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProjectVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.version)
    }
}

/// A concrete artifact of a project: type, classifier and optional flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRef {
    pvr: ProjectVersionRef,
    artifact_type: String,
    classifier: Option<String>,
    optional: bool,
}

impl ArtifactRef {
    pub fn new(
        pvr: ProjectVersionRef,
        artifact_type: Option<&str>,
        classifier: Option<&str>,
        optional: bool,
    ) -> Self {
        let artifact_type = artifact_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TYPE);
        Self {
            pvr,
            artifact_type: artifact_type.to_string(),
            classifier: classifier
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            optional,
        }
    }

    pub fn project_version(&self) -> &ProjectVersionRef {
        &self.pvr
    }

    /// This artifact of another project version.
    pub fn with_project_version(&self, pvr: ProjectVersionRef) -> Self {
        Self {
            pvr,
            ..self.clone()
        }
    }

    pub fn project(&self) -> &ProjectRef {
        self.pvr.project()
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pvr, self.artifact_type)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_ref() {
        let r = ProjectRef::parse("org.foo:bar").unwrap();
        assert_eq!(r.group_id(), "org.foo");
        assert_eq!(r.artifact_id(), "bar");
        assert_eq!(r.to_string(), "org.foo:bar");
        assert!(ProjectRef::parse("org.foo").is_err());
        assert!(ProjectRef::new("", "bar").is_err());
    }

    #[test]
    fn parse_project_version_ref_with_range() {
        let r = ProjectVersionRef::parse("org.foo:bar:[1.0,2.0)").unwrap();
        assert_eq!(r.version_string(), "[1.0,2.0)");
        assert!(r.is_variable_version());
        assert!(matches!(r.version_spec(), VersionSpec::Range(_)));
    }

    #[test]
    fn equality_uses_version_string() {
        let a = ProjectVersionRef::parse("g:a:1.0").unwrap();
        let b = ProjectVersionRef::parse("g:a:1.0.0").unwrap();
        assert_ne!(a, b);
        assert!(a.version_equivalent(&b));
    }

    #[test]
    fn variable_versions() {
        assert!(!ProjectVersionRef::parse("g:a:1.0").unwrap().is_variable_version());
        assert!(ProjectVersionRef::parse("g:a:1.0-SNAPSHOT").unwrap().is_variable_version());
        assert!(!ProjectVersionRef::parse("g:a:[1.0]").unwrap().is_variable_version());
    }

    #[test]
    fn select_version_checks_containment() {
        let r = ProjectVersionRef::parse("g:a:[1.0,2.0)").unwrap();
        let picked = r.select_version(&SingleVersion::parse("1.5").unwrap()).unwrap();
        assert_eq!(picked.to_string(), "g:a:1.5");
        assert!(!picked.is_variable_version());
        assert!(r.select_version(&SingleVersion::parse("2.0").unwrap()).is_err());
    }

    #[test]
    fn artifact_defaults() {
        let pvr = ProjectVersionRef::parse("g:a:1").unwrap();
        let jar = pvr.as_jar();
        assert_eq!(jar.artifact_type(), "jar");
        assert_eq!(jar.classifier(), None);
        assert_eq!(jar.to_string(), "g:a:1:jar");
        let sources = pvr.as_artifact(Some("jar"), Some("sources"), true);
        assert_eq!(sources.to_string(), "g:a:1:jar:sources");
        assert!(sources.is_optional());
    }

    #[test]
    fn bad_version_fails_reference() {
        let err = ProjectVersionRef::parse("g:a:1..0").unwrap_err();
        assert!(matches!(err, AtlasError::InvalidVersionSpecification { .. }));
    }
}
