//! Individual version parts and their cross-kind ordering.
//!
//! Every part maps onto a single ordering line:
//!
//! ```text
//! snapshot < alpha < beta < milestone < rc < <other text> < release(""/ga/final) == 0 < sp < 1 < 2 < ...
//! ```
//!
//! Local snapshots sort below timestamped ones; two timestamped snapshots
//! compare by timestamp, then build number.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Well-known qualifiers with a defined ordering. `Text` covers any
/// qualifier that is not recognised.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Text,
    Release,
    Sp,
}

impl QualifierKind {
    fn classify(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "alpha" | "a" => Self::Alpha,
            "beta" | "b" => Self::Beta,
            "milestone" | "m" => Self::Milestone,
            "rc" | "cr" => Self::Rc,
            "" | "ga" | "final" | "release" => Self::Release,
            "sp" => Self::Sp,
            _ => Self::Text,
        }
    }
}

/// A textual qualifier such as `beta`, `RC` or `jre`.
#[derive(Debug, Clone)]
pub struct StringPart {
    literal: String,
    kind: QualifierKind,
}

impl StringPart {
    pub fn new(literal: &str) -> Self {
        Self {
            literal: literal.to_string(),
            kind: QualifierKind::classify(literal),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn kind(&self) -> QualifierKind {
        self.kind
    }
}

/// A snapshot marker: either the literal `SNAPSHOT` (local) or a deployed
/// `yyyyMMdd.HHmmss-N` timestamp with build number (remote).
#[derive(Debug, Clone)]
pub struct SnapshotPart {
    timestamp: Option<u64>,
    build_number: Option<u32>,
    literal: String,
}

impl SnapshotPart {
    pub fn local(literal: &str) -> Self {
        Self {
            timestamp: None,
            build_number: None,
            literal: literal.to_string(),
        }
    }

    /// `timestamp` is the `yyyyMMddHHmmss` value read as a number.
    pub fn remote(timestamp: u64, build_number: u32, literal: &str) -> Self {
        Self {
            timestamp: Some(timestamp),
            build_number: Some(build_number),
            literal: literal.to_string(),
        }
    }

    pub fn is_local_snapshot(&self) -> bool {
        self.timestamp.is_none()
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    pub fn build_number(&self) -> Option<u32> {
        self.build_number
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

/// One component of a single version.
#[derive(Debug, Clone)]
pub enum VersionPart {
    Numeric(u64),
    Qualifier(StringPart),
    Snapshot(SnapshotPart),
}

/// Position of a part on the ordering line. Derived `Ord` follows variant
/// declaration order, then field order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum PartKey {
    Snapshot {
        timestamp: Option<u64>,
        build_number: Option<u32>,
    },
    PreRelease(QualifierKind, String),
    /// `0` is release/zero, `1` is `sp`, numeric `n` is `2n`.
    Release(u128),
}

impl PartKey {
    /// The implicit part used when one version is shorter than another.
    pub(crate) const PADDING: PartKey = PartKey::Release(0);
}

impl VersionPart {
    pub(crate) fn key(&self) -> PartKey {
        match self {
            VersionPart::Numeric(n) => PartKey::Release(u128::from(*n) * 2),
            VersionPart::Qualifier(q) => match q.kind {
                QualifierKind::Release => PartKey::Release(0),
                QualifierKind::Sp => PartKey::Release(1),
                QualifierKind::Text => PartKey::PreRelease(q.kind, q.literal.to_lowercase()),
                kind => PartKey::PreRelease(kind, String::new()),
            },
            VersionPart::Snapshot(s) => PartKey::Snapshot {
                timestamp: s.timestamp,
                build_number: s.build_number,
            },
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, VersionPart::Snapshot(_))
    }

    /// Render this part as it appeared in the version literal.
    pub fn render_standard(&self) -> String {
        match self {
            VersionPart::Numeric(n) => n.to_string(),
            VersionPart::Qualifier(q) => q.literal.clone(),
            VersionPart::Snapshot(s) => s.literal.clone(),
        }
    }
}

impl PartialEq for VersionPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionPart {}

impl Hash for VersionPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> VersionPart {
        VersionPart::Qualifier(StringPart::new(s))
    }

    fn all_parts() -> Vec<VersionPart> {
        vec![
            VersionPart::Numeric(0),
            VersionPart::Numeric(1),
            VersionPart::Numeric(42),
            q("alpha"),
            q("b"),
            q("M"),
            q("rc"),
            q("jre"),
            q("android"),
            q("GA"),
            q("final"),
            q("sp"),
            VersionPart::Snapshot(SnapshotPart::local("SNAPSHOT")),
            VersionPart::Snapshot(SnapshotPart::remote(20130615123456, 1, "20130615.123456-1")),
            VersionPart::Snapshot(SnapshotPart::remote(20130615123456, 2, "20130615.123456-2")),
            VersionPart::Snapshot(SnapshotPart::remote(20140101000000, 1, "20140101.000000-1")),
        ]
    }

    #[test]
    fn ordering_is_antisymmetric_across_kinds() {
        let parts = all_parts();
        for a in &parts {
            for b in &parts {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn snapshot_below_every_non_snapshot() {
        for part in all_parts().iter().filter(|p| !p.is_snapshot()) {
            for snap in all_parts().iter().filter(|p| p.is_snapshot()) {
                assert!(snap < part, "{snap:?} should sort below {part:?}");
            }
        }
    }

    #[test]
    fn numeric_beats_prerelease_qualifiers() {
        assert!(VersionPart::Numeric(0) > q("rc"));
        assert!(VersionPart::Numeric(1) > q("jre"));
        assert!(VersionPart::Numeric(1) > q("sp"));
    }

    #[test]
    fn release_qualifiers_equal_zero() {
        assert_eq!(q("ga"), VersionPart::Numeric(0));
        assert_eq!(q("final"), q("GA"));
    }

    #[test]
    fn local_snapshot_below_remote() {
        let local = VersionPart::Snapshot(SnapshotPart::local("SNAPSHOT"));
        let remote = VersionPart::Snapshot(SnapshotPart::remote(20130615123456, 1, "x"));
        assert!(local < remote);
    }

    #[test]
    fn remote_snapshots_by_timestamp_then_build() {
        let a = VersionPart::Snapshot(SnapshotPart::remote(20130615123456, 7, "a"));
        let b = VersionPart::Snapshot(SnapshotPart::remote(20130615123456, 8, "b"));
        let c = VersionPart::Snapshot(SnapshotPart::remote(20130616000000, 1, "c"));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn text_qualifiers_compare_case_insensitively() {
        assert_eq!(q("JRE"), q("jre"));
        assert!(q("android") < q("jre"));
        assert!(q("rc") < q("android"));
    }
}
