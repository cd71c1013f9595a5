//! Version specification algebra.
//!
//! A [`VersionSpec`] is a single version, a bounded range or a compound of
//! specs. All three share one total ordering: every spec is viewed as a list
//! of intervals and compared lower bound first, so `1.0 < [1.0,2.0) < 1.5`.

mod compound;
mod part;
mod range;
mod single;

pub use compound::CompoundVersionSpec;
pub use part::{QualifierKind, SnapshotPart, StringPart, VersionPart};
pub use range::RangeVersionSpec;
pub use single::SingleVersion;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use atlas_util::errors::{AtlasError, AtlasResult};

/// Any version expression a relationship can carry.
#[derive(Debug, Clone)]
pub enum VersionSpec {
    Single(SingleVersion),
    Range(RangeVersionSpec),
    Compound(CompoundVersionSpec),
}

impl VersionSpec {
    /// Parse a version expression.
    ///
    /// Bracketed expressions become ranges; several comma-joined ranges
    /// become a compound. Anything else must be a single version.
    pub fn parse(expression: &str) -> AtlasResult<Self> {
        let s = expression.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return SingleVersion::parse(s).map(VersionSpec::Single);
        }

        let pieces = split_ranges(expression, s)?;
        if let [only] = pieces.as_slice() {
            return RangeVersionSpec::parse(only).map(VersionSpec::Range);
        }

        let members = pieces
            .iter()
            .map(|piece| RangeVersionSpec::parse(piece).map(VersionSpec::Range))
            .collect::<AtlasResult<Vec<_>>>()?;
        CompoundVersionSpec::new(s, members).map(VersionSpec::Compound)
    }

    pub fn compare(&self, other: &VersionSpec) -> Ordering {
        self.cmp(other)
    }

    /// Whether every version admitted by `other` is admitted by `self`.
    pub fn contains(&self, other: &VersionSpec) -> bool {
        match self {
            VersionSpec::Single(v) => match other {
                VersionSpec::Single(o) => v == o,
                VersionSpec::Range(r) => r.pinned_version() == Some(v),
                VersionSpec::Compound(c) => c.members().iter().all(|m| self.contains(m)),
            },
            VersionSpec::Range(r) => r.contains(other),
            VersionSpec::Compound(c) => c.contains(other),
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, VersionSpec::Single(_))
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete_version().is_some()
    }

    /// The one version this spec resolves to, if any.
    pub fn concrete_version(&self) -> Option<&SingleVersion> {
        match self {
            VersionSpec::Single(v) => Some(v),
            VersionSpec::Range(r) => r.concrete_version(),
            VersionSpec::Compound(c) => c.concrete_version(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        match self {
            VersionSpec::Single(v) => v.is_snapshot(),
            VersionSpec::Range(r) => r.is_snapshot(),
            VersionSpec::Compound(c) => c.is_snapshot(),
        }
    }

    pub fn is_release(&self) -> bool {
        !self.is_snapshot()
    }

    pub fn render_standard(&self) -> &str {
        match self {
            VersionSpec::Single(v) => v.render_standard(),
            VersionSpec::Range(r) => r.render_standard(),
            VersionSpec::Compound(c) => c.render_standard(),
        }
    }

    fn intervals(&self) -> Vec<Interval<'_>> {
        match self {
            VersionSpec::Single(v) => vec![Interval {
                lower: Lower::At(v, false),
                upper: Upper::At(v, true),
            }],
            VersionSpec::Range(r) => vec![Interval {
                lower: r
                    .lower_bound()
                    .map_or(Lower::Unbounded, |v| Lower::At(v, !r.is_lower_inclusive())),
                upper: r
                    .upper_bound()
                    .map_or(Upper::Unbounded, |v| Upper::At(v, r.is_upper_inclusive())),
            }],
            VersionSpec::Compound(c) => c.members().iter().flat_map(|m| m.intervals()).collect(),
        }
    }

    /// Variant shape, used to keep ordering consistent with equality when
    /// two specs cover identical intervals.
    fn shape(&self) -> Vec<u8> {
        match self {
            VersionSpec::Single(_) => vec![0],
            VersionSpec::Range(_) => vec![1],
            VersionSpec::Compound(c) => std::iter::once(2)
                .chain(c.members().iter().flat_map(|m| m.shape()))
                .collect(),
        }
    }
}

/// Compare two specs on the shared ordering line.
pub fn compare(a: &VersionSpec, b: &VersionSpec) -> Ordering {
    a.cmp(b)
}

/// Whether `range` admits everything `spec` admits.
pub fn contains(range: &RangeVersionSpec, spec: &VersionSpec) -> bool {
    range.contains(spec)
}

/// Lower bound; the flag marks an exclusive bound, which sorts after an
/// inclusive one at the same version.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Lower<'a> {
    Unbounded,
    At(&'a SingleVersion, bool),
}

/// Upper bound; the flag marks an inclusive bound, which sorts after an
/// exclusive one at the same version.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Upper<'a> {
    At(&'a SingleVersion, bool),
    Unbounded,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Interval<'a> {
    lower: Lower<'a>,
    upper: Upper<'a>,
}

fn split_ranges<'a>(expression: &str, s: &'a str) -> AtlasResult<Vec<&'a str>> {
    let invalid = |reason: &str| AtlasError::InvalidVersionSpecification {
        version: expression.to_string(),
        reason: reason.to_string(),
    };

    let mut pieces = Vec::new();
    let mut rest = s;
    loop {
        rest = rest.trim_start();
        let end = rest
            .find([']', ')'])
            .ok_or_else(|| invalid("unterminated range"))?;
        pieces.push(&rest[..=end]);
        rest = rest[end + 1..].trim_start();
        if rest.is_empty() {
            return Ok(pieces);
        }
        rest = rest
            .strip_prefix(',')
            .ok_or_else(|| invalid("ranges must be separated by ','"))?;
    }
}

impl PartialEq for VersionSpec {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionSpec {}

impl Hash for VersionSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.intervals().hash(state);
        self.shape().hash(state);
    }
}

impl Ord for VersionSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.intervals()
            .cmp(&other.intervals())
            .then_with(|| self.shape().cmp(&other.shape()))
    }
}

impl PartialOrd for VersionSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render_standard())
    }
}

impl From<SingleVersion> for VersionSpec {
    fn from(v: SingleVersion) -> Self {
        VersionSpec::Single(v)
    }
}

impl From<RangeVersionSpec> for VersionSpec {
    fn from(r: RangeVersionSpec) -> Self {
        VersionSpec::Range(r)
    }
}
