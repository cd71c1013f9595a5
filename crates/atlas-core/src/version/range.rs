//! Version ranges: `[1.0,2.0)`, `(,2.0]`, `[1.0,)` and pinned `[1.5]`.

use std::cmp::Ordering;
use std::fmt;

use atlas_util::errors::{AtlasError, AtlasResult};

use super::single::SingleVersion;
use super::VersionSpec;

/// A version range with at least one bound.
#[derive(Debug, Clone)]
pub struct RangeVersionSpec {
    raw: String,
    lower: Option<SingleVersion>,
    upper: Option<SingleVersion>,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl RangeVersionSpec {
    /// Build a range from its bounds. Fails with [`AtlasError::InvalidRange`]
    /// when neither bound is present.
    pub fn new(
        lower: Option<SingleVersion>,
        upper: Option<SingleVersion>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> AtlasResult<Self> {
        let lower_inclusive = lower_inclusive && lower.is_some();
        let upper_inclusive = upper_inclusive && upper.is_some();
        let raw = render(lower.as_ref(), upper.as_ref(), lower_inclusive, upper_inclusive);
        Self::with_raw(raw, lower, upper, lower_inclusive, upper_inclusive)
    }

    fn with_raw(
        raw: String,
        lower: Option<SingleVersion>,
        upper: Option<SingleVersion>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> AtlasResult<Self> {
        if lower.is_none() && upper.is_none() {
            return Err(AtlasError::InvalidRange { expression: raw });
        }
        Ok(Self {
            raw,
            lower_inclusive: lower_inclusive && lower.is_some(),
            upper_inclusive: upper_inclusive && upper.is_some(),
            lower,
            upper,
        })
    }

    /// Parse a single bracketed range expression.
    pub fn parse(expression: &str) -> AtlasResult<Self> {
        let s = expression.trim();
        let invalid = |reason: &str| AtlasError::InvalidVersionSpecification {
            version: expression.to_string(),
            reason: reason.to_string(),
        };

        let lower_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid("range must open with '[' or '('")),
        };
        let upper_inclusive = match s.chars().last() {
            Some(']') if s.len() > 1 => true,
            Some(')') if s.len() > 1 => false,
            _ => return Err(invalid("range must close with ']' or ')'")),
        };
        let inner = &s[1..s.len() - 1];

        let Some((lower, upper)) = inner.split_once(',') else {
            // `[1.5]` pins exactly one version
            if !(lower_inclusive && upper_inclusive) || inner.trim().is_empty() {
                return Err(invalid("a pinned version must be written as '[version]'"));
            }
            let pinned = SingleVersion::parse(inner)?;
            return Self::with_raw(s.to_string(), Some(pinned.clone()), Some(pinned), true, true);
        };
        if upper.contains(',') {
            return Err(invalid("a range holds at most two bounds"));
        }

        let parse_bound = |text: &str| -> AtlasResult<Option<SingleVersion>> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                SingleVersion::parse(text).map(Some)
            }
        };
        let lower = parse_bound(lower)?;
        let upper = parse_bound(upper)?;

        if let (Some(l), Some(u)) = (&lower, &upper) {
            match l.cmp(u) {
                Ordering::Greater => return Err(invalid("lower bound is above upper bound")),
                Ordering::Equal if !(lower_inclusive && upper_inclusive) => {
                    return Err(invalid("range excludes its only version"))
                }
                _ => {}
            }
        }

        Self::with_raw(s.to_string(), lower, upper, lower_inclusive, upper_inclusive)
    }

    pub fn lower_bound(&self) -> Option<&SingleVersion> {
        self.lower.as_ref()
    }

    pub fn upper_bound(&self) -> Option<&SingleVersion> {
        self.upper.as_ref()
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// Both bounds present, inclusive and equal.
    pub fn is_pinned(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => self.lower_inclusive && self.upper_inclusive && l == u,
            _ => false,
        }
    }

    pub fn pinned_version(&self) -> Option<&SingleVersion> {
        if self.is_pinned() {
            self.lower.as_ref()
        } else {
            None
        }
    }

    /// A pinned range resolves to exactly one version.
    pub fn is_concrete(&self) -> bool {
        self.is_pinned()
    }

    pub fn concrete_version(&self) -> Option<&SingleVersion> {
        self.pinned_version()
    }

    /// Snapshots are admitted when either bound is a snapshot.
    pub fn allows_snapshots(&self) -> bool {
        self.lower.iter().chain(self.upper.iter()).any(SingleVersion::is_snapshot)
    }

    pub fn is_snapshot(&self) -> bool {
        self.allows_snapshots()
    }

    pub fn is_release(&self) -> bool {
        !self.is_snapshot()
    }

    pub fn render_standard(&self) -> &str {
        &self.raw
    }

    /// Whether every version admitted by `spec` is also admitted here.
    pub fn contains(&self, spec: &VersionSpec) -> bool {
        match spec {
            VersionSpec::Single(v) => self.contains_version(v),
            VersionSpec::Range(r) => self.contains_range(r),
            VersionSpec::Compound(c) => c.members().iter().all(|m| self.contains(m)),
        }
    }

    /// Bound check for a single version.
    ///
    /// An exclusive non-release bound is satisfied by any non-release
    /// candidate, so `(1.0-SNAPSHOT,2.0)` admits `1.0-20130615.123456-3`
    /// and `[1.0,2.0-SNAPSHOT)` admits `2.0-SNAPSHOT`.
    pub fn contains_version(&self, version: &SingleVersion) -> bool {
        if let Some(lower) = &self.lower {
            let satisfied = match version.cmp(lower) {
                Ordering::Greater => true,
                Ordering::Equal => self.lower_inclusive,
                Ordering::Less => false,
            } || (!self.lower_inclusive && pre_release_match(lower, version));
            if !satisfied {
                return false;
            }
        }

        if let Some(upper) = &self.upper {
            let satisfied = match version.cmp(upper) {
                Ordering::Less => true,
                Ordering::Equal => self.upper_inclusive,
                Ordering::Greater => false,
            } || (!self.upper_inclusive && pre_release_match(upper, version));
            if !satisfied {
                return false;
            }
        }

        true
    }

    fn contains_range(&self, other: &RangeVersionSpec) -> bool {
        if let Some(lower) = &self.lower {
            let Some(other_lower) = &other.lower else {
                return false;
            };
            match other_lower.cmp(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !self.lower_inclusive && other.lower_inclusive => return false,
                _ => {}
            }
        }

        if let Some(upper) = &self.upper {
            let Some(other_upper) = &other.upper else {
                return false;
            };
            match other_upper.cmp(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.upper_inclusive && other.upper_inclusive => return false,
                _ => {}
            }
        }

        true
    }
}

fn pre_release_match(bound: &SingleVersion, version: &SingleVersion) -> bool {
    !bound.is_release() && !version.is_release()
}

fn render(
    lower: Option<&SingleVersion>,
    upper: Option<&SingleVersion>,
    lower_inclusive: bool,
    upper_inclusive: bool,
) -> String {
    let open = if lower_inclusive { '[' } else { '(' };
    let close = if upper_inclusive { ']' } else { ')' };
    match (lower, upper) {
        (Some(l), Some(u)) if lower_inclusive && upper_inclusive && l == u => {
            format!("[{l}]")
        }
        _ => format!(
            "{open}{},{}{close}",
            lower.map(ToString::to_string).unwrap_or_default(),
            upper.map(ToString::to_string).unwrap_or_default(),
        ),
    }
}

impl fmt::Display for RangeVersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SingleVersion {
        SingleVersion::parse(s).unwrap()
    }

    fn range(s: &str) -> RangeVersionSpec {
        RangeVersionSpec::parse(s).unwrap()
    }

    #[test]
    fn inclusive_bounds() {
        let r = range("[1.0,2.0]");
        assert!(r.contains_version(&v("1.0")));
        assert!(r.contains_version(&v("1.5")));
        assert!(r.contains_version(&v("2.0")));
        assert!(!r.contains_version(&v("0.9")));
        assert!(!r.contains_version(&v("2.1")));
    }

    #[test]
    fn exclusive_upper() {
        let r = range("[1.0,2.0)");
        assert!(r.contains_version(&v("1.9.9")));
        assert!(!r.contains_version(&v("2.0")));
        assert!(r.contains_version(&v("2.0-SNAPSHOT")));
    }

    #[test]
    fn open_ended() {
        assert!(range("(,2.0)").contains_version(&v("0.1")));
        assert!(range("[1.0,)").contains_version(&v("99")));
        assert!(!range("(1.0,)").contains_version(&v("1.0")));
    }

    #[test]
    fn pinned() {
        let r = range("[1.5]");
        assert!(r.is_pinned());
        assert!(r.is_concrete());
        assert_eq!(r.pinned_version(), Some(&v("1.5")));
        assert!(r.contains_version(&v("1.5.0")));
        assert!(!r.contains_version(&v("1.6")));
        assert!(!range("[1.5,1.6]").is_pinned());
    }

    #[test]
    fn exclusive_snapshot_bound_admits_snapshots() {
        let r = range("(1.0-SNAPSHOT,2.0-SNAPSHOT)");
        assert!(r.contains_version(&v("1.0-20130615.123456-3")));
        assert!(r.contains_version(&v("2.0-SNAPSHOT")));
        assert!(r.contains_version(&v("1.5")));
        assert!(!r.contains_version(&v("2.0")));
        assert!(!range("(1.0,2.0)").contains_version(&v("1.0-SNAPSHOT")));
    }

    #[test]
    fn exclusive_snapshot_bound_ignores_base_for_snapshots() {
        let r = range("(1.0-SNAPSHOT,2.0)");
        assert!(r.contains_version(&v("0.5-SNAPSHOT")));
        assert!(!r.contains_version(&v("0.5")));
        assert!(!r.contains_version(&v("2.5-SNAPSHOT")));

        let inclusive = range("[1.0-SNAPSHOT,2.0)");
        assert!(!inclusive.contains_version(&v("0.5-SNAPSHOT")));
    }

    #[test]
    fn snapshot_allowance() {
        assert!(range("[1.0-SNAPSHOT,2.0)").allows_snapshots());
        assert!(!range("[1.0,2.0)").allows_snapshots());
    }

    #[test]
    fn range_in_range() {
        let outer = range("[1.0,3.0)");
        assert!(outer.contains_range(&range("[1.0,2.0]")));
        assert!(outer.contains_range(&range("(1.0,3.0)")));
        assert!(!outer.contains_range(&range("[0.9,2.0]")));
        assert!(!outer.contains_range(&range("[1.0,3.0]")));
        assert!(!outer.contains_range(&range("[1.0,)")));
        assert!(!range("(1.0,3.0)").contains_range(&range("[1.0,2.0]")));
    }

    #[test]
    fn no_bounds_is_invalid_range() {
        let err = RangeVersionSpec::new(None, None, true, true).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidRange { .. }));
        let err = RangeVersionSpec::parse("(,)").unwrap_err();
        assert!(matches!(err, AtlasError::InvalidRange { .. }));
    }

    #[test]
    fn malformed_expressions() {
        for bad in ["1.0", "[1.0", "(1.0)", "[2.0,1.0]", "(1.0,1.0)", "[1,2,3]", "[]", "[1..0,2]"] {
            let err = RangeVersionSpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, AtlasError::InvalidVersionSpecification { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn rendering() {
        assert_eq!(range(" [1.0,2.0) ").render_standard(), "[1.0,2.0)");
        let built = RangeVersionSpec::new(Some(v("1.0")), None, false, true).unwrap();
        assert_eq!(built.render_standard(), "(1.0,)");
        assert!(!built.is_upper_inclusive());
    }
}
