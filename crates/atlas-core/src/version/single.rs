//! Single (concrete) versions such as `1.2.0`, `31.0-jre` or `1.0-SNAPSHOT`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use atlas_util::errors::{AtlasError, AtlasResult};

use super::part::{PartKey, SnapshotPart, StringPart, VersionPart};

/// Characters that can never appear in a single version literal.
const ILLEGAL_CHARS: &[char] = &['[', ']', '(', ')', ',', ':', '/', '\\'];

/// A parsed single version: an ordered sequence of parts plus the literal.
#[derive(Debug, Clone)]
pub struct SingleVersion {
    raw: String,
    parts: Vec<VersionPart>,
}

impl SingleVersion {
    /// Parse a literal version.
    ///
    /// Tokens are split on `.`, `-`, `_` and on digit/letter transitions.
    /// `SNAPSHOT` becomes a local snapshot part; a trailing
    /// `yyyyMMdd.HHmmss-N` becomes a remote snapshot part.
    pub fn parse(literal: &str) -> AtlasResult<Self> {
        let raw = literal.trim();
        if raw.is_empty() {
            return Err(invalid(literal, "version is empty"));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| c.is_whitespace() || ILLEGAL_CHARS.contains(c))
        {
            return Err(invalid(literal, &format!("illegal character '{c}'")));
        }

        let (base, remote) = match split_remote_snapshot(raw) {
            Some((base, part)) => (base, Some(part)),
            None => (raw, None),
        };

        let mut parts = tokenize(base).map_err(|reason| invalid(literal, &reason))?;
        if let Some(part) = remote {
            parts.push(VersionPart::Snapshot(part));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn parts(&self) -> &[VersionPart] {
        &self.parts
    }

    /// The literal this version was parsed from.
    pub fn render_standard(&self) -> &str {
        &self.raw
    }

    pub fn is_snapshot(&self) -> bool {
        self.parts.iter().any(VersionPart::is_snapshot)
    }

    pub fn is_release(&self) -> bool {
        !self.is_snapshot()
    }

    pub fn is_local_snapshot(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, VersionPart::Snapshot(s) if s.is_local_snapshot()))
    }

    /// Split into the parts preceding a trailing snapshot marker and the
    /// marker itself.
    fn split_trailing_snapshot(&self) -> (&[VersionPart], Option<&VersionPart>) {
        match self.parts.split_last() {
            Some((last, rest)) if last.is_snapshot() => (rest, Some(last)),
            _ => (&self.parts, None),
        }
    }

    /// Keys of the parts preceding a trailing snapshot marker, with trailing
    /// padding-equivalent parts removed.
    fn base_keys(&self) -> Vec<PartKey> {
        let (base, _) = self.split_trailing_snapshot();
        let mut keys: Vec<PartKey> = base.iter().map(VersionPart::key).collect();
        while keys.last() == Some(&PartKey::PADDING) {
            keys.pop();
        }
        keys
    }

    /// The sequence this version occupies on the ordering line. A trailing
    /// snapshot marker is left-padded: it follows the last significant base
    /// part, so `1-SNAPSHOT` and `1.0-SNAPSHOT` line up.
    fn ordering_keys(&self) -> Vec<PartKey> {
        let mut keys = self.base_keys();
        if let (_, Some(snapshot)) = self.split_trailing_snapshot() {
            keys.push(snapshot.key());
        }
        keys
    }
}

fn invalid(literal: &str, reason: &str) -> AtlasError {
    AtlasError::InvalidVersionSpecification {
        version: literal.to_string(),
        reason: reason.to_string(),
    }
}

/// Compare two key sequences position-wise, padding the shorter one.
fn compare_padded(a: &[PartKey], b: &[PartKey]) -> Ordering {
    let max_len = a.len().max(b.len());
    for i in 0..max_len {
        let ka = a.get(i).unwrap_or(&PartKey::PADDING);
        let kb = b.get(i).unwrap_or(&PartKey::PADDING);
        let ord = ka.cmp(kb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Recognise `<base>-yyyyMMdd.HHmmss-N`.
fn split_remote_snapshot(raw: &str) -> Option<(&str, SnapshotPart)> {
    let (rest, build) = raw.rsplit_once('-')?;
    let (base, stamp) = rest.rsplit_once('-')?;
    let (date, time) = stamp.split_once('.')?;

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if date.len() != 8 || time.len() != 6 || !all_digits(date) || !all_digits(time) {
        return None;
    }
    if !all_digits(build) || base.is_empty() {
        return None;
    }

    let timestamp: u64 = format!("{date}{time}").parse().ok()?;
    let build_number: u32 = build.parse().ok()?;
    let literal = &raw[base.len() + 1..];
    Some((
        base,
        SnapshotPart::remote(timestamp, build_number, literal),
    ))
}

fn tokenize(base: &str) -> Result<Vec<VersionPart>, String> {
    let mut parts = Vec::new();
    for segment in base.split(['.', '-', '_']) {
        if segment.is_empty() {
            return Err("empty version segment".to_string());
        }

        let mut current = String::new();
        let mut current_is_digit = None;
        for ch in segment.chars() {
            let is_digit = ch.is_ascii_digit();
            if current_is_digit.is_some_and(|d| d != is_digit) {
                parts.push(classify(&current)?);
                current.clear();
            }
            current.push(ch);
            current_is_digit = Some(is_digit);
        }
        if !current.is_empty() {
            parts.push(classify(&current)?);
        }
    }
    Ok(parts)
}

fn classify(token: &str) -> Result<VersionPart, String> {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return token
            .parse::<u64>()
            .map(VersionPart::Numeric)
            .map_err(|_| format!("numeric segment '{token}' is out of range"));
    }
    if token.eq_ignore_ascii_case("snapshot") {
        return Ok(VersionPart::Snapshot(SnapshotPart::local(token)));
    }
    Ok(VersionPart::Qualifier(StringPart::new(token)))
}

impl PartialEq for SingleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SingleVersion {}

impl Hash for SingleVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordering_keys().hash(state);
    }
}

impl Ord for SingleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_padded(&self.ordering_keys(), &other.ordering_keys())
    }
}

impl PartialOrd for SingleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SingleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> SingleVersion {
        SingleVersion::parse(s).unwrap()
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn qualifier_ordering() {
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-rc"));
        assert!(v("1.0-rc") < v("1.0"));
        assert!(v("1.0") < v("1.0-sp"));
        assert!(v("1.0-sp") < v("1.0.1"));
    }

    #[test]
    fn snapshot_before_release() {
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0-SNAPSHOT") < v("1.0-alpha"));
        assert!(v("1.0-SNAPSHOT") > v("0.9"));
        assert!(v("1.0.1-SNAPSHOT") > v("1.0"));
    }

    #[test]
    fn snapshot_left_padding() {
        assert_eq!(v("1-SNAPSHOT"), v("1.0-SNAPSHOT"));
        assert!(v("1-SNAPSHOT") < v("1.0.0"));
    }

    #[test]
    fn remote_snapshot_parsing() {
        let remote = v("1.0-20130615.123456-12");
        assert!(remote.is_snapshot());
        assert!(!remote.is_local_snapshot());
        assert_eq!(remote.parts().len(), 3);
        assert!(v("1.0-SNAPSHOT") < remote);
        assert!(remote < v("1.0-20130615.123456-13"));
        assert!(remote < v("1.0"));
    }

    #[test]
    fn trailing_zeros_equal_and_hash_alike() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.ga"));
        let mut set = HashSet::new();
        set.insert(v("1.0"));
        assert!(set.contains(&v("1.0.0")));
        assert!(set.contains(&v("1-final")));
    }

    #[test]
    fn digit_letter_transitions_split() {
        assert_eq!(v("1.0rc1").parts().len(), 4);
        assert!(v("1.0rc1") < v("1.0rc2"));
        assert!(v("1.0rc2") < v("1.0"));
    }

    #[test]
    fn guava_style_versions() {
        assert!(v("31.0-jre") < v("32.0-jre"));
        assert!(v("31.0-android") < v("31.0-jre"));
        assert!(v("1.0.0") > v("1.0.0-jre"));
    }

    #[test]
    fn is_release_and_snapshot() {
        assert!(v("1.0").is_release());
        assert!(v("1.0-SNAPSHOT").is_snapshot());
        assert!(v("1.0-snapshot").is_local_snapshot());
    }

    #[test]
    fn unparseable_literals_fail() {
        for bad in ["", "   ", "1..0", "1.0-", ".1", "1,0", "[1.0]", "1 0", "99999999999999999999999"] {
            let err = SingleVersion::parse(bad).unwrap_err();
            assert!(
                matches!(err, AtlasError::InvalidVersionSpecification { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn display_is_literal() {
        assert_eq!(v("1.8.0-RC1").to_string(), "1.8.0-RC1");
    }
}
