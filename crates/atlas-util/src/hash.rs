use sha1::{Digest, Sha1};

/// Compute the SHA-1 hash of a string, returning a lowercase hex string.
///
/// Used to derive stable external ids from a value's canonical rendering.
pub fn sha1_hex(data: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute a content id for a set of numeric ids, independent of their order.
pub fn id_set_hash<I>(ids: I) -> String
where
    I: IntoIterator<Item = u64>,
{
    let mut sorted: Vec<u64> = ids.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let joined = sorted
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    sha1_hex(&joined)
}
