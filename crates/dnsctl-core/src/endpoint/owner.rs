//! Owner label parsing and serialization.
//!
//! The `owner` label's value is the canonical form of a set of owner IDs:
//! sorted, deduplicated, and joined with the literal delimiter `&&` (§3, §6).

/// Delimiter joining multiple owner IDs within a single label value.
pub const OWNER_DELIMITER: &str = "&&";

/// Parse an owner label value into its constituent owner IDs.
///
/// An empty string yields an empty set (unowned). Whitespace-only segments
/// are dropped; callers never see blank owner IDs.
pub fn parse(label: &str) -> Vec<String> {
    if label.trim().is_empty() {
        return Vec::new();
    }
    label
        .split(OWNER_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize a set of owner IDs into the canonical label form: sorted,
/// deduplicated, `&&`-joined. Returns an empty string for an empty set.
pub fn serialize<I, S>(owners: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ids: Vec<String> = owners.into_iter().map(Into::into).collect();
    ids.sort();
    ids.dedup();
    ids.join(OWNER_DELIMITER)
}

/// Parse, then immediately re-serialize: the canonicalization round-trip
/// used anywhere an owner label is read and must be normalized on write.
pub fn canonicalize(label: &str) -> String {
    serialize(parse(label))
}

/// Union two owner sets, returning the canonical label.
pub fn union(a: &str, b: &str) -> String {
    let mut ids = parse(a);
    ids.extend(parse(b));
    serialize(ids)
}

/// Remove an owner ID from a label, returning the canonical remainder.
pub fn remove(label: &str, owner_id: &str) -> String {
    let ids: Vec<String> = parse(label).into_iter().filter(|id| id != owner_id).collect();
    serialize(ids)
}

/// Whether the label's owner set contains `owner_id`.
pub fn contains(label: &str, owner_id: &str) -> bool {
    parse(label).iter().any(|id| id == owner_id)
}

/// Whether two owner sets share at least one member.
pub fn shares_owner(a: &str, b: &str) -> bool {
    let a_ids = parse(a);
    let b_ids = parse(b);
    a_ids.iter().any(|id| b_ids.contains(id))
}
