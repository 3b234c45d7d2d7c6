//! The endpoint value type shared by the planner and the resolver (§3, §4.1).

pub mod owner;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label key recognized for ownership tracking.
pub const OWNER_LABEL_KEY: &str = "owner";

/// Provider-specific property key for weighted selection.
pub const WEIGHT_KEY: &str = "weight";

/// Provider-specific property key for geo-aware selection.
pub const GEO_CODE_KEY: &str = "geo-code";

/// One of the record types the system understands (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Ns,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            "NS" => Ok(RecordType::Ns),
            other => Err(crate::Error::invalid_input(format!(
                "unrecognized record type: {other}"
            ))),
        }
    }
}

/// A logical DNS record definition published by some owner (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub dns_name: String,
    pub record_type: RecordType,
    pub targets: Vec<String>,
    pub ttl: u32,
    #[serde(default)]
    pub set_identifier: String,
    #[serde(default)]
    pub provider_specific: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Endpoint {
    pub fn new(dns_name: impl Into<String>, record_type: RecordType, targets: Vec<String>) -> Self {
        Self {
            dns_name: normalize_dns_name(&dns_name.into()),
            record_type,
            targets,
            ttl: 0,
            set_identifier: String::new(),
            provider_specific: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, owner_id: impl AsRef<str>) -> Self {
        let label = owner::serialize([owner_id.as_ref().to_string()]);
        self.labels.insert(OWNER_LABEL_KEY.to_string(), label);
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_set_identifier(mut self, set_identifier: impl Into<String>) -> Self {
        self.set_identifier = set_identifier.into();
        self
    }

    /// The raw `owner` label value, or empty string if absent (unowned).
    pub fn owner_label(&self) -> &str {
        self.labels
            .get(OWNER_LABEL_KEY)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn owners(&self) -> Vec<String> {
        owner::parse(self.owner_label())
    }

    pub fn set_owner_label(&mut self, label: String) {
        if label.is_empty() {
            self.labels.remove(OWNER_LABEL_KEY);
        } else {
            self.labels.insert(OWNER_LABEL_KEY.to_string(), label);
        }
    }

    pub fn weight(&self) -> Option<i64> {
        self.provider_specific.get(WEIGHT_KEY)?.parse().ok()
    }

    pub fn geo_code(&self) -> Option<&str> {
        self.provider_specific.get(GEO_CODE_KEY).map(String::as_str)
    }

    /// Targets as an order-independent set comparison (§4.1).
    pub fn targets_equal(&self, other: &Endpoint) -> bool {
        targets_set_equal(&self.targets, &other.targets)
    }
}

/// A resolved owner set with convenience accessors, used where callers need
/// more than the raw label string (e.g. mutual-ownership checks in §4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerInfo(Vec<String>);

impl OwnerInfo {
    pub fn from_label(label: &str) -> Self {
        Self(owner::parse(label))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, owner_id: &str) -> bool {
        self.0.iter().any(|id| id == owner_id)
    }

    pub fn shares_any(&self, other: &OwnerInfo) -> bool {
        self.0.iter().any(|id| other.contains(id))
    }

    pub fn to_label(&self) -> String {
        owner::serialize(self.0.clone())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }
}

/// Trim, lowercase, and ensure a trailing dot (§4.1). Idempotent: applying
/// this twice yields the same result as applying it once (§8 invariant 4).
pub fn normalize_dns_name(name: &str) -> String {
    let trimmed = name.trim().to_ascii_lowercase();
    if trimmed.ends_with('.') {
        trimmed
    } else {
        format!("{trimmed}.")
    }
}

/// Two target sequences are equal iff they hold the same elements,
/// regardless of order (§4.1).
pub fn targets_set_equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort();
    b_sorted.sort();
    a_sorted == b_sorted
}

/// Union of two target sets with deduplication, sorted ascending. Per-target
/// provider-specific properties merge with the newer set's value winning on
/// collision (§4.1).
pub fn merge_targets(
    older: &[String],
    older_props: &BTreeMap<String, String>,
    newer: &[String],
    newer_props: &BTreeMap<String, String>,
) -> (Vec<String>, BTreeMap<String, String>) {
    let mut set: std::collections::BTreeSet<String> = older.iter().cloned().collect();
    set.extend(newer.iter().cloned());
    let merged_targets: Vec<String> = set.into_iter().collect();

    let mut merged_props = older_props.clone();
    for (k, v) in newer_props {
        merged_props.insert(k.clone(), v.clone());
    }
    (merged_targets, merged_props)
}

/// Set-difference of targets; also drops any provider-specific property
/// keyed by a removed target value (§4.1).
pub fn remove_targets(
    base: &[String],
    base_props: &BTreeMap<String, String>,
    to_remove: &[String],
) -> (Vec<String>, BTreeMap<String, String>) {
    let remove_set: std::collections::HashSet<&String> = to_remove.iter().collect();
    let remaining: Vec<String> = base
        .iter()
        .filter(|t| !remove_set.contains(t))
        .cloned()
        .collect();
    let mut remaining_props = base_props.clone();
    for removed in to_remove {
        remaining_props.remove(removed);
    }
    (remaining, remaining_props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_dns_name(" Foo.Example.com");
        let twice = normalize_dns_name(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "foo.example.com.");
    }

    #[test]
    fn normalize_keeps_existing_trailing_dot() {
        assert_eq!(normalize_dns_name("foo.example.com."), "foo.example.com.");
    }

    #[test]
    fn targets_equal_ignores_order() {
        let a = vec!["2.2.2.2".to_string(), "1.1.1.1".to_string()];
        let b = vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()];
        assert!(targets_set_equal(&a, &b));
    }

    #[test]
    fn merge_targets_dedupes_and_sorts() {
        let (merged, _) = merge_targets(
            &["2.2.2.2".to_string()],
            &BTreeMap::new(),
            &["1.1.1.1".to_string(), "2.2.2.2".to_string()],
            &BTreeMap::new(),
        );
        assert_eq!(merged, vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()]);
    }

    #[test]
    fn remove_targets_drops_matching_property() {
        let mut props = BTreeMap::new();
        props.insert("1.1.1.1".to_string(), "weight=10".to_string());
        let (remaining, remaining_props) = remove_targets(
            &["1.1.1.1".to_string(), "2.2.2.2".to_string()],
            &props,
            &["1.1.1.1".to_string()],
        );
        assert_eq!(remaining, vec!["2.2.2.2".to_string()]);
        assert!(!remaining_props.contains_key("1.1.1.1"));
    }

    #[test]
    fn owner_info_shares_any_detects_overlap() {
        let a = OwnerInfo::from_label("o1&&o2");
        let b = OwnerInfo::from_label("o2&&o3");
        assert!(a.shares_any(&b));
        let c = OwnerInfo::from_label("o4");
        assert!(!a.shares_any(&c));
    }
}
