//! Conflict resolution among candidate endpoints for a single plan row (§4.2).

use crate::endpoint::{Endpoint, RecordType};

/// Record-type precedence used when a row proposes more than one type.
/// Higher-precedence types win; ties within a precedence class are
/// resolved by the tie-break rules below, not by this ranking.
fn precedence(rt: RecordType) -> u8 {
    match rt {
        RecordType::A | RecordType::Aaaa => 2,
        RecordType::Cname => 1,
        RecordType::Txt | RecordType::Ns => 0,
    }
}

/// Chooses exactly one record type and representative endpoint among
/// conflicting candidates for a plan row.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Picks the winning record type among the distinct types present in
    /// `candidates`. Returns `None` for an empty candidate list.
    pub fn resolve_record_type(candidates: &[Endpoint]) -> Option<RecordType> {
        candidates
            .iter()
            .map(|e| e.record_type)
            .max_by_key(|rt| precedence(*rt))
    }

    /// Picks the creation representative: the candidate whose first target
    /// is lexicographically smallest. Candidates with no targets sort last.
    pub fn resolve_create<'a>(candidates: &'a [Endpoint]) -> Option<&'a Endpoint> {
        candidates.iter().min_by(|a, b| {
            match (a.targets.first(), b.targets.first()) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        })
    }

    /// Picks the update representative: the candidate whose targets are
    /// closest to `current` by symmetric difference, ties broken
    /// lexicographically by first target.
    pub fn resolve_update<'a>(current: &Endpoint, candidates: &'a [Endpoint]) -> Option<&'a Endpoint> {
        let current_set: std::collections::BTreeSet<&String> = current.targets.iter().collect();
        candidates.iter().min_by(|a, b| {
            let dist_a = symmetric_difference_count(&current_set, &a.targets);
            let dist_b = symmetric_difference_count(&current_set, &b.targets);
            dist_a.cmp(&dist_b).then_with(|| {
                match (a.targets.first(), b.targets.first()) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
        })
    }
}

fn symmetric_difference_count(current: &std::collections::BTreeSet<&String>, other: &[String]) -> usize {
    let other_set: std::collections::BTreeSet<&String> = other.iter().collect();
    current.symmetric_difference(&other_set).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;

    fn ep(rt: RecordType, targets: &[&str]) -> Endpoint {
        Endpoint::new("foo.example.com.", rt, targets.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn record_type_precedence_prefers_a_over_cname() {
        let candidates = vec![ep(RecordType::Cname, &["x"]), ep(RecordType::A, &["1.1.1.1"])];
        assert_eq!(ConflictResolver::resolve_record_type(&candidates), Some(RecordType::A));
    }

    #[test]
    fn resolve_create_picks_lexicographically_smallest_first_target() {
        let candidates = vec![ep(RecordType::A, &["2.2.2.2"]), ep(RecordType::A, &["1.1.1.1"])];
        let winner = ConflictResolver::resolve_create(&candidates).unwrap();
        assert_eq!(winner.targets, vec!["1.1.1.1".to_string()]);
    }

    #[test]
    fn resolve_update_picks_closest_to_current() {
        let current = ep(RecordType::A, &["1.1.1.1", "2.2.2.2"]);
        let candidates = vec![
            ep(RecordType::A, &["1.1.1.1", "3.3.3.3"]),
            ep(RecordType::A, &["1.1.1.1", "2.2.2.2", "3.3.3.3"]),
        ];
        let winner = ConflictResolver::resolve_update(&current, &candidates).unwrap();
        assert_eq!(winner.targets, vec!["1.1.1.1".to_string(), "2.2.2.2".to_string(), "3.3.3.3".to_string()]);
    }
}
