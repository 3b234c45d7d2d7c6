//! Row-oriented index of current/previous/desired endpoints keyed by
//! `(dnsName, setIdentifier)`, the planner's primary working structure (§4.3).

use crate::config::PlannerConfig;
use crate::endpoint::{normalize_dns_name, Endpoint, RecordType};
use std::collections::BTreeMap;

/// Key identifying a plan row: a DNS name plus its (possibly empty) set
/// identifier, which disambiguates sibling weighted/geo records (§3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlanKey {
    pub dns_name: String,
    pub set_identifier: String,
}

/// Per-record-type view within a row: at most one current and one previous
/// endpoint (current state is unique per `(dnsName, setIdentifier, type)`,
/// §3 invariant), plus any number of desired candidates.
#[derive(Debug, Clone, Default)]
pub struct TypeView {
    pub current: Option<Endpoint>,
    pub previous: Option<Endpoint>,
    pub candidates: Vec<Endpoint>,
}

/// One row of the plan table: everything known about a single
/// `(dnsName, setIdentifier)` pair across all three input streams.
#[derive(Debug, Clone, Default)]
pub struct PlanRow {
    pub current: Vec<Endpoint>,
    pub previous: Vec<Endpoint>,
    pub candidates: Vec<Endpoint>,
    pub by_type: BTreeMap<RecordType, TypeView>,
}

impl PlanRow {
    fn push_current(&mut self, ep: Endpoint) {
        self.by_type.entry(ep.record_type).or_default().current = Some(ep.clone());
        self.current.push(ep);
    }

    fn push_previous(&mut self, ep: Endpoint) {
        self.by_type.entry(ep.record_type).or_default().previous = Some(ep.clone());
        self.previous.push(ep);
    }

    fn push_candidate(&mut self, ep: Endpoint) {
        self.by_type.entry(ep.record_type).or_default().candidates.push(ep.clone());
        self.candidates.push(ep);
    }
}

/// The plan table: the planner's input, built fresh on every invocation.
#[derive(Debug, Clone, Default)]
pub struct PlanTable {
    pub rows: BTreeMap<PlanKey, PlanRow>,
}

impl PlanTable {
    /// Builds a table from the three input streams, applying the root-host
    /// domain filter and the managed/excluded type filter (§4.3).
    pub fn build(
        current: &[Endpoint],
        previous: &[Endpoint],
        desired: &[Endpoint],
        config: &PlannerConfig,
    ) -> Self {
        let effective_types = config.effective_types();
        let mut table = PlanTable::default();

        for ep in current {
            if Self::accepts(ep, &config.root_host, &effective_types) {
                table.row_mut(ep).push_current(ep.clone());
            }
        }
        for ep in previous {
            if Self::accepts(ep, &config.root_host, &effective_types) {
                table.row_mut(ep).push_previous(ep.clone());
            }
        }
        for ep in desired {
            if Self::accepts(ep, &config.root_host, &effective_types) {
                table.row_mut(ep).push_candidate(ep.clone());
            }
        }
        table
    }

    fn row_mut(&mut self, ep: &Endpoint) -> &mut PlanRow {
        let key = PlanKey {
            dns_name: normalize_dns_name(&ep.dns_name),
            set_identifier: ep.set_identifier.clone(),
        };
        self.rows.entry(key).or_default()
    }

    fn accepts(ep: &Endpoint, root_host: &str, effective_types: &std::collections::HashSet<RecordType>) -> bool {
        if !effective_types.contains(&ep.record_type) {
            return false;
        }
        if root_host.trim().is_empty() {
            return true;
        }
        let root = normalize_dns_name(root_host);
        let name = normalize_dns_name(&ep.dns_name);
        name == root || name.ends_with(&format!(".{root}")) || name == root.trim_end_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::RecordType;

    fn ep(name: &str, rt: RecordType, targets: &[&str]) -> Endpoint {
        Endpoint::new(name, rt, targets.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn build_groups_by_dns_name_and_set_identifier() {
        let current = vec![ep("foo.example.com.", RecordType::A, &["1.1.1.1"])];
        let desired = vec![ep("foo.example.com.", RecordType::A, &["2.2.2.2"])];
        let table = PlanTable::build(&current, &[], &desired, &PlannerConfig::default());
        assert_eq!(table.rows.len(), 1);
        let row = table.rows.values().next().unwrap();
        assert_eq!(row.current.len(), 1);
        assert_eq!(row.candidates.len(), 1);
    }

    #[test]
    fn build_excludes_txt_by_default() {
        let desired = vec![ep("foo.example.com.", RecordType::Txt, &["hello"])];
        let table = PlanTable::build(&[], &[], &desired, &PlannerConfig::default());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn build_respects_root_host_filter() {
        let cfg = PlannerConfig::new("o1").with_root_host("example.com");
        let desired = vec![
            ep("foo.example.com.", RecordType::A, &["1.1.1.1"]),
            ep("foo.other.com.", RecordType::A, &["2.2.2.2"]),
        ];
        let table = PlanTable::build(&[], &[], &desired, &cfg);
        assert_eq!(table.rows.len(), 1);
    }
}
