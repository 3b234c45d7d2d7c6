//! The reconciliation planner: turns a plan table into a minimal,
//! multi-owner-aware set of create/update/delete operations (§4.4).

use crate::conflict::ConflictResolver;
use crate::config::PlannerConfig;
use crate::endpoint::{owner, Endpoint, OwnerInfo, RecordType};
use crate::error::{Error, PlanErrors};
use crate::plantable::{PlanRow, PlanTable};
use std::collections::HashMap;

/// The planner's output: four disjoint operation sequences (§4.4).
#[derive(Debug, Clone, Default)]
pub struct Changes {
    pub create: Vec<Endpoint>,
    pub update_old: Vec<Endpoint>,
    pub update_new: Vec<Endpoint>,
    pub delete: Vec<Endpoint>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }
}

/// An update awaiting the `calculateDesired` mutation pass before it is
/// final enough to emit (§4.4).
struct PendingUpdate {
    dns_name: String,
    record_type: RecordType,
    set_identifier: String,
    current: Endpoint,
    previous: Option<Endpoint>,
    desired: Endpoint,
}

/// Stateless entry point for the planner (§5: pure, single-threaded per call).
pub struct Planner;

impl Planner {
    /// Computes the change set for one owner's invocation. Returns the
    /// operations to apply plus any collected conflicts (§7: conflicts are
    /// collected, not fatal).
    pub fn plan(
        current: &[Endpoint],
        previous: &[Endpoint],
        desired: &[Endpoint],
        config: &PlannerConfig,
    ) -> (Changes, PlanErrors) {
        let table = PlanTable::build(current, previous, desired, config);
        let mut changes = Changes::default();
        let mut errors = PlanErrors::new();
        let mut dns_name_owners: HashMap<String, OwnerInfo> = HashMap::new();
        let mut pending: Vec<PendingUpdate> = Vec::new();

        for (key, row) in &table.rows {
            Self::classify_row(
                &key.dns_name,
                &key.set_identifier,
                row,
                config,
                &mut changes,
                &mut errors,
                &mut dns_name_owners,
                &mut pending,
            );
        }

        Self::calculate_desired(&mut pending, &dns_name_owners, config);
        Self::validate_cname_targets(&mut pending, &dns_name_owners, config, &mut errors, &mut changes);
        Self::finalize_updates(pending, &mut changes);
        Self::filter_deletes_by_ownership(&mut changes, config);

        (changes, errors)
    }

    fn classify_row(
        dns_name: &str,
        set_identifier: &str,
        row: &PlanRow,
        config: &PlannerConfig,
        changes: &mut Changes,
        errors: &mut PlanErrors,
        dns_name_owners: &mut HashMap<String, OwnerInfo>,
        pending: &mut Vec<PendingUpdate>,
    ) {
        let owner_id = config.owner_id.as_str();

        if row.current.is_empty() && !row.candidates.is_empty() {
            Self::classify_create(dns_name, row, owner_id, changes, dns_name_owners);
            return;
        }

        if !row.current.is_empty() && row.candidates.is_empty() {
            Self::classify_delete_or_shrink(dns_name, row, owner_id, changes, dns_name_owners, pending, set_identifier);
            return;
        }

        if !row.current.is_empty() && !row.candidates.is_empty() {
            Self::classify_update(dns_name, set_identifier, row, owner_id, errors, dns_name_owners, pending);
        }
    }

    /// Case (A): no current, some candidates.
    fn classify_create(
        dns_name: &str,
        row: &PlanRow,
        owner_id: &str,
        changes: &mut Changes,
        dns_name_owners: &mut HashMap<String, OwnerInfo>,
    ) {
        let Some(winning_type) = ConflictResolver::resolve_record_type(&row.candidates) else {
            return;
        };
        let type_candidates: Vec<Endpoint> = row
            .candidates
            .iter()
            .filter(|e| e.record_type == winning_type)
            .cloned()
            .collect();
        let Some(winner) = ConflictResolver::resolve_create(&type_candidates) else {
            return;
        };

        let mut created = winner.clone();
        if !owner_id.is_empty() {
            created.set_owner_label(owner::serialize([owner_id.to_string()]));
        }
        dns_name_owners
            .entry(dns_name.to_string())
            .or_insert_with(|| OwnerInfo::from_label(created.owner_label()));
        changes.create.push(created);
    }

    /// Case (B): some current, no candidates.
    fn classify_delete_or_shrink(
        dns_name: &str,
        row: &PlanRow,
        owner_id: &str,
        changes: &mut Changes,
        dns_name_owners: &mut HashMap<String, OwnerInfo>,
        pending: &mut Vec<PendingUpdate>,
        _set_identifier: &str,
    ) {
        for (record_type, view) in &row.by_type {
            let Some(current) = &view.current else { continue };

            if owner_id.is_empty() {
                // An unowned plan may not delete owned records.
                continue;
            }

            let owners = owner::parse(current.owner_label());
            if !owners.iter().any(|id| id == owner_id) {
                continue;
            }

            let remaining = owner::remove(current.owner_label(), owner_id);
            if remaining.is_empty() {
                changes.delete.push(current.clone());
                continue;
            }

            let mut candidate = current.clone();
            candidate.set_owner_label(remaining.clone());

            if let Some(previous) = &view.previous {
                if candidate.targets.len() > 1 {
                    let (remaining_targets, remaining_props) = crate::endpoint::remove_targets(
                        &candidate.targets,
                        &candidate.provider_specific,
                        &previous.targets,
                    );
                    candidate.targets = remaining_targets;
                    candidate.provider_specific = remaining_props;
                }
            }

            dns_name_owners
                .entry(dns_name.to_string())
                .and_modify(|o| *o = OwnerInfo::from_label(&owner::union(&o.to_label(), &remaining)))
                .or_insert_with(|| OwnerInfo::from_label(&remaining));

            pending.push(PendingUpdate {
                dns_name: dns_name.to_string(),
                record_type: *record_type,
                set_identifier: current.set_identifier.clone(),
                previous: view.previous.clone(),
                current: current.clone(),
                desired: candidate,
            });
        }
    }

    /// Case (C): some current, some candidates.
    fn classify_update(
        dns_name: &str,
        set_identifier: &str,
        row: &PlanRow,
        owner_id: &str,
        errors: &mut PlanErrors,
        dns_name_owners: &mut HashMap<String, OwnerInfo>,
        pending: &mut Vec<PendingUpdate>,
    ) {
        let mut current_only_types: Vec<RecordType> = Vec::new();
        let mut candidates_only_types: Vec<RecordType> = Vec::new();

        for (record_type, view) in &row.by_type {
            match (&view.current, view.candidates.is_empty()) {
                (Some(_), true) => current_only_types.push(*record_type),
                (None, false) => candidates_only_types.push(*record_type),
                (Some(current), false) => {
                    Self::resolve_both_present(
                        dns_name,
                        set_identifier,
                        *record_type,
                        current,
                        view,
                        owner_id,
                        errors,
                        dns_name_owners,
                        pending,
                    );
                }
                (None, true) => {}
            }
        }

        if current_only_types.len() == 1 && candidates_only_types.len() == 1 {
            errors.push(Error::record_type_conflict(
                dns_name,
                format!(
                    "row proposes changing record type from {} to {}",
                    current_only_types[0], candidates_only_types[0]
                ),
            ));
        }
    }

    fn resolve_both_present(
        dns_name: &str,
        set_identifier: &str,
        record_type: RecordType,
        current: &Endpoint,
        view: &crate::plantable::TypeView,
        owner_id: &str,
        errors: &mut PlanErrors,
        dns_name_owners: &mut HashMap<String, OwnerInfo>,
        pending: &mut Vec<PendingUpdate>,
    ) {
        let current_has_owner = !current.owner_label().is_empty();
        let owner_id_present = !owner_id.is_empty();

        if current_has_owner && !owner_id_present {
            errors.push(Error::owner_conflict(
                dns_name,
                "record is owned but plan has no owner id",
            ));
            return;
        }
        if !current_has_owner && owner_id_present {
            errors.push(Error::owner_conflict(
                dns_name,
                "record is unowned but plan specifies an owner id",
            ));
            return;
        }

        let new_owner_label = if owner_id_present {
            owner::union(current.owner_label(), owner_id)
        } else {
            current.owner_label().to_string()
        };

        let Some(resolved) = ConflictResolver::resolve_update(current, &view.candidates) else {
            return;
        };

        let mut desired = resolved.clone();
        desired.set_owner_label(new_owner_label.clone());

        dns_name_owners
            .entry(dns_name.to_string())
            .and_modify(|o| *o = OwnerInfo::from_label(&owner::union(&o.to_label(), &new_owner_label)))
            .or_insert_with(|| OwnerInfo::from_label(&new_owner_label));

        pending.push(PendingUpdate {
            dns_name: dns_name.to_string(),
            record_type,
            set_identifier: set_identifier.to_string(),
            previous: view.previous.clone(),
            current: current.clone(),
            desired,
        });
    }

    /// The `calculateDesired` mutation pass (§4.4): merges and prunes
    /// targets for A and CNAME records before updates are finalized.
    fn calculate_desired(
        pending: &mut [PendingUpdate],
        dns_name_owners: &HashMap<String, OwnerInfo>,
        config: &PlannerConfig,
    ) {
        if config.owner_id.is_empty() {
            return;
        }

        for update in pending.iter_mut() {
            if !update.current.set_identifier.is_empty() {
                continue;
            }

            match update.record_type {
                RecordType::A => {
                    let (merged, props) = if let Some(previous) = &update.previous {
                        let (stripped, stripped_props) = crate::endpoint::remove_targets(
                            &update.current.targets,
                            &update.current.provider_specific,
                            &previous.targets,
                        );
                        crate::endpoint::merge_targets(
                            &stripped,
                            &stripped_props,
                            &update.desired.targets,
                            &update.desired.provider_specific,
                        )
                    } else {
                        crate::endpoint::merge_targets(
                            &update.current.targets,
                            &update.current.provider_specific,
                            &update.desired.targets,
                            &update.desired.provider_specific,
                        )
                    };
                    update.desired.targets = merged;
                    update.desired.provider_specific = props;
                }
                RecordType::Cname => {
                    let (merged, props) = if let Some(previous) = &update.previous {
                        let (stripped, stripped_props) = crate::endpoint::remove_targets(
                            &update.current.targets,
                            &update.current.provider_specific,
                            &previous.targets,
                        );
                        crate::endpoint::merge_targets(
                            &stripped,
                            &stripped_props,
                            &update.desired.targets,
                            &update.desired.provider_specific,
                        )
                    } else {
                        crate::endpoint::merge_targets(
                            &update.current.targets,
                            &update.current.provider_specific,
                            &update.desired.targets,
                            &update.desired.provider_specific,
                        )
                    };
                    let mut merged = merged;

                    if merged.len() > 1 {
                        let row_owner = OwnerInfo::from_label(&update.desired.owner_label());
                        merged.retain(|target| {
                            let target_name = crate::endpoint::normalize_dns_name(target);
                            match dns_name_owners.get(&target_name) {
                                Some(target_owner) if target_owner.is_empty() => false,
                                Some(target_owner) => target_owner.shares_any(&row_owner),
                                None => true,
                            }
                        });
                    }

                    update.desired.targets = merged;
                    update.desired.provider_specific = props;
                }
                _ => {}
            }
        }
    }

    /// Root-host CNAME validation (§4.4): every CNAME create or update whose
    /// target falls within the root host must be backed by a managed name.
    fn validate_cname_targets(
        pending: &mut Vec<PendingUpdate>,
        dns_name_owners: &HashMap<String, OwnerInfo>,
        config: &PlannerConfig,
        errors: &mut PlanErrors,
        changes: &mut Changes,
    ) {
        if config.root_host.trim().is_empty() {
            return;
        }
        let root = crate::endpoint::normalize_dns_name(&config.root_host);

        let mut check = |dns_name: &str, record_type: RecordType, targets: &[String]| -> bool {
            if record_type != RecordType::Cname {
                return true;
            }
            for target in targets {
                let target_name = crate::endpoint::normalize_dns_name(target);
                let within_root = target_name == root || target_name.ends_with(&format!(".{root}"));
                if within_root && !dns_name_owners.contains_key(&target_name) {
                    errors.push(Error::invalid_target(dns_name, target.clone()));
                    return false;
                }
            }
            true
        };

        changes.create.retain(|ep| check(&ep.dns_name, ep.record_type, &ep.targets));
        pending.retain(|update| check(&update.dns_name, update.record_type, &update.desired.targets));
    }

    /// Emits a pending update only if it is substantive (§4.4). CNAME target
    /// validation already ran over `pending` in `validate_cname_targets`.
    fn finalize_updates(pending: Vec<PendingUpdate>, changes: &mut Changes) {
        for update in pending {
            if Self::is_substantive(&update.current, &update.desired) {
                changes.update_old.push(update.current);
                changes.update_new.push(update.desired);
            }
        }
    }

    fn is_substantive(current: &Endpoint, desired: &Endpoint) -> bool {
        !current.targets_equal(desired)
            || current.owner_label() != desired.owner_label()
            || current.ttl != desired.ttl
            || current.provider_specific != desired.provider_specific
    }

    /// Final safety pass (§4.4): an owned plan never deletes a record it
    /// does not itself own.
    fn filter_deletes_by_ownership(changes: &mut Changes, config: &PlannerConfig) {
        if config.owner_id.is_empty() {
            return;
        }
        let owner_id = config.owner_id.as_str();
        changes
            .delete
            .retain(|ep| owner::contains(ep.owner_label(), owner_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::RecordType;

    fn ep(name: &str, rt: RecordType, targets: &[&str], owner_id: &str) -> Endpoint {
        let mut e = Endpoint::new(name, rt, targets.iter().map(|s| s.to_string()).collect());
        if !owner_id.is_empty() {
            e = e.with_owner(owner_id);
        }
        e
    }

    #[test]
    fn s1_first_write_creates_with_owner_label() {
        let desired = vec![ep("foo", RecordType::A, &["1.1.1.1"], "")];
        let cfg = PlannerConfig::new("o1");
        let (changes, errors) = Planner::plan(&[], &[], &desired, &cfg);
        assert!(errors.is_empty());
        assert_eq!(changes.create.len(), 1);
        assert_eq!(changes.create[0].owner_label(), "o1");
    }

    #[test]
    fn s4_last_owner_leaves_record_deleted() {
        let current = vec![ep("bar", RecordType::A, &["3.3.3.3"], "o1")];
        let previous = vec![ep("bar", RecordType::A, &["3.3.3.3"], "")];
        let cfg = PlannerConfig::new("o1");
        let (changes, errors) = Planner::plan(&current, &previous, &[], &cfg);
        assert!(errors.is_empty());
        assert_eq!(changes.delete.len(), 1);
        assert!(changes.update_old.is_empty());
    }

    #[test]
    fn s5_record_type_conflict_is_detected() {
        let current = vec![ep("foo", RecordType::A, &["1.1.1.1"], "o1")];
        let desired = vec![ep("foo", RecordType::Cname, &["other.example.com."], "")];
        let cfg = PlannerConfig::new("o2");
        let (changes, errors) = Planner::plan(&current, &[], &desired, &cfg);
        assert!(changes.is_empty());
        assert!(!errors.is_empty());
    }

    #[test]
    fn idempotence_same_state_produces_no_changes() {
        let current = vec![ep("foo", RecordType::A, &["1.1.1.1"], "o1")];
        let cfg = PlannerConfig::new("o1");
        let (changes, errors) = Planner::plan(&current, &current, &current, &cfg);
        assert!(errors.is_empty());
        assert!(changes.is_empty());
    }
}
