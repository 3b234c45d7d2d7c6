//! End-to-end planner scenarios.
//!
//! Each test below is one of the reconciliation scenarios a multi-owner
//! planner must get right: a second owner joining a record, an owner
//! leaving while others remain, the last owner leaving, and the root-host
//! CNAME safety check.

use dnsctl_core::config::PlannerConfig;
use dnsctl_core::endpoint::RecordType;
use dnsctl_core::{Endpoint, Planner};

fn ep(name: &str, rt: RecordType, targets: &[&str], owner_id: &str) -> Endpoint {
    let mut e = Endpoint::new(name, rt, targets.iter().map(|s| s.to_string()).collect());
    if !owner_id.is_empty() {
        e = e.with_owner(owner_id);
    }
    e
}

#[test]
fn s2_second_owner_joins_existing_record() {
    let current = vec![ep("foo", RecordType::A, &["1.1.1.1"], "o1")];
    let desired = vec![ep("foo", RecordType::A, &["2.2.2.2"], "")];
    let cfg = PlannerConfig::new("o2");

    let (changes, errors) = Planner::plan(&current, &[], &desired, &cfg);
    assert!(errors.is_empty());
    assert_eq!(changes.update_old.len(), 1);
    assert_eq!(changes.update_new.len(), 1);

    let new = &changes.update_new[0];
    assert!(new.targets.contains(&"1.1.1.1".to_string()));
    assert!(new.targets.contains(&"2.2.2.2".to_string()));
    assert_eq!(new.owner_label(), "o1&&o2");
}

#[test]
fn s3_owner_leaves_record_survives() {
    let current = vec![ep("foo", RecordType::A, &["1.1.1.1", "2.2.2.2"], "o1&&o2")];
    let previous = vec![ep("foo", RecordType::A, &["2.2.2.2"], "")];
    let cfg = PlannerConfig::new("o2");

    let (changes, errors) = Planner::plan(&current, &previous, &[], &cfg);
    assert!(errors.is_empty());
    assert_eq!(changes.update_new.len(), 1);

    let new = &changes.update_new[0];
    assert_eq!(new.targets, vec!["1.1.1.1".to_string()]);
    assert_eq!(new.owner_label(), "o1");
    assert!(changes.delete.is_empty());
}

#[test]
fn s8_cname_to_unmanaged_root_host_target_is_rejected() {
    let desired = vec![ep(
        "foo.example.com.",
        RecordType::Cname,
        &["bar.example.com."],
        "",
    )];
    let cfg = PlannerConfig::new("o1").with_root_host("example.com.");

    let (changes, errors) = Planner::plan(&[], &[], &desired, &cfg);
    assert!(changes.create.is_empty());
    assert!(!errors.is_empty());
}

#[test]
fn cname_update_to_unmanaged_root_host_target_is_rejected() {
    let current = vec![ep(
        "foo.example.com.",
        RecordType::Cname,
        &["old.example.com."],
        "o1",
    )];
    let previous = vec![ep(
        "foo.example.com.",
        RecordType::Cname,
        &["old.example.com."],
        "",
    )];
    let desired = vec![ep(
        "foo.example.com.",
        RecordType::Cname,
        &["bad.example.com."],
        "",
    )];
    let cfg = PlannerConfig::new("o1").with_root_host("example.com.");

    let (changes, errors) = Planner::plan(&current, &previous, &desired, &cfg);
    assert!(changes.update_old.is_empty());
    assert!(changes.update_new.is_empty());
    assert!(!errors.is_empty());
}

#[test]
fn determinism_same_inputs_produce_identical_plans() {
    let current = vec![ep("foo", RecordType::A, &["1.1.1.1"], "o1")];
    let desired = vec![ep("foo", RecordType::A, &["2.2.2.2"], "")];
    let cfg = PlannerConfig::new("o2");

    let (first, first_errors) = Planner::plan(&current, &[], &desired, &cfg);
    let (second, second_errors) = Planner::plan(&current, &[], &desired, &cfg);

    assert_eq!(first.create, second.create);
    assert_eq!(first.update_old, second.update_old);
    assert_eq!(first.update_new, second.update_new);
    assert_eq!(first.delete, second.delete);
    assert_eq!(first_errors.is_empty(), second_errors.is_empty());
}
