//! Minimal embedding example for dnsctl-core
//!
//! Demonstrates driving the planner directly and serving the result from
//! an in-memory zone, without the daemon binary or a real control plane.

use dnsctl_core::config::PlannerConfig;
use dnsctl_core::endpoint::RecordType;
use dnsctl_core::query::{QType, Question, QueryHandler};
use dnsctl_core::selector::FixedDraw;
use dnsctl_core::zone::{Zone, ZoneHandle};
use dnsctl_core::{Endpoint, Planner};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    println!("=== Embedded dnsctl-core example ===\n");

    println!("1. Planning a first write for owner 'frontend'...");
    let desired = vec![Endpoint::new("app.example.com.", RecordType::A, vec!["198.51.100.10".to_string()])];
    let config = PlannerConfig::new("frontend").with_root_host("example.com.");
    let (changes, errors) = Planner::plan(&[], &[], &desired, &config);
    assert!(errors.is_empty());
    println!("   create: {} record(s)", changes.create.len());

    println!("\n2. A second owner joins the same name...");
    let current = changes.create.clone();
    let desired_b = vec![Endpoint::new("app.example.com.", RecordType::A, vec!["198.51.100.20".to_string()])];
    let config_b = PlannerConfig::new("backend").with_root_host("example.com.");
    let (changes_b, errors_b) = Planner::plan(&current, &[], &desired_b, &config_b);
    assert!(errors_b.is_empty());
    println!("   owner label after merge: {}", changes_b.update_new[0].owner_label());

    println!("\n3. Building a zone from the merged state...");
    let mut zone = Zone::new("example.com.", "hostmaster@example.com");
    for ep in &changes_b.update_new {
        zone.insert_endpoint(ep);
    }
    let zone_handle = Arc::new(ZoneHandle::new(zone));

    let mut zones = HashMap::new();
    zones.insert("example.com.".to_string(), zone_handle);
    let handler = QueryHandler::new(zones);

    println!("\n4. Serving a query against the merged zone...");
    let draw = FixedDraw(0);
    let question = Question {
        name: "app.example.com.".to_string(),
        qtype: QType::Record(RecordType::A),
        client_geo: None,
    };
    let result = handler.handle(&question, &draw).expect("zone is configured");
    println!(
        "   rcode={} authoritative={} answers={}",
        result.rcode,
        result.authoritative,
        result.answers.len()
    );
    for rr in &result.answers {
        println!("     {} A {}", rr.name, rr.target);
    }

    println!("\n=== Done ===");
}
