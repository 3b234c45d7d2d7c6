// # dnsctl-core
//
// Core library for declarative DNS record reconciliation and authoritative
// zone serving.
//
// ## Architecture overview
//
// This crate provides two cooperating cores:
// - **Planner**: turns a desired-state endpoint list and the zone's current
//   records into a minimal set of create/update/delete operations, enforcing
//   multi-owner merge semantics via TXT registry records.
// - **Resolver**: holds an in-memory authoritative zone index built from a
//   watched endpoint source, and answers DNS queries against it with
//   weighted/geo traffic-steering selection.
//
// ## Design principles
//
// 1. Planning is pure and deterministic: same inputs, same plan, every time.
// 2. Zone state is swapped atomically; readers never see a half-built zone.
// 3. Conflicts are collected, not fatal: one bad row never blocks the rest
//    of a plan.

pub mod config;
pub mod conflict;
pub mod endpoint;
pub mod error;
pub mod plantable;
pub mod planner;
pub mod query;
pub mod selector;
pub mod wire;
pub mod zone;

// watcher depends on a pluggable external source trait; kept separate so
// the daemon binary and the in-memory demo crate can both depend on it.
pub mod watcher;

pub use config::{KubeconfigRef, PlannerConfig, ResolverConfig, WatcherConfig};
pub use endpoint::{Endpoint, OwnerInfo, RecordType};
pub use error::{Error, PlanErrors, Result};
pub use planner::{Changes, Planner};
pub use plantable::{PlanKey, PlanRow, PlanTable};
pub use query::{QueryHandler, QueryResult};
pub use selector::Selector;
pub use watcher::{WatchEvent, WatchSource, Watcher};
pub use zone::{LookupResult, Zone};
