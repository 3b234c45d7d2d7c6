//! Configuration types for the dnsctl planner and resolver
//!
//! This module defines the configuration structures consumed by the planner,
//! the watcher, and the resolver's query handler.

use crate::endpoint::RecordType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default set of record types the planner manages when none is configured.
///
/// TXT is deliberately excluded: it is the registry's own marker record and
/// an accidental delete of it would strand ownership metadata (§4.3).
pub fn default_managed_types() -> HashSet<RecordType> {
    [RecordType::A, RecordType::Aaaa, RecordType::Cname]
        .into_iter()
        .collect()
}

/// Planner configuration: who is writing, which domain they may touch, and
/// which record types they manage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Owner identifier for this plan invocation. Empty means "unowned".
    #[serde(default)]
    pub owner_id: String,

    /// Domain filter: endpoints outside this domain (and its subdomains) are
    /// excluded from the plan table. Empty means "no filter".
    #[serde(default)]
    pub root_host: String,

    /// Record types this plan may create, update, or delete.
    #[serde(default = "default_managed_types")]
    pub managed_types: HashSet<RecordType>,

    /// Record types excluded even if present in `managed_types`.
    #[serde(default)]
    pub excluded_types: HashSet<RecordType>,
}

impl PlannerConfig {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            root_host: String::new(),
            managed_types: default_managed_types(),
            excluded_types: HashSet::new(),
        }
    }

    pub fn with_root_host(mut self, root_host: impl Into<String>) -> Self {
        self.root_host = root_host.into();
        self
    }

    pub fn with_managed_types(mut self, types: impl IntoIterator<Item = RecordType>) -> Self {
        self.managed_types = types.into_iter().collect();
        self
    }

    pub fn with_excluded_types(mut self, types: impl IntoIterator<Item = RecordType>) -> Self {
        self.excluded_types = types.into_iter().collect();
        self
    }

    /// Effective set of managed types: `managed_types - excluded_types` (§4.3).
    pub fn effective_types(&self) -> HashSet<RecordType> {
        self.managed_types
            .difference(&self.excluded_types)
            .copied()
            .collect()
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.effective_types().is_empty() {
            return Err(crate::Error::config(
                "planner has no effective managed record types (managed_types minus excluded_types is empty)",
            ));
        }
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Resolver configuration: which zones this process is authoritative for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Zone names this process is authoritative for.
    pub origins: Vec<String>,

    /// Explicit access to the control plane (out of scope: interface only).
    /// Kept so the daemon can surface these as plain configuration.
    #[serde(default)]
    pub kubeconfig: Option<KubeconfigRef>,

    /// SOA responsible-person mailbox for every configured zone (§4.5).
    #[serde(default = "default_rname")]
    pub rname: String,

    /// Watcher behavior shared across all configured zones.
    #[serde(default)]
    pub watcher: WatcherConfig,
}

fn default_rname() -> String {
    String::new()
}

impl ResolverConfig {
    pub fn new(origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            origins: origins.into_iter().collect(),
            kubeconfig: None,
            rname: default_rname(),
            watcher: WatcherConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.origins.is_empty() {
            return Err(crate::Error::config("no zone origins configured"));
        }
        for origin in &self.origins {
            if origin.trim().is_empty() {
                return Err(crate::Error::config("zone origin cannot be empty"));
            }
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Explicit kubeconfig reference (`kubeconfig <path> [<context>]` in §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubeconfigRef {
    pub path: String,
    pub context: Option<String>,
}

/// Watcher configuration: namespace selection and rebuild debouncing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Namespaces to watch. Empty means all namespaces (§6).
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Debounce window for coalescing bursty notifications before a rebuild
    /// (§4.7, §9 Backpressure / batching).
    #[serde(default = "default_debounce_millis")]
    pub debounce_millis: u64,
}

fn default_debounce_millis() -> u64 {
    100
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            debounce_millis: default_debounce_millis(),
        }
    }
}

impl WatcherConfig {
    /// Parse the `WATCH_NAMESPACES` environment variable convention (§6):
    /// a comma-separated list, defaulting to all namespaces.
    pub fn namespaces_from_env_value(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_types_subtracts_excluded() {
        let cfg = PlannerConfig::new("o1").with_excluded_types([RecordType::Cname]);
        let effective = cfg.effective_types();
        assert!(effective.contains(&RecordType::A));
        assert!(effective.contains(&RecordType::Aaaa));
        assert!(!effective.contains(&RecordType::Cname));
    }

    #[test]
    fn default_managed_types_excludes_txt() {
        let types = default_managed_types();
        assert!(!types.contains(&RecordType::Txt));
        assert!(types.contains(&RecordType::A));
    }

    #[test]
    fn resolver_config_requires_origins() {
        let cfg = ResolverConfig::new(Vec::<String>::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn watch_namespaces_parses_csv() {
        let ns = WatcherConfig::namespaces_from_env_value("a, b ,,c");
        assert_eq!(ns, vec!["a", "b", "c"]);
    }
}
