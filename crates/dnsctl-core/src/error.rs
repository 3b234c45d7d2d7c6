//! Error types for the dnsctl planner and resolver
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnsctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsctl system
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An update would cross the owned/unowned boundary (§7).
    ///
    /// The offending endpoint is skipped; other operations in the same
    /// plan proceed. Collected into the plan's aggregate error.
    #[error("owner conflict for {dns_name}: {reason}")]
    OwnerConflict { dns_name: String, reason: String },

    /// Same `(dnsName, setIdentifier)` proposed to change record type.
    #[error("record type conflict for {dns_name}: {reason}")]
    RecordTypeConflict { dns_name: String, reason: String },

    /// A CNAME operation references a root-host target with no managed endpoint.
    #[error("invalid target for {dns_name}: target {target} is not backed by a managed endpoint")]
    InvalidTarget { dns_name: String, target: String },

    /// The watch backend denied access to an object kind; degraded mode continues.
    #[error("watch permission denied: {0}")]
    WatchPermissionDenied(String),

    /// The watch backend does not recognize the object kind; degraded mode continues.
    #[error("watch object kind not found: {0}")]
    WatchNotFound(String),

    /// An incoming query matched no configured zone origin.
    #[error("zone not configured for query name {0}")]
    ZoneNotConfigured(String),

    /// A zone was explicitly marked expired.
    #[error("zone {0} is expired")]
    ZoneExpired(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input that does not fit any more specific variant.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wire-format DNS message failed to parse (§4.9). Never a panic:
    /// attacker-controlled input is rejected, not trusted.
    #[error("malformed dns message: {0}")]
    FormatError(String),

    /// Catastrophic invariant violation. Treated as fatal by callers; never
    /// expected from valid inputs.
    #[error("unexpected backend error: {0}")]
    UnexpectedBackendError(String),
}

impl Error {
    pub fn owner_conflict(dns_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OwnerConflict {
            dns_name: dns_name.into(),
            reason: reason.into(),
        }
    }

    pub fn record_type_conflict(dns_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RecordTypeConflict {
            dns_name: dns_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_target(dns_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::InvalidTarget {
            dns_name: dns_name.into(),
            target: target.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn format_error(msg: impl Into<String>) -> Self {
        Self::FormatError(msg.into())
    }
}

/// An aggregate of planner errors collected across an entire plan invocation.
///
/// Conflicts are collected rather than short-circuiting: a partial change set
/// can still be applied even though some rows were rejected (§7).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlanErrors(pub Vec<Error>);

impl PlanErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: Error) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }
}

impl std::fmt::Display for PlanErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no errors");
        }
        let joined: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", joined.join("; "))
    }
}

impl std::error::Error for PlanErrors {}
