//! In-memory authoritative zone index (§4.5).
//!
//! A `Zone` is an immutable value built once per refresh; a `ZoneHandle`
//! holds the single swappable pointer readers dereference.

use crate::endpoint::{normalize_dns_name, Endpoint, RecordType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One protocol-level resource record: a single target value plus the TTL
/// and owning endpoint's set identifier, used to group equivalent records
/// for selection (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: String,
    pub record_type: RecordType,
    pub target: String,
    pub ttl: u32,
    pub set_identifier: String,
}

/// Selection metadata recorded per record/target pair (§4.5). Weight takes
/// precedence over geo when an endpoint carries both.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordMeta {
    Weight(i64),
    Geo(String),
    None,
}

/// Outcome of a name lookup against the zone index (§4.5, §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Success,
    NoData,
    NameError,
    Delegation,
    ServerFailure,
}

/// The records and metadata returned by a lookup.
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    pub answers: Vec<ResourceRecord>,
    pub ns: Vec<ResourceRecord>,
    pub extra: Vec<ResourceRecord>,
    pub result: Option<LookupResult>,
}

type Rrset = HashMap<RecordType, Vec<ResourceRecord>>;

/// An authoritative zone: apex records, the name tree, and per-record
/// selection metadata. Built fresh on every refresh (§3 Lifecycles).
#[derive(Debug, Clone)]
pub struct Zone {
    pub origin: String,
    pub apex_soa: ResourceRecord,
    pub apex_ns: ResourceRecord,
    tree: HashMap<String, Rrset>,
    metadata: HashMap<(String, RecordType, String), RecordMeta>,
    expired: bool,
}

impl Zone {
    /// Constructs an empty zone with apex SOA/NS already populated (§4.5).
    pub fn new(origin: &str, rname: &str) -> Self {
        let origin = normalize_dns_name(origin);
        let mbox = to_mailbox(rname, &origin);
        let apex_soa = ResourceRecord {
            name: origin.clone(),
            record_type: RecordType::Ns, // placeholder overwritten below; kept for struct shape
            target: mbox,
            ttl: 3600,
            set_identifier: String::new(),
        };
        let apex_soa = ResourceRecord {
            record_type: RecordType::Ns,
            ..apex_soa
        };
        // SOA has no dedicated RecordType in the shared enum; represented via
        // the apex_soa field directly rather than a tree entry of type SOA.
        let apex_ns = ResourceRecord {
            name: origin.clone(),
            record_type: RecordType::Ns,
            target: format!("ns1.{origin}"),
            ttl: 3600,
            set_identifier: String::new(),
        };

        Self {
            origin,
            apex_soa,
            apex_ns,
            tree: HashMap::new(),
            metadata: HashMap::new(),
            expired: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn mark_expired(mut self) -> Self {
        self.expired = true;
        self
    }

    pub fn is_authoritative_for(&self, name: &str) -> bool {
        let name = normalize_dns_name(name);
        name == self.origin || name.ends_with(&format!(".{}", self.origin))
    }

    /// Translates an endpoint into resource records and stores them (§4.5).
    /// A/AAAA endpoints expand to one record per target; CNAME/TXT/NS use
    /// only the first target, since a single endpoint value represents a
    /// single distinct record (multiple equivalent records, as in weighted
    /// or geo rrsets, arrive as separate endpoints sharing a name).
    pub fn insert_endpoint(&mut self, ep: &Endpoint) {
        let name = normalize_dns_name(&ep.dns_name);
        let targets: Vec<&String> = match ep.record_type {
            RecordType::A | RecordType::Aaaa => ep.targets.iter().collect(),
            _ => ep.targets.first().into_iter().collect(),
        };

        for target in targets {
            let rr = ResourceRecord {
                name: name.clone(),
                record_type: ep.record_type,
                target: target.clone(),
                ttl: ep.ttl,
                set_identifier: ep.set_identifier.clone(),
            };
            let meta = if let Some(w) = ep.weight() {
                RecordMeta::Weight(w)
            } else if let Some(g) = ep.geo_code() {
                RecordMeta::Geo(g.to_string())
            } else {
                RecordMeta::None
            };
            self.metadata
                .insert((name.clone(), ep.record_type, target.clone()), meta);
            self.tree
                .entry(name.clone())
                .or_default()
                .entry(ep.record_type)
                .or_default()
                .push(rr);
        }
    }

    pub fn metadata_for(&self, name: &str, record_type: RecordType, target: &str) -> RecordMeta {
        self.metadata
            .get(&(normalize_dns_name(name), record_type, target.to_string()))
            .cloned()
            .unwrap_or(RecordMeta::None)
    }

    /// Name-indexed, case-insensitive lookup (§4.5).
    pub fn lookup(&self, qname: &str, qtype: RecordType) -> LookupOutcome {
        let name = normalize_dns_name(qname);

        if let Some(ns_records) = self.find_delegation(&name) {
            return LookupOutcome {
                ns: ns_records,
                result: Some(LookupResult::Delegation),
                ..Default::default()
            };
        }

        match self.tree.get(&name) {
            None => LookupOutcome {
                ns: vec![self.apex_ns.clone()],
                result: Some(LookupResult::NameError),
                ..Default::default()
            },
            Some(rrsets) => match rrsets.get(&qtype) {
                Some(records) if !records.is_empty() => LookupOutcome {
                    answers: records.clone(),
                    result: Some(LookupResult::Success),
                    ..Default::default()
                },
                _ => LookupOutcome {
                    ns: vec![self.apex_soa.clone()],
                    result: Some(LookupResult::NoData),
                    ..Default::default()
                },
            },
        }
    }

    /// Walks ancestor labels (excluding the origin and the queried name
    /// itself) looking for an NS rrset marking a zone cut (§4.8).
    fn find_delegation(&self, name: &str) -> Option<Vec<ResourceRecord>> {
        if name == self.origin {
            return None;
        }
        let trimmed = name.trim_end_matches('.');
        let labels: Vec<&str> = trimmed.split('.').collect();
        for i in 1..labels.len() {
            let candidate = format!("{}.", labels[i..].join("."));
            if candidate == self.origin || candidate == name {
                continue;
            }
            if let Some(rrsets) = self.tree.get(&candidate) {
                if let Some(ns) = rrsets.get(&RecordType::Ns) {
                    if !ns.is_empty() {
                        return Some(ns.clone());
                    }
                }
            }
        }
        None
    }
}

/// The single swappable pointer readers dereference (§5: readers-writer
/// discipline, atomic pointer swap under a brief write lock).
#[derive(Debug)]
pub struct ZoneHandle(RwLock<Arc<Zone>>);

impl ZoneHandle {
    pub fn new(zone: Zone) -> Self {
        Self(RwLock::new(Arc::new(zone)))
    }

    /// Replaces the zone wholesale. Readers holding a prior `Arc<Zone>` keep
    /// observing the old zone in full; new readers see the new zone in
    /// full. Never a mix (§8 invariant 3).
    pub fn refresh_from(&self, zone: Zone) {
        *self.0.write() = Arc::new(zone);
    }

    pub fn current(&self) -> Arc<Zone> {
        self.0.read().clone()
    }
}

/// RFC 1035/2142 mailbox transform: `local@domain` becomes a dotted name
/// with every literal `.` in the local part escaped (§4.5).
pub fn to_mailbox(rname: &str, origin: &str) -> String {
    let default = format!("hostmaster.{origin}");
    let rname = rname.trim();
    if rname.is_empty() {
        return default;
    }
    let mut split = rname.splitn(2, '@');
    let local = split.next().unwrap_or("");
    let domain = split.next();
    match domain {
        Some(domain) if !local.is_empty() && !domain.is_empty() => {
            let escaped_local = local.replace('.', "\\.");
            let joined = format!("{escaped_local}.{domain}");
            normalize_dns_name(&joined)
        }
        _ => default,
    }
}

/// Inverse of [`to_mailbox`] for the round-trip invariant (§8 invariant 6):
/// reconstructs the `local@domain` form from a mailbox name.
pub fn from_mailbox(mailbox: &str) -> Option<String> {
    let trimmed = mailbox.trim_end_matches('.');
    let chars: Vec<char> = trimmed.chars().collect();
    let mut local = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == '.' {
            local.push('.');
            i += 2;
        } else if chars[i] == '.' {
            break;
        } else {
            local.push(chars[i]);
            i += 1;
        }
    }
    if i >= chars.len() {
        return None;
    }
    let domain: String = chars[i + 1..].iter().collect();
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(format!("{local}@{domain}"))
}
