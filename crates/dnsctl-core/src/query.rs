//! Query handler: matches an incoming question to a zone and formats a
//! response (§4.8).

use crate::endpoint::{normalize_dns_name, RecordType};
use crate::error::Error;
use crate::selector::{Draw, QueryContext, Selector};
use crate::zone::{LookupResult, RecordMeta, ResourceRecord, Zone, ZoneHandle};
use std::collections::HashMap;
use std::sync::Arc;

/// The qtype of an incoming question. AXFR/IXFR are modeled separately from
/// the shared `RecordType` set since the planner and zone never deal in
/// zone-transfer pseudo-types (§4.8, Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QType {
    Record(RecordType),
    Axfr,
    Ixfr,
}

/// A protocol-neutral question, decoupled from wire encoding (§4.9).
#[derive(Debug, Clone)]
pub struct Question {
    pub name: String,
    pub qtype: QType,
    pub client_geo: Option<String>,
}

/// A protocol-neutral response, decoupled from wire encoding (§4.9).
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rcode: u8,
    pub authoritative: bool,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl QueryResult {
    fn refused() -> Self {
        Self {
            rcode: 5,
            authoritative: false,
            ..Default::default()
        }
    }

    fn server_failure() -> Self {
        Self {
            rcode: 2,
            authoritative: true,
            ..Default::default()
        }
    }
}

/// Holds one `ZoneHandle` per configured origin and routes queries to it.
pub struct QueryHandler {
    zones: HashMap<String, Arc<ZoneHandle>>,
}

impl QueryHandler {
    pub fn new(zones: HashMap<String, Arc<ZoneHandle>>) -> Self {
        Self { zones }
    }

    /// Answers one question, or `Err(Error::ZoneNotConfigured)` if no
    /// configured origin matches (§4.8 step 2: "forward to next handler").
    pub fn handle(&self, question: &Question, draw: &dyn Draw) -> crate::Result<QueryResult> {
        if matches!(question.qtype, QType::Axfr | QType::Ixfr) {
            return Ok(QueryResult::refused());
        }
        let QType::Record(qtype) = question.qtype else {
            unreachable!("AXFR/IXFR handled above");
        };

        let origin = self
            .match_zone(&question.name)
            .ok_or_else(|| Error::ZoneNotConfigured(question.name.clone()))?;
        let zone = self.zones.get(&origin).expect("matched origin is registered").current();

        if zone.is_expired() {
            return Ok(QueryResult::server_failure());
        }

        let name = normalize_dns_name(&question.name);
        if name == zone.origin {
            return Ok(self.serve_apex(&zone, qtype));
        }

        Ok(self.serve_name(&zone, &name, qtype, question, draw))
    }

    fn match_zone(&self, name: &str) -> Option<String> {
        let name = normalize_dns_name(name);
        self.zones
            .keys()
            .filter(|origin| name == **origin || name.ends_with(&format!(".{origin}")))
            .max_by_key(|origin| origin.len())
            .cloned()
    }

    fn serve_apex(&self, zone: &Zone, qtype: RecordType) -> QueryResult {
        match qtype {
            RecordType::Ns => QueryResult {
                rcode: 0,
                authoritative: true,
                answers: vec![zone.apex_ns.clone()],
                ..Default::default()
            },
            _ => QueryResult {
                rcode: 0,
                authoritative: true,
                authority: vec![zone.apex_soa.clone()],
                ..Default::default()
            },
        }
    }

    fn serve_name(
        &self,
        zone: &Zone,
        name: &str,
        qtype: RecordType,
        question: &Question,
        draw: &dyn Draw,
    ) -> QueryResult {
        let outcome = zone.lookup(name, qtype);
        let mut answers = outcome.answers.clone();

        if answers.len() > 1 {
            let metadata: HashMap<String, RecordMeta> = answers
                .iter()
                .map(|r| (r.target.clone(), zone.metadata_for(name, qtype, &r.target)))
                .collect();
            let ctx = QueryContext {
                client_geo: question.client_geo.clone(),
            };
            answers = Selector::new(draw).select(&answers, &metadata, &ctx);
        }

        let (rcode, authoritative) = match outcome.result.unwrap_or(LookupResult::ServerFailure) {
            LookupResult::Success => (0, true),
            LookupResult::NoData => (0, true),
            LookupResult::NameError => (3, true),
            LookupResult::Delegation => (0, false),
            // Documented compatibility path (§9 open question): a partial
            // answer is preferred over an empty SERVFAIL when one exists.
            LookupResult::ServerFailure => (2, true),
        };

        QueryResult {
            rcode,
            authoritative,
            answers,
            authority: outcome.ns,
            additional: outcome.extra,
        }
    }
}
