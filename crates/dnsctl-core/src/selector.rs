//! Traffic-steering selection among equivalent answer records (§4.6).

use crate::zone::{RecordMeta, ResourceRecord};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;

/// Query-time context influencing geo selection.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub client_geo: Option<String>,
}

/// A source of random draws for weighted selection, injectable so tests can
/// force a specific draw (§9 Design notes: "Tests must be deterministic").
pub trait Draw: Send + Sync {
    /// Returns a uniform integer in `[0, bound)`. `bound` is always > 0.
    fn draw(&self, bound: i64) -> i64;
}

/// The production draw source: a mutex-guarded RNG (§2.1), shared across
/// the parallel query-handling tasks that need it (§5).
pub struct RandomDraw(Mutex<rand::rngs::StdRng>);

impl Default for RandomDraw {
    fn default() -> Self {
        use rand::SeedableRng;
        Self(Mutex::new(rand::rngs::StdRng::from_entropy()))
    }
}

impl Draw for RandomDraw {
    fn draw(&self, bound: i64) -> i64 {
        self.0.lock().gen_range(0..bound)
    }
}

/// A fixed draw source for deterministic tests.
pub struct FixedDraw(pub i64);

impl Draw for FixedDraw {
    fn draw(&self, _bound: i64) -> i64 {
        self.0
    }
}

/// Reduces an rrset's metadata-tagged candidates to one answer per owner
/// group, applying weighted or geo selection (§4.6).
pub struct Selector<'a> {
    draw: &'a dyn Draw,
}

impl<'a> Selector<'a> {
    pub fn new(draw: &'a dyn Draw) -> Self {
        Self { draw }
    }

    /// Groups `records` by name (an rrset's members share one name already;
    /// grouping is a no-op here but mirrors the reference algorithm's shape
    /// for future multi-owner-group rrsets) and selects one record per group.
    pub fn select(
        &self,
        records: &[ResourceRecord],
        metadata: &HashMap<String, RecordMeta>,
        ctx: &QueryContext,
    ) -> Vec<ResourceRecord> {
        if records.len() <= 1 {
            return records.to_vec();
        }

        let metas: Vec<RecordMeta> = records
            .iter()
            .map(|r| metadata.get(&r.target).cloned().unwrap_or(RecordMeta::None))
            .collect();

        let all_weighted = metas.iter().all(|m| matches!(m, RecordMeta::Weight(_)));
        let all_geo = metas.iter().all(|m| matches!(m, RecordMeta::Geo(_)));

        if all_weighted {
            return vec![self.select_weighted(records, &metas)];
        }
        if all_geo {
            return vec![self.select_geo(records, &metas, ctx)];
        }
        vec![records[0].clone()]
    }

    fn select_weighted(&self, records: &[ResourceRecord], metas: &[RecordMeta]) -> ResourceRecord {
        let mut weighted: Vec<(i64, &ResourceRecord)> = records
            .iter()
            .zip(metas)
            .map(|(r, m)| {
                let w = match m {
                    RecordMeta::Weight(w) => (*w).max(0),
                    _ => 0,
                };
                (w, r)
            })
            .collect();
        weighted.sort_by(|a, b| b.0.cmp(&a.0));

        let total: i64 = weighted.iter().map(|(w, _)| w).sum();
        if total <= 0 {
            return weighted[0].1.clone();
        }

        let draw = self.draw.draw(total);
        let mut running = 0i64;
        for (weight, record) in &weighted {
            running += weight;
            if draw < running {
                return (*record).clone();
            }
        }
        weighted[0].1.clone()
    }

    fn select_geo(&self, records: &[ResourceRecord], metas: &[RecordMeta], ctx: &QueryContext) -> ResourceRecord {
        let client_geo = ctx.client_geo.as_deref();

        if let Some(geo) = client_geo {
            for (record, meta) in records.iter().zip(metas) {
                if let RecordMeta::Geo(code) = meta {
                    if code == geo {
                        return record.clone();
                    }
                }
            }
        }
        for (record, meta) in records.iter().zip(metas) {
            if let RecordMeta::Geo(code) = meta {
                if code == "*" {
                    return record.clone();
                }
            }
        }
        records[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::RecordType;

    fn rr(target: &str) -> ResourceRecord {
        ResourceRecord {
            name: "foo.example.com.".into(),
            record_type: RecordType::A,
            target: target.into(),
            ttl: 300,
            set_identifier: String::new(),
        }
    }

    #[test]
    fn s6_weighted_selection_picks_by_draw() {
        let records = vec![rr("1.1.1.1"), rr("2.2.2.2")];
        let mut metadata = HashMap::new();
        metadata.insert("1.1.1.1".to_string(), RecordMeta::Weight(100));
        metadata.insert("2.2.2.2".to_string(), RecordMeta::Weight(0));

        let draw = FixedDraw(50);
        let selector = Selector::new(&draw);
        let result = selector.select(&records, &metadata, &QueryContext::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, "1.1.1.1");
    }

    #[test]
    fn s6_weighted_selection_with_zero_draw_picks_highest_weight() {
        let records = vec![rr("1.1.1.1"), rr("2.2.2.2")];
        let mut metadata = HashMap::new();
        metadata.insert("1.1.1.1".to_string(), RecordMeta::Weight(100));
        metadata.insert("2.2.2.2".to_string(), RecordMeta::Weight(200));

        let draw = FixedDraw(0);
        let selector = Selector::new(&draw);
        let result = selector.select(&records, &metadata, &QueryContext::default());
        assert_eq!(result[0].target, "2.2.2.2");
    }

    #[test]
    fn all_zero_weights_falls_back_to_first() {
        let records = vec![rr("1.1.1.1"), rr("2.2.2.2")];
        let mut metadata = HashMap::new();
        metadata.insert("1.1.1.1".to_string(), RecordMeta::Weight(0));
        metadata.insert("2.2.2.2".to_string(), RecordMeta::Weight(0));

        let draw = FixedDraw(0);
        let selector = Selector::new(&draw);
        let result = selector.select(&records, &metadata, &QueryContext::default());
        assert_eq!(result[0].target, "1.1.1.1");
    }

    #[test]
    fn s7_geo_selection_matches_exact_code() {
        let records = vec![rr("eu.example.com."), rr("default.example.com.")];
        let mut metadata = HashMap::new();
        metadata.insert("eu.example.com.".to_string(), RecordMeta::Geo("EU".to_string()));
        metadata.insert("default.example.com.".to_string(), RecordMeta::Geo("*".to_string()));

        let draw = FixedDraw(0);
        let selector = Selector::new(&draw);

        let eu_ctx = QueryContext { client_geo: Some("EU".to_string()) };
        let eu_result = selector.select(&records, &metadata, &eu_ctx);
        assert_eq!(eu_result[0].target, "eu.example.com.");

        let jp_ctx = QueryContext { client_geo: Some("JP".to_string()) };
        let jp_result = selector.select(&records, &metadata, &jp_ctx);
        assert_eq!(jp_result[0].target, "default.example.com.");
    }
}
