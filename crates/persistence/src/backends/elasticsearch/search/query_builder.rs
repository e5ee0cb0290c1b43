//! Elasticsearch Query DSL builder.
//!
//! Translates a [`QuerySpec`] (plus an optional id list) into either a
//! multi-get or a single `bool` search body.

use serde_json::{Map, Value, json};

use crate::types::{MatchValue, QuerySpec, RangeSpec, SortDirective, strip_negation};
use crate::types::Value as FieldValue;

use super::super::dialect::VersionShim;
use super::super::transport::EsRequest;

/// Page size applied when a query asks for `limit: 0`.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Engine-internal ordering appended to every sort as the final tie-break.
pub const TIE_BREAK_FIELD: &str = "_doc";

/// A compiled find, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    /// Point lookup by id.
    MultiGet {
        /// `{"_id", "_source"?}` entries, one per requested id.
        docs: Vec<Value>,
        /// Number of ids requested; reported as the result count.
        requested: usize,
    },
    /// Search request.
    Search {
        /// The complete search body.
        body: Value,
    },
}

impl CompiledQuery {
    /// Wraps the compiled query in a dialect-addressed request.
    pub fn into_request(self, shim: &VersionShim, record_type: &str) -> EsRequest {
        match self {
            CompiledQuery::MultiGet { docs, .. } => shim.mget_request(record_type, docs),
            CompiledQuery::Search { body } => shim.search_request(record_type, body),
        }
    }
}

/// Builds Elasticsearch queries for one record type.
pub struct EsQueryBuilder<'a> {
    shim: &'a VersionShim,
    record_type: &'a str,
    primary_key: &'a str,
}

/// Clause lists of the top-level `bool` query.
#[derive(Default)]
struct BoolClauses {
    filter: Vec<Value>,
    must: Vec<Value>,
    must_not: Vec<Value>,
}

impl BoolClauses {
    fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.must.is_empty() && self.must_not.is_empty()
    }

    fn into_query(self) -> Value {
        let mut bool_query = Map::new();
        for (key, clauses) in [
            ("filter", self.filter),
            ("must", self.must),
            ("must_not", self.must_not),
        ] {
            if !clauses.is_empty() {
                bool_query.insert(key.to_string(), Value::Array(clauses));
            }
        }
        json!({ "bool": bool_query })
    }
}

impl<'a> EsQueryBuilder<'a> {
    /// Creates a new query builder.
    pub fn new(shim: &'a VersionShim, record_type: &'a str, primary_key: &'a str) -> Self {
        Self {
            shim,
            record_type,
            primary_key,
        }
    }

    /// Compiles a find.
    ///
    /// A non-empty id list without negated ids and without exists, match,
    /// range or free-text constraints takes the multi-get fast path.
    pub fn build(&self, ids: Option<&[String]>, query: &QuerySpec) -> CompiledQuery {
        let ids = ids.unwrap_or_default();
        let any_negated = ids.iter().any(|id| strip_negation(id).0);

        if !ids.is_empty() && !any_negated && !query.has_constraints() {
            let source = self.build_source(&query.fields);
            let docs = ids
                .iter()
                .map(|id| {
                    let mut doc = json!({ "_id": id });
                    if let Some(ref source) = source {
                        doc["_source"] = source.clone();
                    }
                    doc
                })
                .collect();
            return CompiledQuery::MultiGet {
                docs,
                requested: ids.len(),
            };
        }

        CompiledQuery::Search {
            body: self.build_search(ids, query),
        }
    }

    /// Builds a search body.
    fn build_search(&self, ids: &[String], query: &QuerySpec) -> Value {
        let mut clauses = BoolClauses::default();

        for (field, present) in &query.exists {
            let clause = json!({ "exists": { "field": field } });
            if *present {
                clauses.must.push(clause);
            } else {
                clauses.must_not.push(clause);
            }
        }

        for (field, value) in &query.matches {
            self.add_match(&mut clauses, field, value);
        }

        for (field, range) in &query.range {
            if let Some(clause) = self.build_range_clause(field, range) {
                clauses.filter.push(clause);
            }
        }

        if let Some(ref text) = query.query {
            clauses
                .must
                .push(json!({ "query_string": { "query": text } }));
        }

        self.add_ids(&mut clauses, ids);

        if clauses.is_empty() {
            clauses.must.push(json!({ "match_all": {} }));
        }

        // Appended after the catch-all decision so it never counts as a constraint.
        if let Some(type_filter) = self.shim.type_filter(self.record_type) {
            clauses.filter.push(type_filter);
        }

        let mut body = json!({ "query": clauses.into_query() });

        match query.limit {
            Some(0) => body["size"] = json!(DEFAULT_PAGE_SIZE),
            Some(limit) => body["size"] = json!(limit),
            None => {}
        }
        if let Some(offset) = query.offset.filter(|&o| o > 0) {
            body["from"] = json!(offset);
        }

        if !query.sort.is_empty() {
            body["sort"] = self.build_sort(&query.sort);
        }
        if let Some(source) = self.build_source(&query.fields) {
            body["_source"] = source;
        }
        if self.shim.track_total_hits() {
            body["track_total_hits"] = json!(true);
        }

        body
    }

    /// Builds the sort array, always ending with the tie-break.
    fn build_sort(&self, sort: &[SortDirective]) -> Value {
        let mut sort_array: Vec<Value> = sort
            .iter()
            .map(|directive| {
                json!({ directive.field.as_str(): { "order": directive.direction.as_str() } })
            })
            .collect();
        sort_array.push(json!(TIE_BREAK_FIELD));
        Value::Array(sort_array)
    }

    /// Builds the `_source` projection, or `None` when no field is projected.
    ///
    /// The primary key is always part of a non-empty include list.
    fn build_source(&self, fields: &[(String, bool)]) -> Option<Value> {
        if fields.is_empty() {
            return None;
        }

        let mut includes: Vec<&str> = Vec::new();
        let mut excludes: Vec<&str> = Vec::new();
        for (field, include) in fields {
            if *include {
                includes.push(field);
            } else {
                excludes.push(field);
            }
        }

        let mut source = Map::new();
        if !includes.is_empty() {
            if !includes.contains(&self.primary_key) {
                includes.push(self.primary_key);
            }
            // Needed to verify multi-get hits belong to this record type.
            if let Some(discriminator) = self.shim.discriminator_field() {
                includes.push(discriminator);
            }
            source.insert("includes".to_string(), json!(includes));
        }
        source.insert("excludes".to_string(), json!(excludes));
        Some(Value::Object(source))
    }

    /// Adds phrase-equality clauses for one match constraint.
    ///
    /// Sentinel-prefixed strings become negative clauses. The positive
    /// alternatives of a list are ORed together.
    fn add_match(&self, clauses: &mut BoolClauses, field: &str, value: &MatchValue) {
        let values: &[FieldValue] = match value {
            MatchValue::One(v) => std::slice::from_ref(v),
            MatchValue::Any(vs) => vs,
        };

        let mut positives = Vec::new();
        for value in values {
            match value {
                // The engine cannot phrase-match null; it means "field absent".
                FieldValue::Null => clauses
                    .must_not
                    .push(json!({ "exists": { "field": field } })),
                FieldValue::String(s) => {
                    let (negated, stripped) = strip_negation(s);
                    let clause = json!({ "match_phrase": { field: stripped } });
                    if negated {
                        clauses.must_not.push(clause);
                    } else {
                        positives.push(clause);
                    }
                }
                other => positives.push(json!({ "match_phrase": { field: other.to_wire() } })),
            }
        }

        match value {
            MatchValue::Any(_) if positives.len() > 1 => clauses.must.push(json!({
                "bool": {
                    "should": positives,
                    "minimum_should_match": 1
                }
            })),
            _ => clauses.must.extend(positives),
        }
    }

    /// Builds a range clause; `None` when a bound is unusable or both are open.
    fn build_range_clause(&self, field: &str, range: &RangeSpec) -> Option<Value> {
        let mut bounds = Map::new();
        if let Some(low) = range_bound(&range.low)? {
            bounds.insert("gte".to_string(), low);
        }
        if let Some(high) = range_bound(&range.high)? {
            bounds.insert("lte".to_string(), high);
        }
        if bounds.is_empty() {
            return None;
        }
        Some(json!({ "range": { field: bounds } }))
    }

    /// Adds positive and negated id-set clauses.
    fn add_ids(&self, clauses: &mut BoolClauses, ids: &[String]) {
        let (negated, positive): (Vec<(bool, &str)>, Vec<(bool, &str)>) = ids
            .iter()
            .map(|id| strip_negation(id))
            .partition(|(negated, _)| *negated);

        if !positive.is_empty() {
            let values: Vec<&str> = positive.into_iter().map(|(_, id)| id).collect();
            clauses.must.push(json!({ "ids": { "values": values } }));
        }
        if !negated.is_empty() {
            let values: Vec<&str> = negated.into_iter().map(|(_, id)| id).collect();
            clauses.must_not.push(json!({ "ids": { "values": values } }));
        }
    }
}

/// Converts one range bound.
///
/// `Some(None)` is an open side, `Some(Some(v))` a usable bound and `None` a
/// value that voids the whole range.
fn range_bound(value: &FieldValue) -> Option<Option<Value>> {
    match value {
        FieldValue::Null => Some(None),
        FieldValue::Integer(_) | FieldValue::Timestamp(_) => Some(Some(value.to_wire())),
        FieldValue::Float(f) if f.is_finite() => Some(Some(value.to_wire())),
        FieldValue::String(s) if s.trim().parse::<f64>().is_ok_and(f64::is_finite) => {
            Some(Some(json!(s)))
        }
        _ => None,
    }
}
