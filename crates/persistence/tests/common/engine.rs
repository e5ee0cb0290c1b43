//! In-process Elasticsearch double.
//!
//! Implements [`EsTransport`] over an in-memory document list and records
//! every request it receives. It understands exactly the endpoints and query
//! clauses the adapter emits, in both dialects, and panics on anything else
//! so an unexpected request shape fails the test loudly.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use docbridge_persistence::backends::elasticsearch::{
    EsRequest, EsResponse, EsTransport, HttpMethod, RequestBody,
};
use docbridge_persistence::error::BackendError;

/// Default page size of the engine when a search has no `size`.
const ENGINE_DEFAULT_SIZE: usize = 10;

/// Type key under which typeless documents are stored.
const TYPELESS_DOC: &str = "_doc";

#[derive(Debug, Clone)]
struct StoredDoc {
    index: String,
    doc_type: String,
    id: String,
    source: Map<String, Value>,
}

#[derive(Debug, Default)]
struct State {
    indices: Vec<String>,
    templates: BTreeMap<String, Value>,
    docs: Vec<StoredDoc>,
    requests: Vec<EsRequest>,
    failures: BTreeMap<String, u16>,
    offline: bool,
    next_id: u64,
}

/// A fake engine speaking either the typed or the typeless dialect.
#[derive(Debug)]
pub struct FakeEs {
    typeless: bool,
    state: Mutex<State>,
}

impl FakeEs {
    /// Creates an engine answering like the given API version.
    pub fn new(api_version: &str) -> Self {
        let major: u32 = api_version
            .split('.')
            .next()
            .and_then(|m| m.parse().ok())
            .unwrap_or(0);
        Self {
            typeless: major >= 7,
            state: Mutex::new(State::default()),
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<EsRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests of one operation kind.
    pub fn requests_for(&self, operation: &str) -> Vec<EsRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.operation == operation)
            .collect()
    }

    /// Operation names of every request so far.
    pub fn operations(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|r| r.operation)
            .collect()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Answers every request of `operation` with `status` from now on.
    pub fn fail(&self, operation: &str, status: u16) {
        self.state
            .lock()
            .failures
            .insert(operation.to_string(), status);
    }

    /// Makes every request fail before reaching the engine.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Creates an index up front.
    pub fn create_index(&self, index: &str) {
        self.state.lock().indices.push(index.to_string());
    }

    /// Returns true if the index exists.
    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().indices.iter().any(|i| i == index)
    }

    /// Returns an installed template body.
    pub fn template(&self, name: &str) -> Option<Value> {
        self.state.lock().templates.get(name).cloned()
    }

    /// Stored source of the document with this id, whatever its type.
    pub fn stored_source(&self, id: &str) -> Option<Map<String, Value>> {
        self.state
            .lock()
            .docs
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.source.clone())
    }

    /// Number of stored documents.
    pub fn doc_count(&self) -> usize {
        self.state.lock().docs.len()
    }

    fn doc_type<'a>(&self, explicit: Option<&'a str>) -> &'a str {
        if self.typeless {
            TYPELESS_DOC
        } else {
            explicit.expect("typed requests carry a type")
        }
    }

    fn handle(&self, state: &mut State, request: &EsRequest) -> EsResponse {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (HttpMethod::Post, ["_bulk"]) => self.bulk(state, request),
            (HttpMethod::Delete, ["_template", name]) => match state.templates.remove(*name) {
                Some(_) => ok(json!({"acknowledged": true})),
                None => error(404, "resource_not_found_exception"),
            },
            (HttpMethod::Put, ["_template", name]) => {
                let body = request.json_body().cloned().unwrap_or_default();
                state.templates.insert(name.to_string(), body);
                ok(json!({"acknowledged": true}))
            }
            (HttpMethod::Put, [index]) => {
                if state.indices.iter().any(|i| i == index) {
                    let kind = if self.typeless {
                        "resource_already_exists_exception"
                    } else {
                        "index_already_exists_exception"
                    };
                    return error(400, kind);
                }
                state.indices.push(index.to_string());
                ok(json!({"acknowledged": true}))
            }
            (HttpMethod::Put, [index, "_mapping", ..]) => {
                if !state.indices.iter().any(|i| i == index) {
                    return error(404, "index_not_found_exception");
                }
                ok(json!({"acknowledged": true}))
            }
            (HttpMethod::Post, [_, "_refresh"]) => ok(json!({"_shards": {"failed": 0}})),
            (HttpMethod::Post, [index, "_search"]) => self.search(state, request, index, None),
            (HttpMethod::Post, [index, doc_type, "_search"]) => {
                self.search(state, request, index, Some(*doc_type))
            }
            (HttpMethod::Post, [index, "_mget"]) => self.mget(state, request, index, None),
            (HttpMethod::Post, [index, doc_type, "_mget"]) => {
                self.mget(state, request, index, Some(*doc_type))
            }
            (HttpMethod::Post, [index, "_delete_by_query"]) => {
                self.delete_by_query(state, request, index, None)
            }
            (HttpMethod::Post, [index, doc_type, "_delete_by_query"]) => {
                self.delete_by_query(state, request, index, Some(*doc_type))
            }
            other => panic!("fake engine has no route for {:?}", other),
        }
    }

    fn scoped<'s>(
        &self,
        state: &'s State,
        index: &str,
        doc_type: Option<&str>,
    ) -> impl Iterator<Item = &'s StoredDoc> {
        let index = index.to_string();
        let doc_type = self.doc_type(doc_type).to_string();
        state
            .docs
            .iter()
            .filter(move |d| d.index == index && d.doc_type == doc_type)
    }

    fn bulk(&self, state: &mut State, request: &EsRequest) -> EsResponse {
        let RequestBody::NdJson(lines) = &request.body else {
            panic!("bulk body must be ndjson");
        };

        let mut lines = lines.iter();
        let mut items = Vec::new();
        let mut errors = false;

        while let Some(header) = lines.next() {
            let (action, target) = header
                .as_object()
                .and_then(|o| o.iter().next())
                .expect("bulk header is a single-key object");
            let index = target["_index"].as_str().expect("_index").to_string();
            let doc_type = self
                .doc_type(target.get("_type").and_then(Value::as_str))
                .to_string();
            let id = target.get("_id").and_then(Value::as_str).map(str::to_string);

            let position = |state: &State, id: &str| {
                state
                    .docs
                    .iter()
                    .position(|d| d.index == index && d.doc_type == doc_type && d.id == id)
            };

            let (status, id, failure) = match action.as_str() {
                "create" => {
                    let source = lines
                        .next()
                        .and_then(Value::as_object)
                        .cloned()
                        .expect("create payload");
                    let id = id.unwrap_or_else(|| {
                        state.next_id += 1;
                        format!("gen-{}", state.next_id)
                    });
                    if position(state, &id).is_some() {
                        (409, id, Some("version_conflict_engine_exception"))
                    } else {
                        if !state.indices.contains(&index) {
                            state.indices.push(index.clone());
                        }
                        state.docs.push(StoredDoc {
                            index: index.clone(),
                            doc_type: doc_type.clone(),
                            id: id.clone(),
                            source,
                        });
                        (201, id, None)
                    }
                }
                "update" => {
                    let patch = lines
                        .next()
                        .and_then(|l| l.get("doc"))
                        .and_then(Value::as_object)
                        .cloned()
                        .expect("update payload");
                    let id = id.expect("update carries _id");
                    match position(state, &id) {
                        Some(pos) => {
                            state.docs[pos].source.extend(patch);
                            (200, id, None)
                        }
                        None => (404, id, Some("document_missing_exception")),
                    }
                }
                "delete" => {
                    let id = id.expect("delete carries _id");
                    match position(state, &id) {
                        Some(pos) => {
                            state.docs.remove(pos);
                            (200, id, None)
                        }
                        None => (404, id, None),
                    }
                }
                other => panic!("unsupported bulk action {other}"),
            };

            errors |= !(200..300).contains(&status);
            let mut result = json!({"_index": index, "_id": id, "status": status});
            if !self.typeless {
                result["_type"] = json!(doc_type);
            }
            if let Some(kind) = failure {
                result["error"] = json!({"type": kind});
            }
            if action == "delete" {
                result["result"] = json!(if status == 200 { "deleted" } else { "not_found" });
            }
            items.push(json!({ action.as_str(): result }));
        }

        ok(json!({"took": 1, "errors": errors, "items": items}))
    }

    fn search(
        &self,
        state: &State,
        request: &EsRequest,
        index: &str,
        doc_type: Option<&str>,
    ) -> EsResponse {
        if !state.indices.iter().any(|i| i == index) {
            return error(404, "index_not_found_exception");
        }

        let body = request.json_body().cloned().unwrap_or_else(|| json!({}));
        let query = body
            .get("query")
            .cloned()
            .unwrap_or_else(|| json!({"match_all": {}}));

        let mut hits: Vec<&StoredDoc> = self
            .scoped(state, index, doc_type)
            .filter(|d| matches(&query, d))
            .collect();

        if let Some(Value::Array(sort)) = body.get("sort") {
            hits.sort_by(|a, b| compare_by_sort(sort, a, b));
        }

        let total = hits.len();
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or(ENGINE_DEFAULT_SIZE);

        let page: Vec<Value> = hits
            .into_iter()
            .skip(from)
            .take(size)
            .map(|d| {
                json!({
                    "_index": d.index,
                    "_id": d.id,
                    "_source": project(&d.source, body.get("_source")),
                })
            })
            .collect();

        let total = if self.typeless {
            json!({"value": total, "relation": "eq"})
        } else {
            json!(total)
        };
        ok(json!({"took": 1, "hits": {"total": total, "hits": page}}))
    }

    fn mget(
        &self,
        state: &State,
        request: &EsRequest,
        index: &str,
        doc_type: Option<&str>,
    ) -> EsResponse {
        let body = request.json_body().cloned().unwrap_or_default();
        let wanted = body["docs"].as_array().cloned().unwrap_or_default();

        let docs: Vec<Value> = wanted
            .iter()
            .map(|entry| {
                let id = entry["_id"].as_str().expect("mget entry carries _id");
                match self.scoped(state, index, doc_type).find(|d| d.id == id) {
                    Some(doc) => json!({
                        "_index": index,
                        "_id": id,
                        "found": true,
                        "_source": project(&doc.source, entry.get("_source")),
                    }),
                    None => json!({"_index": index, "_id": id, "found": false}),
                }
            })
            .collect();

        ok(json!({"docs": docs}))
    }

    fn delete_by_query(
        &self,
        state: &mut State,
        request: &EsRequest,
        index: &str,
        doc_type: Option<&str>,
    ) -> EsResponse {
        let query = request
            .json_body()
            .and_then(|b| b.get("query"))
            .cloned()
            .expect("delete_by_query carries a query");
        let doc_type = self.doc_type(doc_type).to_string();

        let before = state.docs.len();
        state
            .docs
            .retain(|d| !(d.index == index && d.doc_type == doc_type && matches(&query, d)));
        let deleted = before - state.docs.len();

        ok(json!({"took": 1, "deleted": deleted}))
    }
}

#[async_trait]
impl EsTransport for FakeEs {
    async fn send(&self, request: EsRequest) -> Result<EsResponse, BackendError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if state.offline {
            return Err(BackendError::TransportFailure {
                operation: request.operation.to_string(),
                status: None,
                message: "connection refused".to_string(),
                source: None,
            });
        }
        if let Some(&status) = state.failures.get(request.operation) {
            return Ok(EsResponse::new(
                status,
                json!({"error": {"type": "injected_failure", "reason": request.operation}}),
            ));
        }

        Ok(self.handle(&mut state, &request))
    }
}

fn ok(body: Value) -> EsResponse {
    EsResponse::new(200, body)
}

fn error(status: u16, kind: &str) -> EsResponse {
    EsResponse::new(status, json!({"error": {"type": kind}, "status": status}))
}

/// Evaluates the query clauses the adapter emits.
fn matches(query: &Value, doc: &StoredDoc) -> bool {
    let (kind, body) = single_entry(query);
    match kind {
        "match_all" => true,
        "bool" => bool_matches(body, doc),
        "term" | "match_phrase" => {
            let (field, expected) = single_entry(body);
            field_values(&doc.source, field).any(|v| v == expected)
        }
        "ids" => body["values"]
            .as_array()
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(doc.id.as_str()))),
        "exists" => {
            let field = body["field"].as_str().expect("exists.field");
            field_values(&doc.source, field).next().is_some()
        }
        "range" => {
            let (field, bounds) = single_entry(body);
            field_values(&doc.source, field).any(|v| {
                let above = bounds
                    .get("gte")
                    .is_none_or(|low| compare(v, low).is_some_and(|o| o != Ordering::Less));
                let below = bounds
                    .get("lte")
                    .is_none_or(|high| compare(v, high).is_some_and(|o| o != Ordering::Greater));
                above && below
            })
        }
        "query_string" => {
            let needle = body["query"].as_str().expect("query_string.query").to_lowercase();
            doc.source.values().any(|v| contains_text(v, &needle))
        }
        other => panic!("fake engine does not support {other} queries"),
    }
}

fn bool_matches(body: &Value, doc: &StoredDoc) -> bool {
    let clauses = |key: &str| body.get(key).and_then(Value::as_array).cloned().unwrap_or_default();

    let must = clauses("must");
    let filter = clauses("filter");
    let must_not = clauses("must_not");
    let should = clauses("should");

    if !must.iter().chain(&filter).all(|c| matches(c, doc)) {
        return false;
    }
    if must_not.iter().any(|c| matches(c, doc)) {
        return false;
    }
    if should.is_empty() {
        return true;
    }
    let minimum = body
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .unwrap_or(1) as usize;
    should.iter().filter(|c| matches(c, doc)).count() >= minimum
}

fn single_entry(value: &Value) -> (&str, &Value) {
    value
        .as_object()
        .and_then(|o| o.iter().next())
        .map(|(k, v)| (k.as_str(), v))
        .unwrap_or_else(|| panic!("expected a single-key object, got {value}"))
}

/// Non-null values of a field; arrays yield their elements.
fn field_values<'a>(source: &'a Map<String, Value>, field: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
    match source.get(field) {
        Some(Value::Array(items)) => Box::new(items.iter().filter(|v| !v.is_null())),
        Some(Value::Null) | None => Box::new(std::iter::empty()),
        Some(value) => Box::new(std::iter::once(value)),
    }
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(a.cmp(b)),
        },
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

/// Orders two hits by a sort array; `_doc` keeps insertion order.
fn compare_by_sort(sort: &[Value], a: &StoredDoc, b: &StoredDoc) -> Ordering {
    for key in sort {
        let Value::Object(spec) = key else {
            continue;
        };
        for (field, options) in spec {
            let descending = options["order"] == "desc";
            let ordering = match (a.source.get(field), b.source.get(field)) {
                (Some(x), Some(y)) => {
                    let ord = compare(x, y).unwrap_or(Ordering::Equal);
                    if descending { ord.reverse() } else { ord }
                }
                // Missing values sort last in either direction.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
    Ordering::Equal
}

/// Applies a `_source` projection: list of fields, `{includes, excludes}` or bool.
fn project(source: &Map<String, Value>, spec: Option<&Value>) -> Map<String, Value> {
    let names = |v: Option<&Value>| -> Vec<String> {
        v.and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };

    match spec {
        None | Some(Value::Bool(true)) => source.clone(),
        Some(Value::Bool(false)) => Map::new(),
        Some(fields @ Value::Array(_)) => {
            let keep = names(Some(fields));
            source
                .iter()
                .filter(|(k, _)| keep.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }
        Some(Value::Object(spec)) => {
            let includes = names(spec.get("includes"));
            let excludes = names(spec.get("excludes"));
            source
                .iter()
                .filter(|(k, _)| includes.is_empty() || includes.contains(k))
                .filter(|(k, _)| !excludes.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }
        Some(other) => panic!("unsupported _source projection {other}"),
    }
}
