//! Result normalization.
//!
//! Turns multi-get and search responses into [`FindResult`]s: tagged byte
//! arrays are decoded back to bytes, the discriminator is removed, and the
//! primary key is filled from `_id` when the stored source lacks it.

use serde_json::{Map, Value};

use crate::error::{BackendError, StorageResult};
use crate::types::{FindResult, Record, Value as FieldValue};

use super::dialect::VersionShim;

/// Shapes raw responses for one record type.
pub struct ResultNormalizer<'a> {
    shim: &'a VersionShim,
    record_type: &'a str,
    primary_key: &'a str,
}

impl<'a> ResultNormalizer<'a> {
    /// Creates a normalizer.
    pub fn new(shim: &'a VersionShim, record_type: &'a str, primary_key: &'a str) -> Self {
        Self {
            shim,
            record_type,
            primary_key,
        }
    }

    /// Normalizes a search response; `count` is the engine's total hit count.
    pub fn search(&self, body: Value) -> StorageResult<FindResult> {
        let unexpected = |message: &str| BackendError::UnexpectedResponse {
            operation: "search".to_string(),
            message: message.to_string(),
        };

        let Value::Object(mut body) = body else {
            return Err(unexpected("body is not an object").into());
        };
        let Some(Value::Object(mut hits)) = body.remove("hits") else {
            return Err(unexpected("missing hits").into());
        };

        // Typed engines report a number, typeless ones {"value": n, "relation": ..}.
        let count = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
            _ => None,
        }
        .ok_or_else(|| unexpected("missing hits.total"))?;

        let records = match hits.remove("hits") {
            Some(Value::Array(hits)) => hits
                .into_iter()
                .filter_map(|hit| self.hit_to_record(hit))
                .collect(),
            _ => Vec::new(),
        };

        Ok(FindResult { records, count })
    }

    /// Normalizes a multi-get response.
    ///
    /// Missing documents and documents of another record type are dropped;
    /// `count` is the number of requested ids regardless.
    pub fn multi_get(&self, body: Value, requested: usize) -> StorageResult<FindResult> {
        let Some(Value::Array(docs)) = body.get("docs").cloned() else {
            return Err(BackendError::UnexpectedResponse {
                operation: "mget".to_string(),
                message: "missing docs".to_string(),
            }
            .into());
        };

        let records = docs
            .into_iter()
            .filter(|doc| doc.get("found").and_then(Value::as_bool) == Some(true))
            .filter(|doc| self.belongs_to_type(doc))
            .filter_map(|doc| self.hit_to_record(doc))
            .collect();

        Ok(FindResult {
            records,
            count: requested as u64,
        })
    }

    /// A multi-get hit belongs to the record type unless its discriminator says otherwise.
    fn belongs_to_type(&self, doc: &Value) -> bool {
        doc.get("_source")
            .and_then(Value::as_object)
            .is_none_or(|source| !self.shim.is_foreign(self.record_type, source))
    }

    fn hit_to_record(&self, hit: Value) -> Option<Record> {
        let Value::Object(mut hit) = hit else {
            return None;
        };
        let id = hit
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let source = match hit.remove("_source") {
            Some(Value::Object(source)) => source,
            _ => Map::new(),
        };
        Some(self.to_record(id, source))
    }

    fn to_record(&self, id: Option<String>, mut source: Map<String, Value>) -> Record {
        if let Some(field) = self.shim.discriminator_field() {
            source.remove(field);
        }

        let mut record: Record = source
            .into_iter()
            .map(|(field, value)| (field, FieldValue::from_wire(value)))
            .collect();

        let missing_key = record
            .get(self.primary_key)
            .is_none_or(FieldValue::is_null);
        if let (true, Some(id)) = (missing_key, id) {
            record.insert(self.primary_key.to_string(), FieldValue::String(id));
        }
        record
    }
}
