//! Bulk mutation requests and their per-item outcomes.
//!
//! A bulk request is a flat list of action headers, each followed by its
//! payload line where the action takes one. Items succeed or fail
//! independently; only a transport-level failure fails the whole call.

use serde_json::{Map, Value};

use crate::error::{BackendError, StorageResult};
use crate::types::Record;

use super::dialect::VersionShim;
use super::transport::EsRequest;

/// Builds bulk requests for one record type.
pub struct BulkMutationBuilder<'a> {
    shim: &'a VersionShim,
    record_type: &'a str,
}

impl<'a> BulkMutationBuilder<'a> {
    /// Creates a builder addressing `record_type`.
    pub fn new(shim: &'a VersionShim, record_type: &'a str) -> Self {
        Self { shim, record_type }
    }

    /// One create-if-absent action per record.
    ///
    /// A record whose primary key is absent or null is sent without `_id` so
    /// the engine assigns one.
    pub fn create(&self, primary_key: &str, records: &[Record]) -> EsRequest {
        let mut lines = Vec::with_capacity(records.len() * 2);
        for record in records {
            let id = record.get(primary_key).and_then(|v| v.as_document_id());
            lines.push(
                self.shim
                    .bulk_header("create", self.record_type, id.as_deref()),
            );

            let mut doc: Map<String, Value> = record
                .iter()
                .map(|(field, value)| (field.clone(), value.to_wire()))
                .collect();
            self.shim.embed_discriminator(self.record_type, &mut doc);
            lines.push(Value::Object(doc));
        }
        self.shim.bulk_request(lines)
    }

    /// One delete action per id.
    pub fn delete(&self, ids: &[String]) -> EsRequest {
        let lines = ids
            .iter()
            .map(|id| self.shim.bulk_header("delete", self.record_type, Some(id)))
            .collect();
        self.shim.bulk_request(lines)
    }

    /// One merge-update action per `(id, patch)` pair.
    pub fn update(&self, patches: Vec<(String, Map<String, Value>)>) -> EsRequest {
        let mut lines = Vec::with_capacity(patches.len() * 2);
        for (id, patch) in patches {
            lines.push(self.shim.bulk_header("update", self.record_type, Some(&id)));
            let mut doc = Map::new();
            doc.insert("doc".to_string(), Value::Object(patch));
            lines.push(Value::Object(doc));
        }
        self.shim.bulk_request(lines)
    }
}

/// Per-item outcome of a bulk response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Items whose status was 2xx.
    pub succeeded: u64,
    /// Items that failed individually.
    pub failed: u64,
    /// Document id reported for each item, in request order.
    pub ids: Vec<Option<String>>,
}

impl BulkSummary {
    /// Reads the `items` array of a bulk response body.
    pub fn from_response(operation: &str, body: &Value) -> StorageResult<Self> {
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::UnexpectedResponse {
                operation: operation.to_string(),
                message: "bulk response has no items array".to_string(),
            })?;

        let mut summary = BulkSummary {
            ids: Vec::with_capacity(items.len()),
            ..Default::default()
        };
        let mut first_error: Option<&Value> = None;

        for item in items {
            // Each item is a single-key object: {"<action>": {...}}
            let result = item.as_object().and_then(|o| o.values().next());
            let status = result
                .and_then(|r| r.get("status"))
                .and_then(Value::as_u64);

            if status.is_some_and(|s| (200..300).contains(&s)) {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                if first_error.is_none() {
                    first_error = result.and_then(|r| r.get("error")).or(result);
                }
            }

            summary.ids.push(
                result
                    .and_then(|r| r.get("_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            );
        }

        if summary.failed > 0 {
            tracing::warn!(
                operation,
                succeeded = summary.succeeded,
                failed = summary.failed,
                first_error = %first_error.cloned().unwrap_or_default(),
                "Bulk request had failed items"
            );
        }

        Ok(summary)
    }
}
