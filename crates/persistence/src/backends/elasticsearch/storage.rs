//! Adapter implementation for Elasticsearch.
//!
//! Every operation is one linear request/response exchange, except that update
//! and delete by id may first read the stored documents with one multi-get
//! (push/pull values, and the discriminator under the typeless dialect).
//! Failures propagate unchanged; no operation retries.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::{Adapter, AdapterFeatures};
use crate::error::{BackendError, StorageResult};
use crate::types::{FindResult, QuerySpec, Record, UpdateSpec, Value as FieldValue};

use super::backend::{ElasticsearchAdapter, EsConnection};
use super::bulk::{BulkMutationBuilder, BulkSummary};
use super::normalize::ResultNormalizer;
use super::search::{CompiledQuery, EsQueryBuilder};
use super::update::{current_documents, prefetch_docs, prefetch_fields, resolve_patch};

#[async_trait]
impl Adapter for ElasticsearchAdapter {
    fn features(&self) -> AdapterFeatures {
        AdapterFeatures {
            logical_operators: false,
        }
    }

    async fn connect(&self) -> StorageResult<()> {
        self.open().await
    }

    async fn disconnect(&self) -> StorageResult<()> {
        self.close();
        Ok(())
    }

    async fn create(&self, record_type: &str, mut records: Vec<Record>) -> StorageResult<Vec<Record>> {
        let conn = self.connection()?;
        self.base().schema(record_type)?;
        if records.is_empty() {
            return Ok(records);
        }

        let primary_key = self.base().primary_key();
        let request = BulkMutationBuilder::new(&conn.shim, record_type).create(primary_key, &records);
        let body = conn.send_ok(request).await?;
        let summary = BulkSummary::from_response("create", &body)?;

        // Records submitted without a key take the one the engine assigned.
        for (record, assigned) in records.iter_mut().zip(summary.ids) {
            let keyless = record.get(primary_key).is_none_or(FieldValue::is_null);
            if let (true, Some(id)) = (keyless, assigned) {
                record.insert(primary_key.to_string(), FieldValue::String(id));
            }
        }

        tracing::debug!(
            record_type,
            count = records.len(),
            succeeded = summary.succeeded,
            "Created records"
        );
        Ok(records)
    }

    async fn find(
        &self,
        record_type: &str,
        ids: Option<&[String]>,
        query: &QuerySpec,
    ) -> StorageResult<FindResult> {
        let conn = self.connection()?;
        self.base().schema(record_type)?;
        let primary_key = self.base().primary_key();

        let compiled = EsQueryBuilder::new(&conn.shim, record_type, primary_key).build(ids, query);
        let requested = match &compiled {
            CompiledQuery::MultiGet { requested, .. } => Some(*requested),
            CompiledQuery::Search { .. } => None,
        };

        let request = compiled.into_request(&conn.shim, record_type);
        if let Some(body) = request.json_body() {
            tracing::trace!(record_type, body = %body, "Compiled find");
        }
        let body = conn.send_ok(request).await?;

        let normalizer = ResultNormalizer::new(&conn.shim, record_type, primary_key);
        let result = match requested {
            Some(requested) => normalizer.multi_get(body, requested)?,
            None => normalizer.search(body)?,
        };

        tracing::debug!(
            record_type,
            returned = result.len(),
            count = result.count,
            "Found records"
        );
        Ok(result)
    }

    async fn update(&self, record_type: &str, updates: &[UpdateSpec]) -> StorageResult<u64> {
        let conn = self.connection()?;
        self.base().schema(record_type)?;
        if updates.is_empty() {
            return Ok(0);
        }

        let mut fields = prefetch_fields(updates);
        if let Some(discriminator) = conn.shim.discriminator_field()
            && !fields.iter().any(|f| f == discriminator)
        {
            fields.push(discriminator.to_string());
        }
        let current = if fields.is_empty() {
            HashMap::new()
        } else {
            let ids = updates.iter().map(|update| update.id.as_str());
            fetch_current(&conn, record_type, ids, &fields).await?
        };

        let patches: Vec<_> = updates
            .iter()
            .filter(|update| {
                !current
                    .get(&update.id)
                    .is_some_and(|doc| conn.shim.is_foreign(record_type, doc))
            })
            .map(|update| (update.id.clone(), resolve_patch(update, current.get(&update.id))))
            .collect();
        if patches.is_empty() {
            tracing::debug!(record_type, count = updates.len(), "No updates for this record type");
            return Ok(0);
        }

        let request = BulkMutationBuilder::new(&conn.shim, record_type).update(patches);
        let body = conn.send_ok(request).await?;
        let summary = BulkSummary::from_response("update", &body)?;

        tracing::debug!(
            record_type,
            count = updates.len(),
            succeeded = summary.succeeded,
            "Updated records"
        );
        Ok(summary.succeeded)
    }

    async fn delete(&self, record_type: &str, ids: Option<&[String]>) -> StorageResult<u64> {
        let conn = self.connection()?;
        self.base().schema(record_type)?;

        let deleted = match ids {
            Some(ids) if !ids.is_empty() => {
                let owned = owned_ids(&conn, record_type, ids).await?;
                if owned.is_empty() {
                    0
                } else {
                    let request = BulkMutationBuilder::new(&conn.shim, record_type).delete(&owned);
                    let body = conn.send_ok(request).await?;
                    BulkSummary::from_response("delete", &body)?.succeeded
                }
            }
            _ => {
                let body = conn
                    .send_ok(conn.shim.delete_collection_request(record_type))
                    .await?;
                body.get("deleted").and_then(Value::as_u64).ok_or_else(|| {
                    BackendError::UnexpectedResponse {
                        operation: "delete_by_query".to_string(),
                        message: "missing deleted count".to_string(),
                    }
                })?
            }
        };

        tracing::debug!(record_type, deleted, "Deleted records");
        Ok(deleted)
    }
}

/// Reads `fields` of the listed documents, keyed by id; missing ids are absent.
async fn fetch_current<'a>(
    conn: &EsConnection,
    record_type: &str,
    ids: impl IntoIterator<Item = &'a str>,
    fields: &[String],
) -> StorageResult<HashMap<String, Map<String, Value>>> {
    let request = conn
        .shim
        .mget_request(record_type, prefetch_docs(ids, fields));
    Ok(current_documents(&conn.send_ok(request).await?))
}

/// The ids not stored as another record type's document.
///
/// Typed addressing is already scoped by type; typeless reads each
/// document's discriminator first.
async fn owned_ids(conn: &EsConnection, record_type: &str, ids: &[String]) -> StorageResult<Vec<String>> {
    let Some(discriminator) = conn.shim.discriminator_field() else {
        return Ok(ids.to_vec());
    };

    let fields = [discriminator.to_string()];
    let current = fetch_current(conn, record_type, ids.iter().map(String::as_str), &fields).await?;
    let owned: Vec<String> = ids
        .iter()
        .filter(|id| {
            !current
                .get(id.as_str())
                .is_some_and(|doc| conn.shim.is_foreign(record_type, doc))
        })
        .cloned()
        .collect();

    if owned.len() < ids.len() {
        tracing::debug!(
            record_type,
            skipped = ids.len() - owned.len(),
            "Skipped ids stored under another record type"
        );
    }
    Ok(owned)
}
