//! Index bootstrap and schema consistency.
//!
//! Runs once per connect, in order:
//! 1. (typeless only) reinstall the template mapping the discriminator field
//!    as a keyword,
//! 2. create the index, tolerating an existing one,
//! 3. disable indexing of every binary-blob field, one mapping update per
//!    affected record type, all in flight at once.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::task::JoinSet;

use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{RecordSchema, RecordTypes};

use super::backend::EsConnection;
use super::dialect::VersionShim;
use super::transport::{EsRequest, EsResponse};

/// Engine error types meaning the index is already there.
const INDEX_EXISTS_ERRORS: &[&str] = &[
    "resource_already_exists_exception",
    "index_already_exists_exception",
];

fn bootstrap_failure(message: String) -> StorageError {
    BackendError::ConnectionFailed {
        backend_name: "elasticsearch".to_string(),
        message,
    }
    .into()
}

/// Sends a connect-time request; a missing response is a connection failure.
async fn send_bootstrap(conn: &EsConnection, request: EsRequest) -> StorageResult<EsResponse> {
    let operation = request.operation;
    conn.send(request)
        .await
        .map_err(|e| bootstrap_failure(format!("{} failed: {}", operation, e)))
}

/// Replaces the discriminator template: delete any previous one, then create it.
pub(crate) async fn install_discriminator_template(conn: &EsConnection) -> StorageResult<()> {
    let shim = &conn.shim;
    let template_name = shim.template_name();

    let response = send_bootstrap(conn, shim.delete_template_request()).await?;
    if !response.is_success() && response.status != 404 {
        return Err(bootstrap_failure(format!(
            "Failed to delete index template {} (status {}): {}",
            template_name, response.status, response.body
        )));
    }

    let response = send_bootstrap(conn, shim.put_template_request()).await?;
    if !response.is_success() {
        return Err(bootstrap_failure(format!(
            "Failed to create index template {} (status {}): {}",
            template_name, response.status, response.body
        )));
    }

    tracing::info!(
        template = %template_name,
        index = %shim.index(),
        "Installed discriminator index template"
    );
    Ok(())
}

/// Creates the configured index unless it already exists.
pub(crate) async fn ensure_index(conn: &EsConnection) -> StorageResult<()> {
    let index = conn.shim.index();
    let response = send_bootstrap(conn, conn.shim.create_index_request()).await?;

    if response.is_success() {
        tracing::info!(index = %index, "Created Elasticsearch index");
        return Ok(());
    }
    if response
        .error_type()
        .is_some_and(|t| INDEX_EXISTS_ERRORS.contains(&t))
    {
        tracing::debug!(index = %index, "Elasticsearch index already exists");
        return Ok(());
    }

    Err(bootstrap_failure(format!(
        "Failed to create index {} (status {}): {}",
        index, response.status, response.body
    )))
}

/// Mapping `properties` disabling indexing of a record type's blob fields.
///
/// Returns `None` when the record type has no blob field.
fn blob_properties(schema: &RecordSchema, shim: &VersionShim) -> Option<Map<String, Value>> {
    let properties: Map<String, Value> = schema
        .iter()
        .filter(|(_, descriptor)| descriptor.is_binary())
        .map(|(field, _)| {
            (
                field.clone(),
                json!({
                    "properties": {
                        "data": { "type": "long", "index": shim.unindexed_flag() }
                    }
                }),
            )
        })
        .collect();

    (!properties.is_empty()).then_some(properties)
}

/// One mapping-update request per record type with at least one blob field.
///
/// Deterministic: the same record types always yield identical requests.
pub(crate) fn mapping_requests(record_types: &RecordTypes, shim: &VersionShim) -> Vec<(String, EsRequest)> {
    record_types
        .iter()
        .filter_map(|(record_type, schema)| {
            blob_properties(schema, shim).map(|properties| {
                (
                    record_type.to_string(),
                    shim.put_mapping_request(record_type, properties),
                )
            })
        })
        .collect()
}

/// Applies blob-field mappings for every affected record type concurrently.
///
/// Waits for all updates; the first failure observed fails the whole call.
pub(crate) async fn ensure_mappings(
    conn: &Arc<EsConnection>,
    record_types: &RecordTypes,
) -> StorageResult<()> {
    let requests = mapping_requests(record_types, &conn.shim);
    if requests.is_empty() {
        return Ok(());
    }

    let mut tasks = JoinSet::new();
    for (record_type, request) in requests {
        let conn = Arc::clone(conn);
        tasks.spawn(async move {
            let outcome = match conn.send(request).await {
                Ok(response) if response.is_success() => Ok(()),
                Ok(response) => Err(format!("status {}: {}", response.status, response.body)),
                Err(e) => Err(e.to_string()),
            };
            (record_type, outcome)
        });
    }

    let mut first_failure: Option<BackendError> = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok((record_type, Ok(()))) => {
                tracing::info!(record_type = %record_type, "Applied blob field mapping");
                continue;
            }
            Ok((record_type, Err(message))) => BackendError::MappingFailed {
                record_type,
                message,
            },
            Err(e) => BackendError::MappingFailed {
                record_type: "<unknown>".to_string(),
                message: format!("mapping task failed: {}", e),
            },
        };
        tracing::error!(error = %failure, "Mapping update failed");
        first_failure.get_or_insert(failure);
    }

    match first_failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}
