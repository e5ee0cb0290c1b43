//! Generic record-store adapter contract.
//!
//! [`Adapter`] is the surface the caller layer drives. Engine adapters do not
//! inherit lifecycle behavior; they hold a [`BaseAdapter`] and delegate the
//! generic parts (record-type lookup, primary-key naming) to it. Connection
//! state belongs to each engine adapter.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{StorageResult, ValidationError};
use crate::types::{FindResult, QuerySpec, Record, RecordSchema, RecordTypes, UpdateSpec};

/// Optional query features an adapter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterFeatures {
    /// Whether nested `and` / `or` query composition is supported.
    pub logical_operators: bool,
}

/// A store the caller layer persists records through.
///
/// # Example
///
/// ```ignore
/// use docbridge_persistence::core::Adapter;
/// use docbridge_persistence::types::{QuerySpec, UpdateSpec};
///
/// async fn example<A: Adapter>(adapter: &A) -> docbridge_persistence::StorageResult<()> {
///     adapter.connect().await?;
///     let found = adapter.find("user", None, &QuerySpec::new().with_limit(10)).await?;
///     println!("{} of {}", found.len(), found.count);
///     let updated = adapter.update("user", &[UpdateSpec::new("1").push("tags", "x")]).await?;
///     assert_eq!(updated, 1);
///     adapter.disconnect().await
/// }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Optional features this adapter supports.
    fn features(&self) -> AdapterFeatures;

    /// Establishes the connection and prepares the store for the record types.
    async fn connect(&self) -> StorageResult<()>;

    /// Releases the connection.
    async fn disconnect(&self) -> StorageResult<()>;

    /// Stores new records and returns them as stored.
    ///
    /// Records must already carry every declared field.
    async fn create(&self, record_type: &str, records: Vec<Record>) -> StorageResult<Vec<Record>>;

    /// Finds records by explicit ids and/or a query.
    async fn find(
        &self,
        record_type: &str,
        ids: Option<&[String]>,
        query: &QuerySpec,
    ) -> StorageResult<FindResult>;

    /// Applies partial updates and returns how many succeeded.
    async fn update(&self, record_type: &str, updates: &[UpdateSpec]) -> StorageResult<u64>;

    /// Deletes records by id, or the whole collection when no ids are given.
    /// Returns how many were deleted.
    async fn delete(&self, record_type: &str, ids: Option<&[String]>) -> StorageResult<u64>;
}

/// Default implementation of the engine-independent adapter parts.
#[derive(Debug)]
pub struct BaseAdapter {
    record_types: RecordTypes,
    primary_key: String,
}

impl BaseAdapter {
    /// Creates a base adapter over the given record types.
    pub fn new(record_types: RecordTypes, primary_key: impl Into<String>) -> Self {
        Self {
            record_types,
            primary_key: primary_key.into(),
        }
    }

    /// All declared record types.
    pub fn record_types(&self) -> &RecordTypes {
        &self.record_types
    }

    /// Name of the primary-key field.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Looks up a declared record type.
    pub fn schema(&self, record_type: &str) -> StorageResult<&RecordSchema> {
        self.record_types.get(record_type).ok_or_else(|| {
            ValidationError::UnknownRecordType {
                record_type: record_type.to_string(),
            }
            .into()
        })
    }
}
