//! Error types for the persistence layer.
//!
//! Errors are split into backend errors (connection, mapping, transport) and
//! validation errors (configuration and caller input). Partial failures inside
//! a bulk request are not errors; they only show up as a success count lower
//! than the batch size.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all adapter operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors originating from the search engine or the path to it.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Bootstrapping the connection failed during connect.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// A schema-consistency mapping update was rejected during connect.
    #[error("mapping update failed for record type {record_type}: {message}")]
    MappingFailed {
        record_type: String,
        message: String,
    },

    /// A whole request failed at the network or protocol level.
    #[error("{operation} request failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    TransportFailure {
        operation: String,
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was attempted before connect or after disconnect.
    #[error("adapter is not connected")]
    NotConnected,

    /// The engine answered with a body this layer cannot interpret.
    #[error("unexpected {operation} response: {message}")]
    UnexpectedResponse { operation: String, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Errors related to configuration and caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The record type is not declared in the adapter's schema.
    #[error("unknown record type: {record_type}")]
    UnknownRecordType { record_type: String },

    /// A configuration option holds an unusable value.
    #[error("invalid configuration option {option}: {message}")]
    InvalidConfiguration { option: String, message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl BackendError {
    /// Builds a transport failure for an operation that never got a response.
    pub fn transport(
        operation: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BackendError::TransportFailure {
            operation: operation.into(),
            status: None,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Builds a transport failure from a non-success HTTP status.
    pub fn rejected(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        BackendError::TransportFailure {
            operation: operation.into(),
            status: Some(status),
            message: body.into(),
            source: None,
        }
    }
}
