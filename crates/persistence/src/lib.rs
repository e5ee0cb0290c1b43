//! Docbridge Persistence Layer
//!
//! This crate translates a generic record-store protocol (create, find,
//! update, delete over typed record collections) into the wire API of
//! Elasticsearch, in both of the engine's addressing dialects.
//!
//! # Features
//!
//! - **Two dialects**: typed (API < 7.0, native mapping types) and typeless
//!   (API >= 7.0, record type stored in a keyword discriminator field)
//! - **Query compilation**: sort, projection, exists, phrase match with
//!   sentinel negation, numeric/timestamp ranges, free text, id sets, paging
//! - **Bulk mutations**: one bulk request per batch, per-item success counting
//! - **Partial updates**: pull, push, replace and operate resolved against a
//!   single prefetch of the current values
//! - **Binary fields**: byte sequences round-trip through a tagged wire form
//!   and are mapped as non-indexed at connect
//!
//! Enable backends and helpers with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge-persistence = { version = "0.1", features = ["logging"] }
//! ```
//!
//! - `elasticsearch` (default) - the Elasticsearch adapter
//! - `logging` - [`init_logging`] backed by `tracing-subscriber`
//!
//! # Architecture
//!
//! - [`types`] - record values, schemas, query and update specifications
//! - [`error`] - error types for all operations
//! - [`core`] - the [`Adapter`](core::Adapter) contract and [`BaseAdapter`](core::BaseAdapter)
//! - [`backends`] - engine adapters
//!
//! # Quick Start
//!
//! ```
//! use docbridge_persistence::types::{
//!     FieldDescriptor, FieldType, QuerySpec, RecordTypes, SortDirection, UpdateSpec,
//! };
//!
//! // Declare record types; binary fields get special mapping and decoding
//! let types = RecordTypes::new().with_type(
//!     "user",
//!     [
//!         ("name", FieldDescriptor::of(FieldType::String)),
//!         ("avatar", FieldDescriptor::of(FieldType::Binary)),
//!         ("friends", FieldDescriptor::link("user", true)),
//!     ],
//! );
//! assert!(types.get("user").unwrap()["avatar"].is_binary());
//!
//! // Queries are plain values
//! let query = QuerySpec::new()
//!     .with_match("name", "NOT-Bob")
//!     .with_sort("name", SortDirection::Ascending)
//!     .with_limit(0);
//! assert!(query.has_constraints());
//!
//! // So are partial updates
//! let update = UpdateSpec::new("1").push("friends", "2").replace("name", "Al");
//! assert_eq!(update.array_fields().count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use types::{FindResult, QuerySpec, Record, RecordTypes, UpdateSpec, Value};

// Re-export core traits
pub use core::{Adapter, AdapterFeatures, BaseAdapter};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `tracing` filter directive enabling this crate at a configured level.
///
/// Accepts the configuration's level names, including `"warning"`.
pub fn log_directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        other => other.to_string(),
    };
    format!("{}={}", NAME.replace('-', "_"), level)
}

/// Installs a global `tracing` subscriber for this crate at the given level.
///
/// `RUST_LOG`, when set, takes precedence.
#[cfg(feature = "logging")]
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
