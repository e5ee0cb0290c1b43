//! Search engine backend implementations.
//!
//! Each backend implements the [`Adapter`](crate::core::Adapter) contract and
//! is gated behind a feature flag.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Elasticsearch | `elasticsearch` (default) | Typed (< 7.0) and typeless (>= 7.0) API dialects |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "elasticsearch")]
//! use docbridge_persistence::backends::elasticsearch::{ElasticsearchAdapter, ElasticsearchConfig};
//! use docbridge_persistence::core::Adapter;
//! use docbridge_persistence::types::{FieldDescriptor, FieldType, RecordTypes};
//!
//! # #[cfg(feature = "elasticsearch")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let types = RecordTypes::new()
//!     .with_type("user", [("name", FieldDescriptor::of(FieldType::String))]);
//! let config = ElasticsearchConfig {
//!     api_version: "7.10".to_string(),
//!     ..Default::default()
//! };
//! let adapter = ElasticsearchAdapter::new(config, types)?;
//! adapter.connect().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
