//! Elasticsearch backend implementation.
//!
//! Translates the generic record-store protocol into the engine's wire API.
//! All record types share one index; the two API dialects differ in how a
//! document's record type is expressed:
//!
//! - **Typed** (`api_version` < 7): the record type is the engine's mapping
//!   type and part of every document address.
//! - **Typeless** (`api_version` >= 7): the record type is stored in the
//!   reserved `docbridge_type` field, every search filters on it, and an index
//!   template keeps that field a keyword.
//!
//! Only [`VersionShim`] knows which dialect is active; the query compiler,
//! bulk builder, update resolver and normalizer ask it for paths, headers and
//! dialect-specific clauses.
//!
//! # Connect sequence
//!
//! 1. build the transport (or take the injected one),
//! 2. reinstall the discriminator template (typeless only),
//! 3. create the index unless it exists,
//! 4. apply non-indexed mappings for binary-blob fields, one request per
//!    affected record type, concurrently.
//!
//! # Example
//!
//! ```ignore
//! use docbridge_persistence::backends::elasticsearch::{ElasticsearchAdapter, ElasticsearchConfig};
//! use docbridge_persistence::core::Adapter;
//! use docbridge_persistence::types::{QuerySpec, RecordTypes};
//!
//! let config = ElasticsearchConfig {
//!     hosts: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! };
//! let adapter = ElasticsearchAdapter::new(config, RecordTypes::new())?;
//! adapter.connect().await?;
//! let users = adapter.find("user", None, &QuerySpec::new().with_limit(0)).await?;
//! ```

mod backend;
mod bulk;
pub mod dialect;
mod normalize;
mod schema;
pub mod search;
mod storage;
pub mod transport;
mod update;

pub use backend::{ElasticsearchAdapter, ElasticsearchAuth, ElasticsearchConfig};
pub use dialect::{ApiVersion, DISCRIMINATOR_FIELD, Dialect, VersionShim};
pub use transport::{
    ElasticsearchTransport, EsRequest, EsResponse, EsTransport, HttpMethod, RequestBody,
};
