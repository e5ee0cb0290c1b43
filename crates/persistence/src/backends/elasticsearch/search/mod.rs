//! Elasticsearch search query translation.
//!
//! Translates record-store query specifications into Elasticsearch Query DSL.

pub mod query_builder;

pub use query_builder::{CompiledQuery, DEFAULT_PAGE_SIZE, EsQueryBuilder, TIE_BREAK_FIELD};
