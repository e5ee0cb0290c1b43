//! Test infrastructure for the persistence layer.
//!
//! - [`engine`] - an in-process Elasticsearch double implementing `EsTransport`
//! - [`fixtures`] - record types, records and connected adapters

#![allow(dead_code)]

pub mod engine;
pub mod fixtures;

pub use engine::FakeEs;
pub use fixtures::*;
