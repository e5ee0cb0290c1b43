//! Record types, records and connected adapters shared by the tests.

use std::sync::Arc;

use docbridge_persistence::backends::elasticsearch::{ElasticsearchAdapter, ElasticsearchConfig};
use docbridge_persistence::core::Adapter;
use docbridge_persistence::types::{FieldDescriptor, FieldType, Record, RecordTypes, Value};

use super::engine::FakeEs;

/// API versions exercised by dialect-independent tests: one typed, one typeless.
pub const DIALECTS: [&str; 2] = ["2.4", "7.10"];

/// `user` (with a binary field) and `post` (without one).
pub fn record_types() -> RecordTypes {
    RecordTypes::new()
        .with_type(
            "user",
            [
                ("id", FieldDescriptor::of(FieldType::String)),
                ("name", FieldDescriptor::of(FieldType::String)),
                ("age", FieldDescriptor::of(FieldType::Number)),
                ("status", FieldDescriptor::of(FieldType::String)),
                ("tags", FieldDescriptor::array_of(FieldType::String)),
                ("avatar", FieldDescriptor::of(FieldType::Binary)),
                ("friends", FieldDescriptor::link("user", true)),
            ],
        )
        .with_type(
            "post",
            [
                ("id", FieldDescriptor::of(FieldType::String)),
                ("title", FieldDescriptor::of(FieldType::String)),
            ],
        )
}

/// Record types without any binary field.
pub fn plain_record_types() -> RecordTypes {
    RecordTypes::new().with_type("post", [("title", FieldDescriptor::of(FieldType::String))])
}

/// A fully populated `user` record.
pub fn user(id: &str, name: &str, age: i64) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(id));
    record.insert("name".to_string(), Value::from(name));
    record.insert("age".to_string(), Value::from(age));
    record.insert("status".to_string(), Value::Null);
    record.insert("tags".to_string(), Value::Array(vec![]));
    record.insert("avatar".to_string(), Value::Null);
    record.insert("friends".to_string(), Value::Array(vec![]));
    record
}

/// A fully populated `post` record.
pub fn post(id: &str, title: &str) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(id));
    record.insert("title".to_string(), Value::from(title));
    record
}

/// An unconnected adapter wired to a fresh fake engine.
pub fn adapter_with(api_version: &str, record_types: RecordTypes) -> (ElasticsearchAdapter, Arc<FakeEs>) {
    let engine = Arc::new(FakeEs::new(api_version));
    let config = ElasticsearchConfig {
        api_version: api_version.to_string(),
        ..Default::default()
    };
    let adapter = ElasticsearchAdapter::new(config, record_types)
        .expect("valid configuration")
        .with_transport(engine.clone());
    (adapter, engine)
}

/// A connected adapter over [`record_types`]; connect requests are cleared.
pub async fn connected(api_version: &str) -> (ElasticsearchAdapter, Arc<FakeEs>) {
    let (adapter, engine) = adapter_with(api_version, record_types());
    adapter.connect().await.expect("connect");
    engine.clear_requests();
    (adapter, engine)
}

/// Strings as an id list.
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
