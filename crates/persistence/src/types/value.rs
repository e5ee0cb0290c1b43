//! Dynamic field values and their wire encoding.
//!
//! Records carry [`Value`]s, which extend JSON with two kinds the engine
//! cannot represent natively: timestamps and raw byte sequences. On the wire
//! timestamps travel as RFC 3339 strings and byte sequences travel as a tagged
//! structure, `{"type": "Buffer", "data": [0, 255, ...]}`. Decoding restores
//! byte sequences from that structure; timestamps come back as strings.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as JsonValue};

/// Tag value marking an encoded byte sequence.
pub const BUFFER_TAG: &str = "Buffer";

/// A single field value of a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / cleared value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Opaque byte sequence (binary blob fields).
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Nested object.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text content of a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes of a [`Value::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the elements of a [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Renders the value as a document identifier.
    ///
    /// Strings are used verbatim and numbers in their decimal form; anything
    /// else cannot address a document.
    pub fn as_document_id(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) if f.is_finite() => Some(f.to_string()),
            _ => None,
        }
    }

    /// Encodes the value into its wire representation.
    pub fn to_wire(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Timestamp(ts) => {
                JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Bytes(bytes) => {
                let mut tagged = Map::new();
                tagged.insert("type".to_string(), JsonValue::from(BUFFER_TAG));
                tagged.insert(
                    "data".to_string(),
                    JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
                );
                JsonValue::Object(tagged)
            }
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_wire).collect()),
            Value::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
        }
    }

    /// Decodes a wire value, restoring tagged byte arrays to [`Value::Bytes`].
    pub fn from_wire(wire: JsonValue) -> Value {
        match wire {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_wire).collect())
            }
            JsonValue::Object(fields) => match decode_buffer(&fields) {
                Some(bytes) => Value::Bytes(bytes),
                None => Value::Object(
                    fields
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_wire(v)))
                        .collect(),
                ),
            },
        }
    }
}

/// Recognizes the tagged byte-array structure.
fn decode_buffer(fields: &Map<String, JsonValue>) -> Option<Vec<u8>> {
    if fields.get("type").and_then(JsonValue::as_str) != Some(BUFFER_TAG) {
        return None;
    }
    fields
        .get("data")?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
