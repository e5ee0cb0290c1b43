//! Records and the record-type schema they are declared against.

use std::collections::BTreeMap;

use super::value::Value;

/// A stored record: field name to value.
///
/// The primary-key field is an ordinary entry; its name is configured per
/// adapter instance.
pub type Record = BTreeMap<String, Value>;

/// Type tag of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// Numeric value.
    Number,
    /// Boolean flag.
    Boolean,
    /// Point in time.
    Timestamp,
    /// Nested object.
    Object,
    /// Opaque byte sequence; never indexed for text search.
    Binary,
}

/// Declaration of a single field on a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Value type, if the field is typed (link fields are not).
    pub field_type: Option<FieldType>,
    /// Whether the field holds a sequence of values.
    pub is_array: bool,
    /// Related record type, for link fields.
    pub link: Option<String>,
}

impl FieldDescriptor {
    /// A scalar field of the given type.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            is_array: false,
            link: None,
        }
    }

    /// A sequence field of the given type.
    pub fn array_of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            is_array: true,
            link: None,
        }
    }

    /// A link to another record type.
    pub fn link(record_type: impl Into<String>, is_array: bool) -> Self {
        Self {
            field_type: None,
            is_array,
            link: Some(record_type.into()),
        }
    }

    /// Returns true if this field holds binary blobs.
    pub fn is_binary(&self) -> bool {
        self.field_type == Some(FieldType::Binary)
    }
}

/// Ordered field declarations of one record type.
pub type RecordSchema = BTreeMap<String, FieldDescriptor>;

/// Every record type known to an adapter, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTypes {
    types: BTreeMap<String, RecordSchema>,
}

impl RecordTypes {
    /// Creates an empty set of record types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record type with its field declarations.
    pub fn with_type<I, K>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldDescriptor)>,
        K: Into<String>,
    {
        self.types.insert(
            name.into(),
            fields.into_iter().map(|(k, d)| (k.into(), d)).collect(),
        );
        self
    }

    /// Returns the schema of a record type.
    pub fn get(&self, name: &str) -> Option<&RecordSchema> {
        self.types.get(name)
    }

    /// Returns true if the record type is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterates over record types in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordSchema)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared record types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no record type is declared.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
