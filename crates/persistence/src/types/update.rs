//! Partial update specifications.

use std::collections::BTreeMap;

use super::value::Value;

/// A partial update of one record.
///
/// Kinds apply in the fixed order pull, push, replace, operate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    /// Primary key of the record to update.
    pub id: String,
    /// Fields to overwrite; [`Value::Null`] clears a field.
    pub replace: BTreeMap<String, Value>,
    /// Values to append to sequence fields.
    pub push: BTreeMap<String, Value>,
    /// Values to remove from sequence fields.
    pub pull: BTreeMap<String, Value>,
    /// Unconditional overrides, applied last without schema checks.
    pub operate: BTreeMap<String, Value>,
}

impl UpdateSpec {
    /// Creates an empty update for a record.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Overwrites a field.
    pub fn replace(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.replace.insert(field.into(), value.into());
        self
    }

    /// Appends to a field; an array value appends each element.
    pub fn push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push.insert(field.into(), value.into());
        self
    }

    /// Removes from a field; an array value removes each element.
    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pull.insert(field.into(), value.into());
        self
    }

    /// Overrides a field unconditionally.
    pub fn operate(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operate.insert(field.into(), value.into());
        self
    }

    /// Field names read by push and pull, which need the stored values.
    pub fn array_fields(&self) -> impl Iterator<Item = &str> {
        self.push.keys().chain(self.pull.keys()).map(String::as_str)
    }
}
