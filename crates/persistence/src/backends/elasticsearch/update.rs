//! Partial update resolution.
//!
//! Push and pull need the stored value of the fields they touch, so a batch is
//! resolved in two steps: one multi-get reading only the push/pull fields of
//! every record, then one merged patch per record, applied in the order pull,
//! push, replace, operate. Under the typeless dialect the multi-get also reads
//! the discriminator, so ids naming another record type's document are
//! dropped before the bulk request. Everything here works on wire JSON so stored values
//! and update values compare the way the engine stores them.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::types::{UpdateSpec, Value as FieldValue};

/// Union of the push and pull fields across a batch, in first-seen order.
pub fn prefetch_fields(updates: &[UpdateSpec]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for field in updates.iter().flat_map(UpdateSpec::array_fields) {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}

/// Multi-get entries reading `fields` of every listed record.
pub fn prefetch_docs<'a>(ids: impl IntoIterator<Item = &'a str>, fields: &[String]) -> Vec<Value> {
    ids.into_iter()
        .map(|id| json!({ "_id": id, "_source": fields }))
        .collect()
}

/// Indexes the `_source` of every found document of a multi-get response by id.
pub fn current_documents(mget_body: &Value) -> HashMap<String, Map<String, Value>> {
    mget_body
        .get("docs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|doc| doc.get("found").and_then(Value::as_bool) == Some(true))
        .filter_map(|doc| {
            let id = doc.get("_id")?.as_str()?.to_string();
            let source = doc.get("_source")?.as_object()?.clone();
            Some((id, source))
        })
        .collect()
}

/// Computes the merged patch for one update.
///
/// `current` holds the stored values of the prefetched fields, or `None` when
/// nothing was read for this record.
pub fn resolve_patch(
    update: &UpdateSpec,
    current: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut patch = Map::new();

    for (field, value) in &update.pull {
        let Some(stored) = lookup(&patch, current, field) else {
            continue;
        };
        let mut items = into_sequence(stored);
        for unwanted in wire_items(value) {
            // First occurrence only.
            if let Some(pos) = items.iter().position(|item| *item == unwanted) {
                items.remove(pos);
            }
        }
        patch.insert(field.clone(), Value::Array(items));
    }

    for (field, value) in &update.push {
        let mut items = lookup(&patch, current, field)
            .map(into_sequence)
            .unwrap_or_default();
        items.extend(wire_items(value));
        patch.insert(field.clone(), Value::Array(items));
    }

    for (field, value) in update.replace.iter().chain(&update.operate) {
        patch.insert(field.clone(), value.to_wire());
    }

    patch
}

/// Latest value of a field: the patch so far over the stored document.
///
/// Null counts as absent.
fn lookup(patch: &Map<String, Value>, current: Option<&Map<String, Value>>, field: &str) -> Option<Value> {
    patch
        .get(field)
        .or_else(|| current.and_then(|doc| doc.get(field)))
        .filter(|value| !value.is_null())
        .cloned()
}

/// Coerces a stored value to a sequence.
fn into_sequence(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        scalar => vec![scalar],
    }
}

/// Wire form of each element a push/pull value names.
fn wire_items(value: &FieldValue) -> Vec<Value> {
    match value {
        FieldValue::Array(items) => items.iter().map(FieldValue::to_wire).collect(),
        single => vec![single.to_wire()],
    }
}
