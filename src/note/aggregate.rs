//! Analysis Aggregator
//!
//! Merges per-chunk analysis records into one module analysis. The record
//! schema belongs to the analysis template, so the merge is structural:
//!
//! - array + array: union, exact-duplicate entries removed, first-seen order
//! - object + object: merged recursively with the same rules
//! - anything else: the later value wins unless it carries no information
//!   (`null`, blank, `TBD`/`unknown`/`n/a`, empty array or object)

use serde_json::{Map, Value};

use crate::types::is_unknown_value;

/// Merge records in chunk order
pub fn merge_records<I>(records: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    let mut merged = Map::new();
    for record in records {
        merge_object(&mut merged, normalize_object(record));
    }
    merged
}

/// Remove exact-duplicate array entries at every depth
fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items.into_iter().map(normalize) {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            Value::Array(unique)
        }
        Value::Object(fields) => Value::Object(normalize_object(fields)),
        other => other,
    }
}

fn normalize_object(fields: Map<String, Value>) -> Map<String, Value> {
    fields.into_iter().map(|(k, v)| (k, normalize(v))).collect()
}

fn merge_object(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Array(current), Value::Array(items)) => {
            for item in items {
                if !current.contains(&item) {
                    current.push(item);
                }
            }
        }
        (Value::Object(current), Value::Object(fields)) => merge_object(current, fields),
        (slot, incoming) => {
            if !is_unknown_value(&incoming) || (is_unknown_value(slot) && !incoming.is_null()) {
                *slot = incoming;
            }
        }
    }
}
