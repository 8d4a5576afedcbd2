//! Record normalization
//!
//! Turns protocol-shaped values into the JSON documents the store persists:
//! byte buffers become base64 strings, split 64-bit integers become plain
//! numbers, null fields disappear, nested objects and lists are walked.

use crate::proto::{ProtoObject, ProtoValue};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Number, Value};

/// Normalize one value. `None` means the value is absent and its field
/// should be dropped.
pub fn normalize(value: &ProtoValue) -> Option<Value> {
    match value {
        ProtoValue::Null => None,
        ProtoValue::Bool(b) => Some(Value::Bool(*b)),
        ProtoValue::Int(n) => Some(Value::Number((*n).into())),
        ProtoValue::Long(l) => Some(Value::Number(l.to_number())),
        // NaN and infinities have no JSON form
        ProtoValue::Float(f) => Number::from_f64(*f).map(Value::Number),
        ProtoValue::String(s) => Some(Value::String(s.clone())),
        ProtoValue::Bytes(bytes) => Some(Value::String(STANDARD.encode(bytes))),
        ProtoValue::List(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| normalize(item).unwrap_or(Value::Null))
                .collect(),
        )),
        ProtoValue::Object(obj) => Some(Value::Object(normalize_object(obj))),
    }
}

/// Normalize every field of an object, dropping absent ones.
pub fn normalize_object(obj: &ProtoObject) -> Map<String, Value> {
    obj.iter()
        .filter_map(|(key, value)| normalize(value).map(|v| (key.clone(), v)))
        .collect()
}
