//! Dynamic protocol values
//!
//! The protocol client hands over loosely-typed trees: protobuf-style 64-bit
//! integers split into halves, raw byte buffers, explicit nulls. `ProtoValue`
//! captures all of them so the normalizer can map each shape deliberately.

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A field map as emitted by the protocol client.
pub type ProtoObject = BTreeMap<String, ProtoValue>;

/// 64-bit integer carried as two 32-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Long {
    pub low: i32,
    pub high: i32,
    pub unsigned: bool,
}

impl Long {
    pub fn from_i64(v: i64) -> Self {
        Self {
            low: v as i32,
            high: (v >> 32) as i32,
            unsigned: false,
        }
    }

    pub fn from_u64(v: u64) -> Self {
        Self {
            low: v as u32 as i32,
            high: (v >> 32) as u32 as i32,
            unsigned: true,
        }
    }

    pub fn as_u64(&self) -> u64 {
        ((self.high as u32 as u64) << 32) | (self.low as u32 as u64)
    }

    pub fn as_i64(&self) -> i64 {
        self.as_u64() as i64
    }

    /// Plain JSON number for this value, honoring signedness.
    pub fn to_number(&self) -> Number {
        if self.unsigned {
            Number::from(self.as_u64())
        } else {
            Number::from(self.as_i64())
        }
    }
}

/// Raw protocol-shaped value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProtoValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Long(Long),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<ProtoValue>),
    Object(ProtoObject),
}

impl ProtoValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view across the wide and narrow integer shapes.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Long(l) => Some(l.as_i64()),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl From<&str> for ProtoValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ProtoValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ProtoValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for ProtoValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Value> for ProtoValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Long(Long::from_u64(u))
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                if let Some(long) = long_from_json(&map) {
                    return Self::Long(long);
                }
                if let Some(bytes) = buffer_from_json(&map) {
                    return Self::Bytes(bytes);
                }
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for ProtoValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// `{"low": .., "high": .., "unsigned": ..}` as written by protobuf JSON dumps.
fn long_from_json(map: &serde_json::Map<String, Value>) -> Option<Long> {
    let allowed = map
        .keys()
        .all(|k| matches!(k.as_str(), "low" | "high" | "unsigned"));
    if !allowed {
        return None;
    }
    let low = i32::try_from(map.get("low")?.as_i64()?).ok()?;
    let high = i32::try_from(map.get("high")?.as_i64()?).ok()?;
    let unsigned = match map.get("unsigned") {
        Some(v) => v.as_bool()?,
        None => false,
    };
    Some(Long {
        low,
        high,
        unsigned,
    })
}

/// `{"type": "Buffer", "data": [..]}` as written by Node's JSON encoder.
fn buffer_from_json(map: &serde_json::Map<String, Value>) -> Option<Vec<u8>> {
    if map.len() != 2 || map.get("type")?.as_str()? != "Buffer" {
        return None;
    }
    map.get("data")?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_long_halves() {
        let ts = 1_700_000_000_123i64;
        let long = Long::from_i64(ts);
        assert_eq!(long.as_i64(), ts);

        let neg = Long::from_i64(-5);
        assert_eq!(neg.as_i64(), -5);

        let big = Long::from_u64(u64::MAX);
        assert_eq!(big.as_u64(), u64::MAX);
        assert_eq!(big.to_number(), Number::from(u64::MAX));
    }

    #[test]
    fn test_json_long_is_recognized() {
        let v: ProtoValue = serde_json::from_value(json!({"low": 12, "high": 1, "unsigned": true})).unwrap();
        assert_eq!(v.as_i64(), Some((1i64 << 32) + 12));
    }

    #[test]
    fn test_json_object_with_extra_keys_is_not_long() {
        let v: ProtoValue = serde_json::from_value(json!({"low": 1, "high": 0, "name": "x"})).unwrap();
        assert!(matches!(v, ProtoValue::Object(_)));
    }

    #[test]
    fn test_json_buffer_is_bytes() {
        let v: ProtoValue = serde_json::from_value(json!({"type": "Buffer", "data": [1, 2, 255]})).unwrap();
        assert_eq!(v, ProtoValue::Bytes(vec![1, 2, 255]));
    }

    #[test]
    fn test_json_buffer_out_of_range_stays_object() {
        let v: ProtoValue = serde_json::from_value(json!({"type": "Buffer", "data": [256]})).unwrap();
        assert!(matches!(v, ProtoValue::Object(_)));
    }

    #[test]
    fn test_as_i64_views() {
        assert_eq!(ProtoValue::Int(7).as_i64(), Some(7));
        assert_eq!(ProtoValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(ProtoValue::Float(3.5).as_i64(), None);
        assert_eq!(ProtoValue::from("7").as_i64(), None);
    }
}
