//! JSON <-> Firestore REST value encoding.
//!
//! | JSON                                   | Firestore        |
//! |----------------------------------------|------------------|
//! | null                                   | `nullValue`      |
//! | bool                                   | `booleanValue`   |
//! | integer                                | `integerValue`   |
//! | float                                  | `doubleValue`    |
//! | RFC 3339 string with a time component  | `timestampValue` |
//! | other string                           | `stringValue`    |
//! | array                                  | `arrayValue`     |
//! | `{latitude, longitude}`                | `geoPointValue`  |
//! | other object                           | `mapValue`       |

use chrono::DateTime;
use serde_json::{json, Map, Number, Value};

use crate::domain::providers::{Document, DocumentStoreError};

fn is_timestamp(s: &str) -> bool {
    s.len() >= 20 && s.as_bytes().get(10) == Some(&b'T') && DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_geo_point(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map.get("latitude").is_some_and(Value::is_number)
        && map.get("longitude").is_some_and(Value::is_number)
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) if is_timestamp(s) => json!({ "timestampValue": s }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) if is_geo_point(map) => json!({ "geoPointValue": map }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode a document's top-level fields.
pub fn encode_fields(doc: &Document) -> Value {
    let fields: Map<String, Value> = doc.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect();
    Value::Object(fields)
}

fn codec_error(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Codec(message.into())
}

pub fn decode_value(value: &Value) -> Result<Value, DocumentStoreError> {
    let map = value
        .as_object()
        .ok_or_else(|| codec_error(format!("expected typed value, got {value}")))?;
    let (kind, inner) = map
        .iter()
        .next()
        .ok_or_else(|| codec_error("empty typed value"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| codec_error("booleanValue is not a bool")),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| codec_error(format!("invalid integerValue {inner}")))
        }
        "doubleValue" => match inner {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            // NaN and infinities have no JSON representation
            Value::String(_) => Ok(Value::Null),
            _ => Err(codec_error(format!("invalid doubleValue {inner}"))),
        },
        "timestampValue" | "stringValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| codec_error(format!("{kind} is not a string"))),
        "geoPointValue" => {
            let coord = |name: &str| {
                inner
                    .get(name)
                    .and_then(Value::as_f64)
                    .and_then(Number::from_f64)
                    .unwrap_or_else(|| 0.into())
            };
            Ok(json!({ "latitude": coord("latitude"), "longitude": coord("longitude") }))
        }
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()
                .map(|items| Value::Array(items.unwrap_or_default()))
        }
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            match fields {
                Some(fields) => decode_fields(fields).map(Value::Object),
                None => Ok(Value::Object(Map::new())),
            }
        }
        other => Err(codec_error(format!("unsupported value type {other}"))),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Document, DocumentStoreError> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}

/// Quote a top-level field name for use in field paths and update masks.
pub fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
