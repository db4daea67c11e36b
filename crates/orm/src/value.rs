//! Record and attribute value helpers

use std::cmp::Ordering;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Raw persisted record: attribute name -> value
pub type Record = Map<String, Value>;

/// Current time as stored in `createdAt`/`updatedAt`
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a record from `(name, value)` pairs
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Total order over JSON values used for sort keys.
///
/// Nulls sort first, then booleans, numbers, strings, arrays and objects.
/// Values of the same kind compare naturally; strings compare bytewise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Compare two records on an ordered list of attributes
pub fn compare_on(a: &Record, b: &Record, attributes: &[String]) -> Ordering {
    for attribute in attributes {
        let left = a.get(attribute).unwrap_or(&Value::Null);
        let right = b.get(attribute).unwrap_or(&Value::Null);
        let ord = compare_values(left, right);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Short human-readable type name for diagnostics
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
