//! Total ordering over JSON values
//!
//! Ordering rules:
//! - null < bool < number < string < array < object
//! - For same types, natural ordering
//! - Arrays compare element-wise, then by length
//! - Objects compare entry-wise (key, then value), then by length
//!
//! A missing column sorts before every present value.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Compares two optional values
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => compare(a_val, b_val),
    }
}

/// Compares two present values
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let a_type = type_order(a);
    let b_type = type_order(b);
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
        (Value::Number(a_n), Value::Number(b_n)) => compare_numbers(a_n, b_n),
        (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
        (Value::Array(a_items), Value::Array(b_items)) => a_items
            .iter()
            .zip(b_items)
            .map(|(x, y)| compare(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a_items.len().cmp(&b_items.len())),
        (Value::Object(a_map), Value::Object(b_map)) => a_map
            .iter()
            .zip(b_map)
            .map(|((a_key, a_value), (b_key, b_value))| {
                a_key.cmp(b_key).then_with(|| compare(a_value, b_value))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a_map.len().cmp(&b_map.len())),
        _ => Ordering::Equal,
    }
}

/// Returns a short type name for diagnostics
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_order(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(a_i), Some(b_i)) = (a.as_i64(), b.as_i64()) {
        return a_i.cmp(&b_i);
    }
    if let (Some(a_u), Some(b_u)) = (a.as_u64(), b.as_u64()) {
        return a_u.cmp(&b_u);
    }
    let a_f = a.as_f64().unwrap_or(0.0);
    let b_f = b.as_f64().unwrap_or(0.0);
    a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
}
