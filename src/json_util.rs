//! Lenient readers for loosely-typed upstream JSON.
//!
//! The Gamma and Data APIs are inconsistent about scalar types: ids arrive as
//! strings or numbers, amounts as numbers or numeric strings, and list fields
//! such as `clobTokenIds` as real arrays or JSON-encoded array strings.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// Render a JSON scalar as text, matching what JavaScript's `String(v)` gives
/// for the values upstream actually sends. Null, arrays and objects yield `None`.
pub fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        // JS switches to exponent form outside [1e-6, 1e21).
        Some(f) if f.is_finite() && (f.abs() >= 1e21 || f.abs() < 1e-6) => js_exponent(f),
        // Display drops the trailing ".0", so 10.0 renders as "10".
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// `1e21` -> `1e+21`, `1.5e-7` -> `1.5e-7`.
fn js_exponent(f: f64) -> String {
    let text = format!("{f:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}

pub fn parse_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok().filter(|f| f.is_finite());
    }
    v.as_f64()
}

/// Parse a number or numeric string into a `Decimal` without going through `f64`
/// when the input is already text.
pub fn parse_decimal(v: Option<&Value>) -> Option<Decimal> {
    let text = match v? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_to_string(n),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// True when an amount field carries no usable value: absent, null, empty,
/// `false`, or numerically zero (`0`, `"0"`, `"0.00"`).
pub fn is_blank_amount(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f == 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.is_empty() || s.parse::<f64>().is_ok_and(|f| f == 0.0)
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// First value that is present and non-empty.
pub fn first_present<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
}

// ── serde adapters ────────────────────────────────────────────────

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().and_then(scalar_to_string))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Accepts `["a","b"]` or the JSON-encoded string `"[\"a\",\"b\"]"`.
pub fn opt_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.and_then(value_to_string_list))
}

fn value_to_string_list(v: Value) -> Option<Vec<String>> {
    let items = match v {
        Value::Array(items) => items,
        Value::String(s) => match serde_json::from_str::<Vec<Value>>(&s) {
            Ok(items) => items,
            Err(_) => return None,
        },
        _ => return None,
    };
    Some(items.iter().filter_map(scalar_to_string).collect())
}
