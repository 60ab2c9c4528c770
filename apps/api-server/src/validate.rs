//! Lightweight request-body validation helpers. Keep logic minimal and
//! deterministic: each check returns the client-facing message on failure.

use serde_json::Value;

/// Highest valid `unit_id` (unit types are numbered 0 through 12).
pub const MAX_UNIT_ID: i64 = 12;

pub type Check = fn(&Value) -> bool;

pub fn is_non_empty_string(v: &Value) -> bool {
    v.as_str().is_some_and(|s| !s.is_empty())
}

pub fn is_positive_number(v: &Value) -> bool {
    v.as_f64().is_some_and(|n| n > 0.0)
}

pub fn is_number(v: &Value) -> bool {
    v.is_number()
}

pub fn is_non_empty_array(v: &Value) -> bool {
    v.as_array().is_some_and(|a| !a.is_empty())
}

/// Integer-valued number in `0..=MAX_UNIT_ID`; `1.0` counts as an integer.
pub fn is_unit_id(v: &Value) -> bool {
    v.as_f64()
        .is_some_and(|n| n.fract() == 0.0 && (0.0..=MAX_UNIT_ID as f64).contains(&n))
}

/// `value` must be present (and not null) and pass `check`.
pub fn required(value: Option<&Value>, check: Check, message: &str) -> Result<(), String> {
    match value {
        Some(v) if !v.is_null() && check(v) => Ok(()),
        _ => Err(message.to_string()),
    }
}

/// `value` may be missing; if present it must pass `check`.
pub fn optional(value: Option<&Value>, check: Check, message: &str) -> Result<(), String> {
    match value {
        None => Ok(()),
        Some(v) if check(v) => Ok(()),
        Some(_) => Err(message.to_string()),
    }
}

/// Validate every element of a present array with `each(index, element)`.
pub fn each<F>(value: Option<&Value>, mut each: F) -> Result<(), String>
where
    F: FnMut(usize, &Value) -> Result<(), String>,
{
    if let Some(items) = value.and_then(Value::as_array) {
        for (idx, item) in items.iter().enumerate() {
            each(idx, item)?;
        }
    }
    Ok(())
}
