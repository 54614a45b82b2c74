//! Coerce-or-skip scalar coercion.
//!
//! Payload fields arrive as loose JSON scalars. Reducers never raise on a
//! bad value: a field that cannot be coerced is excluded from the
//! computation and nothing else. Every number produced downstream ends up
//! verbatim in model-authored prose, so non-finite values are rejected here
//! rather than guarded at each call site.

use serde_json::Value;

/// Coerce a scalar to a finite f64. Numbers and numeric strings pass;
/// booleans, non-numeric strings, nulls, and non-finite values are skipped.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce a scalar to a boolean. Accepts booleans, the strings
/// "true"/"false" (any case), and numbers (non-zero is true).
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}
