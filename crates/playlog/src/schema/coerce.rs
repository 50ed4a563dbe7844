//! Coercion of raw JSON values to declared field kinds.

use serde_json::Value;

use super::FieldKind;

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Long(i64),
    Double(f64),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Coerce a JSON value to `kind`.
///
/// Returns `None` when the value is present but incompatible; JSON null maps
/// to [`FieldValue::Null`].
///
/// - `Text` stringifies numbers and booleans, and serializes objects/arrays
///   to their JSON text.
/// - `Long` accepts integers, integral floats and numeric strings.
/// - `Double` accepts any number and numeric strings.
///
/// Blank strings are null for the numeric kinds.
pub fn coerce_value(value: &Value, kind: FieldKind) -> Option<FieldValue> {
    if value.is_null() {
        return Some(FieldValue::Null);
    }

    match kind {
        FieldKind::Text => Some(FieldValue::Text(match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })),
        FieldKind::Long => match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Some(FieldValue::Null);
                }
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        }
        .map(FieldValue::Long),
        FieldKind::Double => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Some(FieldValue::Null);
                }
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
        .map(FieldValue::Double),
    }
}

/// Convert a float to i64 if it has no fractional part and fits.
fn integral(v: f64) -> Option<i64> {
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}
