// Value coercions
//
// The portal is loose with types: numbers arrive as JSON numbers or as
// strings, rates as "42.3%", flags as "Y"/"N" or as counts, and power flow
// directions as -1/0/1 codes. Each field names the coercion that turns its
// raw JSON into a `FieldValue`.

use serde_json::{Number, Value};
use tracing::warn;

use super::value::FieldValue;

/// Label table for tri-state power flow codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionTable {
    /// `0 → Standby`, `1 → Discharging`, `-1 → Charging`.
    Battery,
    /// `0 → Standby`, `1 → Exporting`, `-1 → Importing`.
    Flow,
}

impl DirectionTable {
    /// Label for an exact code, `None` for anything outside the table.
    pub fn label(self, code: i64) -> Option<&'static str> {
        match (self, code) {
            (_, 0) => Some("Standby"),
            (Self::Battery, 1) => Some("Discharging"),
            (Self::Battery, -1) => Some("Charging"),
            (Self::Flow, 1) => Some("Exporting"),
            (Self::Flow, -1) => Some("Importing"),
            _ => None,
        }
    }
}

/// How a raw JSON value becomes a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coercion {
    /// Number or numeric string → float.
    Float,
    /// Integral number or integer string → int.
    Int,
    /// `"42.3%"` → `42.3`. The value is not divided by 100.
    Percentage,
    /// Nonzero → `true`, zero → `false`.
    BoolFromCount,
    /// `"Y"` → `true`, `"N"` → `false` (case-insensitive).
    YesNo,
    /// Direction code → label from the table, `"Unknown: <v>"` otherwise.
    Direction(DirectionTable),
    /// Any scalar rendered as text.
    Text,
    /// Scalar passed through with its JSON type.
    Raw,
}

impl Coercion {
    /// Coerce a present value. `Err` carries the reason the value was
    /// rejected; the caller records it against the field.
    ///
    /// JSON `null` is always `FieldValue::Null`. An empty string is treated
    /// as "no data" (`Null`) by the numeric coercions, since the portal
    /// blanks fields of offline devices.
    pub fn apply(self, key: &str, raw: &Value) -> Result<FieldValue, String> {
        if raw.is_null() {
            return Ok(FieldValue::Null);
        }

        match self {
            Self::Float => match numeric(raw)? {
                Some(v) => Ok(FieldValue::Float(v)),
                None => Ok(FieldValue::Null),
            },
            Self::Int => int(raw),
            Self::Percentage => percentage(raw),
            Self::BoolFromCount => match numeric(raw) {
                Ok(Some(v)) => Ok(FieldValue::Bool(v != 0.0)),
                Ok(None) => Ok(FieldValue::Null),
                Err(_) => match raw {
                    Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                    other => Err(format!("expected a count, got {other}")),
                },
            },
            Self::YesNo => yes_no(raw),
            Self::Direction(table) => Ok(direction(key, table, raw)),
            Self::Text => match raw {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
                other => Err(format!("expected a scalar, got {other}")),
            },
            Self::Raw => match raw {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Number(n) => Ok(number(n)),
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                other => Err(format!("expected a scalar, got {other}")),
            },
        }
    }
}

fn number(n: &Number) -> FieldValue {
    match n.as_i64() {
        Some(i) => FieldValue::Int(i),
        None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
    }
}

/// Float from a number or a numeric string. `Ok(None)` for a blank string.
fn numeric(raw: &Value) -> Result<Option<f64>, String> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number {n} is out of range")),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("expected a number, got {s:?}"))
        }
        other => Err(format!("expected a number, got {other}")),
    }
}

fn int(raw: &Value) -> Result<FieldValue, String> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(FieldValue::Int(i));
            }
            match n.as_f64() {
                #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
                Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(FieldValue::Int(f as i64)),
                _ => Err(format!("expected an integer, got {n}")),
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(FieldValue::Null);
            }
            trimmed
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| format!("expected an integer, got {s:?}"))
        }
        other => Err(format!("expected an integer, got {other}")),
    }
}

fn percentage(raw: &Value) -> Result<FieldValue, String> {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim().trim_end_matches('%').trim();
            if trimmed.is_empty() {
                return Ok(FieldValue::Null);
            }
            trimmed
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| format!("expected a percentage, got {s:?}"))
        }
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| format!("number {n} is out of range")),
        other => Err(format!("expected a percentage, got {other}")),
    }
}

fn yes_no(raw: &Value) -> Result<FieldValue, String> {
    match raw {
        Value::String(s) if s.trim().eq_ignore_ascii_case("y") => Ok(FieldValue::Bool(true)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("n") => Ok(FieldValue::Bool(false)),
        Value::String(s) if s.trim().is_empty() => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        other => Err(format!("expected \"Y\" or \"N\", got {other}")),
    }
}

/// Exact numeric comparison against the table. Codes are not rounded:
/// `1.5` is unknown.
fn direction(key: &str, table: DirectionTable, raw: &Value) -> FieldValue {
    let code = match raw {
        Value::Number(n) => exact_code(n),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    if let Some(label) = code.and_then(|c| table.label(c)) {
        return FieldValue::Text(label.to_owned());
    }

    let shown = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    warn!(field = key, value = %shown, "unknown direction code");
    FieldValue::Text(format!("Unknown: {shown}"))
}

fn exact_code(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let code = f as i64;
    (f.is_finite() && f.fract() == 0.0).then_some(code)
}
