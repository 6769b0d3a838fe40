//! Runtime values bound to fields and parameters

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// One data row: field name -> value
pub type Record = BTreeMap<String, Value>;

/// Report parameters: parameter name -> value
pub type Parameters = BTreeMap<String, Value>;

/// A loosely-typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f64),
    Text(String),
    /// Date-time without offset
    Timestamp(NaiveDateTime),
    /// Date-time with offset, normalised to UTC
    DateTime(DateTime<Utc>),
    /// JSON arrays and objects
    Nested(serde_json::Value),
}

impl Value {
    /// Convert a JSON value
    ///
    /// Integers that fit 32 bits become [`Value::Int`], larger ones
    /// [`Value::Long`]; arrays and objects are kept as [`Value::Nested`].
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i))
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Nested(nested)
            }
        }
    }

    /// Convert a JSON object into a record; anything else yields `None`
    pub fn record_from_json(value: serde_json::Value) -> Option<Record> {
        match value {
            serde_json::Value::Object(map) => Some(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Short kind name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Long(_) => "long",
            Value::Float(_) => "decimal",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::DateTime(_) => "datetime",
            Value::Nested(_) => "nested",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Float(_))
    }

    /// Numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Date-time value as a wall-clock timestamp
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::DateTime(dt) => Some(dt.naive_utc()),
            _ => None,
        }
    }

    /// Truthiness for print-when expressions
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Text(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.naive_utc().format("%Y-%m-%d %H:%M:%S")),
            Value::Nested(json) => write!(f, "{json}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_integer_widths() {
        assert_eq!(Value::from_json(json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(json!(-7)), Value::Int(-7));
        assert_eq!(
            Value::from_json(json!(3_000_000_000i64)),
            Value::Long(3_000_000_000)
        );
        assert_eq!(Value::from_json(json!(19.95)), Value::Float(19.95));
    }

    #[test]
    fn test_from_json_nested() {
        let nested = json!({"a": [1, 2]});
        assert_eq!(Value::from_json(nested.clone()), Value::Nested(nested));
        assert_eq!(Value::from_json(json!(null)), Value::Null);
    }

    #[test]
    fn test_record_from_json() {
        let record = Value::record_from_json(json!({"total": "19.95", "qty": 2})).unwrap();
        assert_eq!(record.get("total"), Some(&Value::Text("19.95".into())));
        assert_eq!(record.get("qty"), Some(&Value::Int(2)));
        assert!(Value::record_from_json(json!([1])).is_none());
    }

    #[test]
    fn test_display() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-03-01 00:00:00");
        assert_eq!(Value::Float(19.95).to_string(), "19.95");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Nested(json!([1, 2])).to_string(), "[1,2]");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::from("TRUE").is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(1).is_truthy());
    }
}
