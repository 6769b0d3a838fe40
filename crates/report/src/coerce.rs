//! Coercion of loosely-typed record values to declared field types
//!
//! Values that already have the declared kind, nulls and values of `Text`
//! or unsupported fields pass through, as do kinds with no conversion
//! (booleans, for example). A number or text that cannot be converted is
//! kept as it is; the failure is logged and never aborts the batch.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use template::{FieldDescriptor, FieldType, Record, Value};
use tracing::warn;

/// ISO-8601 local date-time with optional fraction, no offset
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Result of coercing one value
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionOutcome {
    /// Converted to the declared kind
    Coerced(Value),
    /// Left as it was; `reason` is set when a conversion was attempted and failed
    Unchanged { value: Value, reason: Option<String> },
}

impl CoercionOutcome {
    fn unchanged(value: Value) -> Self {
        CoercionOutcome::Unchanged {
            value,
            reason: None,
        }
    }

    fn failed(value: Value, declared: &FieldType) -> Self {
        let reason = format!("cannot convert {} value '{value}' to {declared:?}", value.kind());
        CoercionOutcome::Unchanged {
            value,
            reason: Some(reason),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            CoercionOutcome::Coerced(value) | CoercionOutcome::Unchanged { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            CoercionOutcome::Coerced(value) | CoercionOutcome::Unchanged { value, .. } => value,
        }
    }

    /// Failure reason, if a conversion failed
    pub fn failure(&self) -> Option<&str> {
        match self {
            CoercionOutcome::Unchanged {
                reason: Some(reason),
                ..
            } => Some(reason),
            _ => None,
        }
    }
}

/// Coerces records against a template's declared fields
#[derive(Debug, Clone)]
pub struct TypeCoercer {
    declared: HashMap<String, FieldType>,
}

impl TypeCoercer {
    pub fn new(fields: &[FieldDescriptor]) -> Self {
        Self {
            declared: fields
                .iter()
                .map(|field| (field.name.clone(), field.field_type.clone()))
                .collect(),
        }
    }

    /// Coerce every record
    pub fn coerce(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.coerce_record(index, record))
            .collect()
    }

    fn coerce_record(&self, index: usize, record: Record) -> Record {
        record
            .into_iter()
            .map(|(name, value)| {
                let Some(declared) = self.declared.get(&name) else {
                    return (name, value);
                };
                let outcome = coerce_value(declared, value);
                if let Some(reason) = outcome.failure() {
                    warn!(record = index, field = %name, reason, "Keeping value unconverted");
                }
                (name, outcome.into_value())
            })
            .collect()
    }
}

/// Coerce one value to a declared type
pub fn coerce_value(declared: &FieldType, value: Value) -> CoercionOutcome {
    if value.is_null() {
        return CoercionOutcome::unchanged(value);
    }

    match declared {
        FieldType::Decimal => match value {
            Value::Float(_) => CoercionOutcome::unchanged(value),
            Value::Int(i) => CoercionOutcome::Coerced(Value::Float(i as f64)),
            Value::Long(l) => CoercionOutcome::Coerced(Value::Float(l as f64)),
            // decimals alone tolerate surrounding whitespace
            Value::Text(ref s) => match s.trim().parse::<f64>() {
                Ok(f) => CoercionOutcome::Coerced(Value::Float(f)),
                Err(_) => CoercionOutcome::failed(value, declared),
            },
            other => CoercionOutcome::unchanged(other),
        },
        FieldType::Integer => match value {
            Value::Int(_) => CoercionOutcome::unchanged(value),
            // keeps the low 32 bits
            Value::Long(l) => CoercionOutcome::Coerced(Value::Int(l as i32)),
            // `as` truncates toward zero and saturates
            Value::Float(f) => CoercionOutcome::Coerced(Value::Int(f as i32)),
            Value::Text(ref s) => match s.parse::<i32>() {
                Ok(i) => CoercionOutcome::Coerced(Value::Int(i)),
                Err(_) => CoercionOutcome::failed(value, declared),
            },
            other => CoercionOutcome::unchanged(other),
        },
        FieldType::Long => match value {
            Value::Long(_) => CoercionOutcome::unchanged(value),
            Value::Int(i) => CoercionOutcome::Coerced(Value::Long(i as i64)),
            Value::Float(f) => CoercionOutcome::Coerced(Value::Long(f as i64)),
            Value::Text(ref s) => match s.parse::<i64>() {
                Ok(l) => CoercionOutcome::Coerced(Value::Long(l)),
                Err(_) => CoercionOutcome::failed(value, declared),
            },
            other => CoercionOutcome::unchanged(other),
        },
        FieldType::Timestamp => match value {
            Value::Timestamp(_) => CoercionOutcome::unchanged(value),
            Value::DateTime(dt) => CoercionOutcome::Coerced(Value::Timestamp(dt.naive_utc())),
            Value::Text(ref s) => match NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
                Ok(ts) => CoercionOutcome::Coerced(Value::Timestamp(ts)),
                Err(_) => CoercionOutcome::failed(value, declared),
            },
            other => CoercionOutcome::unchanged(other),
        },
        FieldType::Text | FieldType::Other(_) => CoercionOutcome::unchanged(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn field(name: &str, field_type: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            field_type,
        }
    }

    #[test]
    fn test_decimal() {
        assert_eq!(
            coerce_value(&FieldType::Decimal, Value::from("19.95")),
            CoercionOutcome::Coerced(Value::Float(19.95))
        );
        assert_eq!(
            coerce_value(&FieldType::Decimal, Value::Int(3)),
            CoercionOutcome::Coerced(Value::Float(3.0))
        );
        assert_eq!(
            coerce_value(&FieldType::Decimal, Value::Float(1.5)),
            CoercionOutcome::Unchanged {
                value: Value::Float(1.5),
                reason: None
            }
        );
    }

    #[test]
    fn test_integer_and_long() {
        assert_eq!(
            coerce_value(&FieldType::Integer, Value::from("42")).into_value(),
            Value::Int(42)
        );
        assert_eq!(
            coerce_value(&FieldType::Decimal, Value::from(" 2.5 ")).into_value(),
            Value::Float(2.5)
        );
        assert_eq!(
            coerce_value(&FieldType::Integer, Value::Float(-7.9)).into_value(),
            Value::Int(-7)
        );
        assert_eq!(
            coerce_value(&FieldType::Integer, Value::Long(10_000_000_000)).into_value(),
            Value::Int(1_410_065_408)
        );
        assert_eq!(
            coerce_value(&FieldType::Integer, Value::Long(-2_147_483_649)).into_value(),
            Value::Int(i32::MAX)
        );
        assert_eq!(
            coerce_value(&FieldType::Long, Value::Int(5)).into_value(),
            Value::Long(5)
        );
        assert_eq!(
            coerce_value(&FieldType::Long, Value::from("9000000000")).into_value(),
            Value::Long(9_000_000_000)
        );
        assert_eq!(
            coerce_value(&FieldType::Long, Value::Float(f64::MAX)).into_value(),
            Value::Long(i64::MAX)
        );
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(
            coerce_value(&FieldType::Timestamp, Value::from("2024-03-01T00:00:00")).into_value(),
            Value::Timestamp(ts(2024, 3, 1, 0, 0, 0))
        );
        assert_eq!(
            coerce_value(&FieldType::Timestamp, Value::from("2024-03-01T10:20:30.250"))
                .into_value()
                .to_string(),
            "2024-03-01 10:20:30"
        );
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            coerce_value(&FieldType::Timestamp, Value::DateTime(utc)).into_value(),
            Value::Timestamp(ts(2024, 3, 1, 12, 0, 0))
        );
    }

    #[test]
    fn test_unparseable_values_are_kept() {
        let cases = [
            (FieldType::Decimal, Value::from("abc")),
            (FieldType::Integer, Value::from("12.5")),
            (FieldType::Long, Value::from("")),
            (FieldType::Timestamp, Value::from("2024-03-01")),
            (FieldType::Timestamp, Value::from("2024-03-01T00:00:00Z")),
            (FieldType::Integer, Value::from(" 42 ")),
            (FieldType::Long, Value::from("7 ")),
            (FieldType::Timestamp, Value::from(" 2024-03-01T00:00:00")),
        ];
        for (declared, value) in cases {
            let outcome = coerce_value(&declared, value.clone());
            assert!(outcome.failure().is_some(), "{declared:?} {value:?}");
            assert_eq!(outcome.into_value(), value);
        }
    }

    #[test]
    fn test_kinds_without_conversion_pass_silently() {
        for declared in [FieldType::Decimal, FieldType::Integer, FieldType::Long, FieldType::Timestamp] {
            let outcome = coerce_value(&declared, Value::Bool(true));
            assert_eq!(
                outcome,
                CoercionOutcome::Unchanged {
                    value: Value::Bool(true),
                    reason: None
                }
            );
        }
    }

    #[test]
    fn test_null_text_and_other_untouched() {
        for declared in [
            FieldType::Decimal,
            FieldType::Text,
            FieldType::Other("java.math.BigDecimal".into()),
        ] {
            let outcome = coerce_value(&declared, Value::Null);
            assert_eq!(outcome.failure(), None);
            assert_eq!(outcome.value(), &Value::Null);
        }
        assert_eq!(
            coerce_value(&FieldType::Text, Value::Int(1)).into_value(),
            Value::Int(1)
        );
        assert_eq!(
            coerce_value(&FieldType::Other("x".into()), Value::from("1")).into_value(),
            Value::from("1")
        );
    }

    #[test]
    fn test_coerce_records() {
        let coercer = TypeCoercer::new(&[
            field("total", FieldType::Decimal),
            field("issued", FieldType::Timestamp),
        ]);
        let records = vec![
            Record::from([
                ("total".to_string(), Value::from("19.95")),
                ("issued".to_string(), Value::from("2024-03-01T00:00:00")),
                ("note".to_string(), Value::from("unknown field")),
            ]),
            Record::from([("total".to_string(), Value::from("n/a"))]),
        ];

        let coerced = coercer.coerce(records);
        assert_eq!(
            coerced,
            vec![
                Record::from([
                    ("total".to_string(), Value::Float(19.95)),
                    ("issued".to_string(), Value::Timestamp(ts(2024, 3, 1, 0, 0, 0))),
                    ("note".to_string(), Value::from("unknown field")),
                ]),
                Record::from([("total".to_string(), Value::from("n/a"))]),
            ]
        );
    }
}
