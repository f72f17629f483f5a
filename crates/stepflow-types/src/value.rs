//! Dynamically-typed field values carried by a [`Record`](crate::record::Record).
//!
//! [`Value`] is a closed sum over the scalar kinds the engine understands plus
//! a flat list of scalars. Conversion to and from the canonical JSON text form
//! lives here so the record codec stays a thin map-level wrapper.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::record::RecordError;

/// Object key marking a base64-encoded binary value in the text encoding.
pub const BINARY_TAG: &str = "$binary";

/// Object key marking an RFC 3339 date-time in the text encoding.
pub const DATETIME_TAG: &str = "$datetime";

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Bool(bool),
    Integer(i64),
    Real(f64),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    /// Ordered list of scalars. Nested lists are not representable in the
    /// text encoding and are rejected on decode.
    List(Vec<Value>),
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    String,
    Bool,
    Integer,
    Real,
    DateTime,
    Binary,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "null",
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::DateTime => "date-time",
            Self::Binary => "binary",
            Self::List => "list",
        };
        f.write_str(s)
    }
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Real(_) => ValueKind::Real,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Binary(_) => ValueKind::Binary,
            Self::List(_) => ValueKind::List,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical JSON form of this value.
    ///
    /// Non-finite reals have no JSON representation and encode as `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::String(s) => Json::String(s.clone()),
            Self::Bool(b) => Json::Bool(*b),
            Self::Integer(i) => Json::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r).map_or(Json::Null, Json::Number),
            Self::DateTime(dt) => tagged(DATETIME_TAG, dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Binary(bytes) => tagged(BINARY_TAG, STANDARD.encode(bytes)),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Decode one field of an encoded record. `key` is only used for errors.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnsupportedValue`] for nested objects (other than
    /// the binary and date-time tags), nested lists, or a malformed tagged
    /// payload.
    pub fn from_json(key: &str, json: serde_json::Value) -> Result<Self, RecordError> {
        match json {
            serde_json::Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_array() {
                        return Err(RecordError::UnsupportedValue {
                            key: key.to_string(),
                            reason: "nested lists are not supported".to_string(),
                        });
                    }
                    values.push(Self::scalar_from_json(key, item)?);
                }
                Ok(Self::List(values))
            }
            other => Self::scalar_from_json(key, other),
        }
    }

    fn scalar_from_json(key: &str, json: serde_json::Value) -> Result<Self, RecordError> {
        use serde_json::Value as Json;

        match json {
            Json::Null => Ok(Self::Null),
            Json::Bool(b) => Ok(Self::Bool(b)),
            Json::Number(n) => Ok(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Json::String(s) => Ok(Self::String(s)),
            Json::Object(map) => {
                let unsupported = |reason: &str| RecordError::UnsupportedValue {
                    key: key.to_string(),
                    reason: reason.to_string(),
                };
                if map.len() != 1 {
                    return Err(unsupported("nested objects are not supported"));
                }
                match (map.get(BINARY_TAG), map.get(DATETIME_TAG)) {
                    (Some(Json::String(encoded)), _) => STANDARD
                        .decode(encoded)
                        .map(Self::Binary)
                        .map_err(|e| unsupported(&format!("invalid base64 payload: {e}"))),
                    (_, Some(Json::String(text))) => DateTime::parse_from_rfc3339(text)
                        .map(|dt| Self::DateTime(dt.with_timezone(&Utc)))
                        .map_err(|e| unsupported(&format!("invalid RFC 3339 date-time: {e}"))),
                    _ => Err(unsupported("nested objects are not supported")),
                }
            }
            Json::Array(_) => Err(RecordError::UnsupportedValue {
                key: key.to_string(),
                reason: "nested lists are not supported".to_string(),
            }),
        }
    }
}

fn tagged(tag: &str, payload: String) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(tag.to_string(), serde_json::Value::String(payload));
    serde_json::Value::Object(map)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integer_and_real_stay_distinct() {
        let int = Value::from_json("n", serde_json::json!(1)).unwrap();
        let real = Value::from_json("n", Value::Real(1.0).to_json()).unwrap();
        assert_eq!(int, Value::Integer(1));
        assert_eq!(real, Value::Real(1.0));
    }

    #[test]
    fn date_time_uses_tagged_object() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let json = Value::DateTime(expected).to_json();
        assert_eq!(json, serde_json::json!({"$datetime": "2024-01-15T10:30:00Z"}));
        assert_eq!(Value::from_json("at", json).unwrap(), Value::DateTime(expected));
    }

    #[test]
    fn rfc3339_text_stays_a_string() {
        let value = Value::from_json("note", serde_json::json!("2024-01-15T10:30:00Z")).unwrap();
        assert_eq!(value, Value::from("2024-01-15T10:30:00Z"));
    }

    #[test]
    fn offset_date_times_normalise_to_utc() {
        let value =
            Value::from_json("at", serde_json::json!({"$datetime": "2024-01-15T12:30:00+02:00"})).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(value, Value::DateTime(expected));
    }

    #[test]
    fn malformed_date_time_tag_rejected() {
        let err = Value::from_json("at", serde_json::json!({"$datetime": "yesterday"})).unwrap_err();
        assert!(err.to_string().contains("RFC 3339"), "got: {err}");
    }

    #[test]
    fn binary_uses_tagged_object() {
        let value = Value::Binary(vec![0, 159, 255]);
        let json = value.to_json();
        assert!(json.get(BINARY_TAG).is_some());
        assert_eq!(Value::from_json("b", json).unwrap(), value);
    }

    #[test]
    fn nested_object_rejected() {
        let err = Value::from_json("o", serde_json::json!({"a": 1})).unwrap_err();
        assert!(err.to_string().contains("nested objects"), "got: {err}");
    }

    #[test]
    fn nested_list_rejected() {
        let err = Value::from_json("l", serde_json::json!([[1], [2]])).unwrap_err();
        assert!(err.to_string().contains("nested lists"), "got: {err}");
    }

    #[test]
    fn non_finite_real_encodes_as_null() {
        assert_eq!(Value::Real(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn display_strings_unquoted() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
