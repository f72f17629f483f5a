//! Flat key/value records and their canonical text encoding.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

static NULL: Value = Value::Null;

/// Errors raised by record access and the record codec.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// `get` on a key the record does not hold.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The text is not valid JSON.
    #[error("malformed record encoding: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The text is valid JSON but not an object.
    #[error("encoded record must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A field holds a shape the flat record model cannot represent.
    #[error("field '{key}': {reason}")]
    UnsupportedValue { key: String, reason: String },
}

/// A dynamically-typed, flat record.
///
/// Keys are case-sensitive and unique. Field order carries no meaning; the
/// backing map is ordered only so that [`Record::encode`] is canonical.
///
/// `Clone` is the copy operation: the clone owns its own map, so adding,
/// replacing or removing keys on one copy never shows through another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Borrow the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::KeyNotFound`] if the key is absent.
    pub fn get(&self, key: &str) -> Result<&Value, RecordError> {
        self.fields
            .get(key)
            .ok_or_else(|| RecordError::KeyNotFound(key.to_string()))
    }

    /// Like [`Record::get`], but an absent key reads as [`Value::Null`].
    #[must_use]
    pub fn value_or_null(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }

    /// Insert or replace a field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical text form: a JSON object with keys in sorted order.
    #[must_use]
    pub fn encode(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    /// Parse the text form produced by [`Record::encode`] (or any flat JSON
    /// object).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the text is not a JSON object or a field
    /// holds a nested structure.
    pub fn decode(text: &str) -> Result<Self, RecordError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        let map = match json {
            serde_json::Value::Object(map) => map,
            other => return Err(RecordError::NotAnObject(json_kind(&other))),
        };
        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let value = Value::from_json(&key, value)?;
            fields.insert(key, value);
        }
        Ok(Self { fields })
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
