//! Scalar values for placeholder parameters and result columns

use rusqlite::types::ValueRef;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Plain rendering, used verbatim by `@{key}` placeholders.
    pub fn to_raw_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(bytes) => blob_literal(bytes),
            Value::Boolean(b) => String::from(if *b { "1" } else { "0" }),
        }
    }

    /// Literal rendering, used by `{key}` placeholders.
    ///
    /// Text is double-quoted with embedded quotes doubled so the value stays
    /// one token.
    pub fn to_quoted_sql(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
            other => other.to_raw_sql(),
        }
    }
}

fn blob_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for byte in bytes {
        let _ = write!(out, "{:02X}", byte);
    }
    out.push('\'');
    out
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(bytes) => serializer.serialize_bytes(bytes),
            Value::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Named parameters for one templating pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: HashMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Look up a value, exact key first, then ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| {
            self.values
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }
}

impl From<HashMap<String, Value>> for Params {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_rendering() {
        assert_eq!(Value::from(21).to_quoted_sql(), "21");
        assert_eq!(Value::from(2.5).to_quoted_sql(), "2.5");
        assert_eq!(Value::from("steve").to_quoted_sql(), "\"steve\"");
        assert_eq!(Value::from("say \"hi\"").to_quoted_sql(), "\"say \"\"hi\"\"\"");
        assert_eq!(Value::from(true).to_quoted_sql(), "1");
        assert_eq!(Value::Null.to_quoted_sql(), "NULL");
        assert_eq!(Value::from(vec![0x0a_u8, 0xff]).to_quoted_sql(), "X'0AFF'");
    }

    #[test]
    fn test_raw_rendering_leaves_text_bare() {
        assert_eq!(Value::from("developer").to_raw_sql(), "developer");
        assert_eq!(Value::from(None::<i64>).to_raw_sql(), "NULL");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let params = Params::new().with_value("Name", "kim");
        assert_eq!(params.lookup("name"), Some(&Value::from("kim")));
        assert_eq!(params.lookup("NAME"), Some(&Value::from("kim")));
        assert_eq!(params.lookup("age"), None);
    }

    #[test]
    fn test_exact_key_wins() {
        let params: Params = vec![("name", "lower"), ("NAME", "upper")].into_iter().collect();
        assert_eq!(params.lookup("NAME"), Some(&Value::from("upper")));
        assert_eq!(params.lookup("name"), Some(&Value::from("lower")));
    }

    #[test]
    fn test_accessors() {
        assert!(Value::from(None::<&str>).is_null());
        assert!(!Value::from(0).is_null());
        assert_eq!(Value::from(7).as_i64(), Some(7));
        assert_eq!(Value::from(true).as_i64(), Some(1));
        assert_eq!(Value::from("7").as_i64(), None);
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_params_builder() {
        let params = Params::new();
        assert!(params.is_empty());
        let params = params.with_value("name", "kim").with_value("age", 25);
        assert_eq!(params.len(), 2);
        // rebinding a key replaces the value
        let params = params.with_value("age", 26);
        assert_eq!(params.len(), 2);
        assert_eq!(params.lookup("age").and_then(Value::as_i64), Some(26));
    }

    #[test]
    fn test_value_ref_conversion() {
        assert_eq!(Value::from(ValueRef::Integer(7)), Value::Integer(7));
        assert_eq!(Value::from(ValueRef::Text(b"abc")), Value::from("abc"));
        assert_eq!(Value::from(ValueRef::Null), Value::Null);
    }
}
