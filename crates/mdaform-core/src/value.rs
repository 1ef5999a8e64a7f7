#![forbid(unsafe_code)]

//! Field values at the form boundary.
//!
//! Records arrive from the data layer with loosely-typed fields (strings,
//! numbers, booleans, nulls, ISO dates, nested JSON). [`Scalar`] tags each
//! value once so that change detection compares a single canonical string
//! per field instead of coercing ad hoc.
//!
//! # Canonical form
//!
//! | Tag | Canonical string |
//! |-----|------------------|
//! | `Null` | `""` |
//! | `Bool` | `"true"` / `"false"` |
//! | `Number` | shortest round-trip decimal (`3`, `2.5`) |
//! | `Text` / `Date` | the string itself |
//! | `Json` | compact JSON with object keys sorted; JSON `null` is `""` |

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// Absent value (null/undefined).
    #[default]
    Null,
    /// Boolean toggle.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// ISO-8601 date or date-time string.
    Date(String),
    /// Structured value (object or array).
    Json(Value),
}

impl Scalar {
    /// Canonical string used for snapshot comparison.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) | Self::Date(s) => s.clone(),
            Self::Json(value) => canonical_json(value),
        }
    }

    /// Whether the canonical form is non-empty.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(s) | Self::Date(s) => !s.is_empty(),
            Self::Json(Value::Null) => false,
            Self::Json(Value::String(s)) => !s.is_empty(),
            _ => true,
        }
    }

    /// Text view of the value, if it is text or a date.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Date(s) => Some(s),
            Self::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Json(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Json(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Convert into a JSON value for transport.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) | Self::Date(s) => Value::String(s.clone()),
            Self::Json(value) => value.clone(),
        }
    }

    /// Tag a string as a date.
    #[must_use]
    pub fn date(s: impl Into<String>) -> Self {
        Self::Date(s.into())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn format_number(n: f64) -> String {
    if n == 0.0 {
        // -0 and 0 compare equal; keep one spelling.
        return "0".to_string();
    }
    // f64 Display already yields the shortest round-trip form without an
    // exponent, and prints integral values without a fraction.
    n.to_string()
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::Array(_) | Value::Object(_) => {
            let mut out = String::new();
            write_sorted(value, &mut out);
            out
        }
    }
}

fn write_sorted(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_sorted(inner, out);
                }
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::Text(s),
            structured => Self::Json(structured),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldMap
// ---------------------------------------------------------------------------

/// Ordered mapping from field name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    fields: BTreeMap<String, Scalar>,
}

impl FieldMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<Scalar> {
        self.fields.remove(name)
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    /// Canonical string of a field; missing fields are `""`.
    #[must_use]
    pub fn canonical(&self, name: &str) -> String {
        self.fields.get(name).map(Scalar::canonical).unwrap_or_default()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields, populated or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields whose canonical value is non-empty.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.fields.values().filter(|v| v.is_populated()).count()
    }

    /// Copy every field of `other` over this map.
    pub fn merge(&mut self, other: &FieldMap) {
        for (k, v) in &other.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Convert into a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
