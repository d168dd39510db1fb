//! Draft store — the accumulating field map for one wizard run.
//!
//! Drafts are values: `merge` and `reset` return a new draft and leave the
//! original untouched, which is what lets the controller validate a
//! speculative merge and simply drop it on failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name → value, scoped to one flow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    fields: BTreeMap<String, Value>,
}

impl Draft {
    /// An empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a draft from a JSON object. Anything other than an object is an error.
    pub fn from_object(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Builder-style insert, handy for hosts assembling a partial update.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of a field, if it holds one.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Whether a field is absent or holds an empty value (null, blank string,
    /// empty array or object).
    pub fn is_blank(&self, field: &str) -> bool {
        self.fields.get(field).is_none_or(is_blank_value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow field-level merge. Values in `partial` overwrite values for the
    /// same key; keys absent from `partial` are kept as they are.
    pub fn merge(&self, partial: &Draft) -> Draft {
        let mut fields = self.fields.clone();
        for (k, v) in &partial.fields {
            fields.insert(k.clone(), v.clone());
        }
        Draft { fields }
    }

    /// Remove the given fields. Unknown names are ignored.
    pub fn reset<I, S>(&self, fields: I) -> Draft
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.fields.clone();
        for f in fields {
            next.remove(f.as_ref());
        }
        Draft { fields: next }
    }

    /// The subset of this draft covering only `fields`.
    pub fn slice<I, S>(&self, fields: I) -> Draft
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = fields
            .into_iter()
            .filter_map(|f| {
                let f = f.as_ref();
                self.fields.get(f).map(|v| (f.to_string(), v.clone()))
            })
            .collect();
        Draft { fields }
    }

    /// Fields of `partial` whose value differs from what this draft holds.
    pub fn changed_by<'a>(&self, partial: &'a Draft) -> Vec<&'a str> {
        partial
            .fields
            .iter()
            .filter(|(k, v)| self.fields.get(*k) != Some(*v))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl From<serde_json::Map<String, Value>> for Draft {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Draft {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

pub(crate) fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
