//! Field flattening for nested evaluation results
//!
//! A target returns a structure of named fields whose leaves are numbers,
//! possibly nested to any depth. Statistics are kept per leaf, so the
//! structure is collapsed into a single level keyed by the ancestor names
//! joined with `_`:
//!
//! ```
//! use serde_json::json;
//! use trust_random::flatten::flatten;
//!
//! let flat = flatten(&json!({"a": {"b": 1}, "c": 2.5})).unwrap();
//! assert_eq!(flat.get("a_b"), Some(&1.0));
//! assert_eq!(flat.get("c"), Some(&2.5));
//! ```

use crate::error::{Result, TrustRandomError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Separator placed between ancestor keys
pub const PATH_SEPARATOR: &str = "_";

/// Insertion-ordered map from field path to value with unique keys
///
/// Order is the declaration order of the fields in the target's result, which
/// is what makes check failures reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<T> {
    entries: Vec<(String, T)>,
}

/// One evaluation's result collapsed to dotted-path → number
pub type FlatResult = FieldMap<f64>;

impl<T> Default for FieldMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> FieldMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a field; a key that is already present is a schema error
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(TrustRandomError::schema(format!(
                "field path '{}' occurs more than once",
                key
            )));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// True when both maps have the same key set, regardless of order
    pub fn same_keys<U>(&self, other: &FieldMap<U>) -> bool {
        self.len() == other.len() && self.keys().all(|k| other.contains_key(k))
    }

    /// First key of `self` that `other` lacks
    pub fn first_missing_in<U>(&self, other: &FieldMap<U>) -> Option<&str> {
        self.keys().find(|k| !other.contains_key(k))
    }
}

impl<T> FromIterator<(String, T)> for FieldMap<T> {
    /// Later duplicates replace earlier values in place
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            match map.entries.iter_mut().find(|(key, _)| *key == k) {
                Some(slot) => slot.1 = v,
                None => map.entries.push((k, v)),
            }
        }
        map
    }
}

impl<T> IntoIterator for FieldMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Serialize> Serialize for FieldMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FieldMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for FieldMapVisitor<T> {
    type Value = FieldMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of field paths")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = FieldMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            map.insert(key, value).map_err(serde::de::Error::custom)?;
        }
        Ok(map)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FieldMapVisitor(PhantomData))
    }
}

/// Collapse a nested result into a [`FlatResult`]
///
/// The root must be a structure of named fields. Every leaf must be a number;
/// strings, booleans, nulls and sequences are schema errors, as is a joined
/// path that collides with another (e.g. `a_b` next to `a: {b}`).
pub fn flatten(result: &Value) -> Result<FlatResult> {
    let Value::Object(fields) = result else {
        return Err(TrustRandomError::schema(format!(
            "result must be a structure of named fields, got {}",
            kind_of(result)
        )));
    };
    let mut flat = FlatResult::with_capacity(fields.len());
    flatten_into(fields, "", &mut flat)?;
    Ok(flat)
}

fn flatten_into(
    fields: &serde_json::Map<String, Value>,
    prefix: &str,
    out: &mut FlatResult,
) -> Result<()> {
    for (key, value) in fields {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, PATH_SEPARATOR, key)
        };
        match value {
            Value::Object(nested) => flatten_into(nested, &path, out)?,
            Value::Number(n) => {
                let number = n.as_f64().ok_or_else(|| {
                    TrustRandomError::schema(format!("field '{}' is not representable as f64", path))
                })?;
                out.insert(path, number)?;
            }
            other => {
                return Err(TrustRandomError::schema(format!(
                    "field '{}' has non-numeric leaf of type {}",
                    path,
                    kind_of(other)
                )))
            }
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "structure",
    }
}
