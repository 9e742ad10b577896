//! Persisted benchmark history
//!
//! On disk a store is one JSON document:
//!
//! ```json
//! {
//!   "coin_tosser": [
//!     { "n": 10, "stats": { "no_of_heads": { "mean": 5.02, "st_dev": 1.58 } } }
//!   ]
//! }
//! ```
//!
//! Parameter values sit next to `stats` in each record, in declaration order.
//! A save always replaces the whole document; there is no merging.

use crate::error::{Result, TrustRandomError};
use crate::flatten::FieldMap;
use crate::grid::{ParamValue, ParameterTuple};
use crate::target::{Target, RESERVED_PARAMETER};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;

/// Mean and population standard deviation of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean: f64,
    pub st_dev: f64,
}

impl FieldStats {
    pub fn new(mean: f64, st_dev: f64) -> Self {
        Self { mean, st_dev }
    }

    /// `[mean - k*st_dev, mean + k*st_dev]`
    pub fn bounds(&self, acceptable_st_devs: f64) -> (f64, f64) {
        let spread = acceptable_st_devs * self.st_dev;
        (self.mean - spread, self.mean + spread)
    }
}

/// Statistics of one target at one grid point
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    parameters: FieldMap<ParamValue>,
    stats: FieldMap<FieldStats>,
}

impl BenchmarkRecord {
    pub fn new(parameters: FieldMap<ParamValue>, stats: FieldMap<FieldStats>) -> Self {
        Self { parameters, stats }
    }

    /// Record for `tuple` using the target's parameter names
    pub fn for_tuple(target: &Target, tuple: &ParameterTuple, stats: FieldMap<FieldStats>) -> Self {
        let parameters = target
            .parameters()
            .iter()
            .zip(tuple.values())
            .map(|(decl, value)| (decl.name.clone(), *value))
            .collect();
        Self { parameters, stats }
    }

    pub fn parameters(&self) -> &FieldMap<ParamValue> {
        &self.parameters
    }

    pub fn stats(&self) -> &FieldMap<FieldStats> {
        &self.stats
    }

    /// Rebuild the parameter tuple in the target's declaration order
    ///
    /// Values are coerced to the declared kinds; a missing, extra or
    /// ill-typed parameter means the record was produced for a different
    /// signature and is a schema error.
    pub fn tuple_for(&self, target: &Target) -> Result<ParameterTuple> {
        if self.parameters.len() != target.parameters().len() {
            return Err(TrustRandomError::schema(format!(
                "record has {} parameters, target declares {}",
                self.parameters.len(),
                target.parameters().len()
            ))
            .at(target.name(), &self.describe()));
        }
        let mut values = Vec::with_capacity(self.parameters.len());
        for decl in target.parameters() {
            let value = self
                .parameters
                .get(&decl.name)
                .and_then(|v| v.coerce(decl.kind))
                .ok_or_else(|| {
                    TrustRandomError::schema(format!(
                        "record lacks a {} value for parameter '{}'",
                        decl.kind, decl.name
                    ))
                    .at(target.name(), &self.describe())
                })?;
            values.push(value);
        }
        Ok(ParameterTuple::new(values))
    }

    /// `(n=10, p=0.5)` rendering of the stored parameters
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .parameters
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("({})", parts.join(", "))
    }
}

impl Serialize for BenchmarkRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parameters.len() + 1))?;
        for (name, value) in self.parameters.iter() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(RESERVED_PARAMETER, &self.stats)?;
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = BenchmarkRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a benchmark record with parameter values and a stats map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut parameters = FieldMap::new();
        let mut stats = None;
        while let Some(key) = access.next_key::<String>()? {
            if key == RESERVED_PARAMETER {
                if stats.is_some() {
                    return Err(serde::de::Error::duplicate_field(RESERVED_PARAMETER));
                }
                stats = Some(access.next_value::<FieldMap<FieldStats>>()?);
            } else {
                let value = access.next_value::<ParamValue>()?;
                parameters.insert(key, value).map_err(serde::de::Error::custom)?;
            }
        }
        let stats = stats.ok_or_else(|| serde::de::Error::missing_field(RESERVED_PARAMETER))?;
        Ok(BenchmarkRecord { parameters, stats })
    }
}

impl<'de> Deserialize<'de> for BenchmarkRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Function name → records in grid order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkStore {
    functions: FieldMap<Vec<BenchmarkRecord>>,
}

impl BenchmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the records of one function; each function appears once
    pub fn insert(&mut self, function: impl Into<String>, records: Vec<BenchmarkRecord>) -> Result<()> {
        let function = function.into();
        self.functions
            .insert(function.clone(), records)
            .map_err(|_| TrustRandomError::Config(format!("function '{}' already stored", function)))
    }

    pub fn records(&self, function: &str) -> Option<&[BenchmarkRecord]> {
        self.functions.get(function).map(Vec::as_slice)
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vec<BenchmarkRecord>)> {
        self.functions.iter()
    }

    /// Total number of records across all functions
    pub fn len(&self) -> usize {
        self.functions.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let store = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded benchmark store");
        Ok(store)
    }

    /// Write the store, replacing anything at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        tracing::info!(path = %path.display(), records = self.len(), "saved benchmark store");
        Ok(())
    }
}
