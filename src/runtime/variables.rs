//! # Variable Store
//!
//! String-keyed, string-valued storage shared by every block of a running program. Block inputs
//! carry keys into this store, never literals.

use crate::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: HashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Store a value coming from untyped data. Both sides must be JSON strings.
    pub fn set_json(&mut self, key: &Value, value: &Value) -> Result<(), StoreError> {
        let key = key.as_str().ok_or_else(|| StoreError::NotAString {
            field: "key",
            got: key.to_string(),
        })?;
        let value = value.as_str().ok_or_else(|| StoreError::NotAString {
            field: "value",
            got: value.to_string(),
        })?;
        self.set(key, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Every pair, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Replace the contents with `pairs`.
    pub fn restore(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        self.values = pairs.into_iter().collect();
    }

    /// Rebuild a store from a `[[key, value], ...]` array. Anything malformed yields an empty
    /// store.
    pub fn from_json(value: &Value) -> Self {
        match Self::try_from_json(value) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("[RUNTIME] Discarding malformed variable store: {}", e);
                Self::new()
            }
        }
    }

    fn try_from_json(value: &Value) -> Result<Self, StoreError> {
        let pairs = value.as_array().ok_or_else(|| StoreError::NotAString {
            field: "store",
            got: value.to_string(),
        })?;

        let mut store = Self::new();
        for pair in pairs {
            match pair.as_array().map(Vec::as_slice) {
                Some([key, value]) => store.set_json(key, value)?,
                _ => {
                    return Err(StoreError::NotAString {
                        field: "pair",
                        got: pair.to_string(),
                    })
                }
            }
        }
        Ok(store)
    }
}

impl Serialize for VariableStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.snapshot())
    }
}

impl<'de> Deserialize<'de> for VariableStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}
