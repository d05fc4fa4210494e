//! The aggregated result of a run and the shared-locals bag it is published into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key the aggregated mapping is published under in [`SharedLocals`].
pub const WORDPRESS_KEY: &str = "wordpress";

/// Content-type name to ordered list of stored posts. Keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultMapping(Map<String, Value>);

impl ResultMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, items: Vec<Value>) {
        self.0.insert(name.into(), Value::Array(items));
    }

    /// Stores an arbitrary value; post-transform hooks are free to reshape entries.
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Items stored under `name`, if that entry is a list.
    pub fn get(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.0.get_mut(name).and_then(Value::as_array_mut)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Data bag consumed by the templating stage.
///
/// Owned by the build and passed by `&mut` into a run; the pipeline only
/// writes to it once a run has fully succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedLocals(Map<String, Value>);

impl SharedLocals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        SharedLocals(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Sets `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Adds every key of `extra` that is not already present. Existing keys win.
    /// Returns the keys that were skipped.
    pub fn merge_missing(&mut self, extra: Map<String, Value>) -> Vec<String> {
        let mut skipped = Vec::new();
        for (key, value) in extra {
            if self.0.contains_key(&key) {
                skipped.push(key);
            } else {
                self.0.insert(key, value);
            }
        }
        skipped
    }

    /// Publishes a run's mapping under [`WORDPRESS_KEY`].
    pub fn publish(&mut self, mapping: &ResultMapping) {
        self.0.insert(WORDPRESS_KEY.to_string(), mapping.to_value());
    }

    pub fn wordpress(&self) -> Option<&Value> {
        self.0.get(WORDPRESS_KEY)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}
