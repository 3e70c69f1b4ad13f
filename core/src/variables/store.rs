//! Variable store seam
//!
//! The host owns the store; the accessor only reads through this trait. A
//! stored `Val::Null` is indistinguishable from an absent key.

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

use crate::values::Val;

/// Untyped, string-keyed storage for one process instance
pub trait VariableStore: Send {
    /// Raw stored value, `None` when absent
    fn get(&self, key: &str) -> Option<Val>;

    fn set(&mut self, key: &str, value: Val);

    fn remove(&mut self, key: &str) -> Option<Val>;

    /// Keys with a non-null value, in a stable order
    fn keys(&self) -> Vec<String>;
}

/* ===================== In-Memory Store ===================== */

/// In-memory store used by the reference host and tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapStore {
    entries: BTreeMap<String, Val>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object; non-object input yields an empty store
    pub fn from_json(value: &JsonValue) -> Self {
        match Val::from(value) {
            Val::Map(map) => map.into_iter().collect(),
            _ => Self::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every entry
    pub fn to_map(&self) -> BTreeMap<String, Val> {
        self.entries.clone()
    }
}

impl VariableStore for MapStore {
    fn get(&self, key: &str) -> Option<Val> {
        self.entries.get(key).filter(|v| !v.is_null()).cloned()
    }

    fn set(&mut self, key: &str, value: Val) {
        if value.is_null() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), value);
        }
    }

    fn remove(&mut self, key: &str) -> Option<Val> {
        self.entries.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl FromIterator<(String, Val)> for MapStore {
    fn from_iter<I: IntoIterator<Item = (String, Val)>>(iter: I) -> Self {
        let mut store = MapStore::new();
        for (key, value) in iter {
            store.set(&key, value);
        }
        store
    }
}

impl From<HashMap<String, Val>> for MapStore {
    fn from(map: HashMap<String, Val>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, Val>> for MapStore {
    fn from(map: BTreeMap<String, Val>) -> Self {
        map.into_iter().collect()
    }
}
