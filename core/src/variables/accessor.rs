//! Typed variable accessor
//!
//! Wraps one process instance's store and exposes it through typed lenses.
//! Every type has two forms sharing the same coercion:
//!
//! - `get_*(key, default)` returns the default only when the key is absent
//! - `assert_*(key, message)` fails with `MissingVariable` when absent
//!
//! Both fail with `TypeMismatch` when the value is present but not coercible.
//! Getters never mutate the store.

use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::coerce;
use super::store::{MapStore, VariableStore};
use crate::errors::{BridgeError, BridgeResult};
use crate::values::{Val, ValKind};

pub struct Variables {
    store: Box<dyn VariableStore>,
}

impl Variables {
    pub fn new(store: impl VariableStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /* ===================== Raw Access ===================== */

    /// Raw stored value; `None` is the absent marker
    pub fn get(&self, key: &str) -> Option<Val> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.get(key).is_some()
    }

    /// Host-side write; storing `Val::Null` removes the key
    pub fn set(&mut self, key: &str, value: impl Into<Val>) {
        self.store.set(key, value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Val> {
        self.store.remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Snapshot of every present entry, used as an evaluation scope
    pub fn to_map(&self) -> BTreeMap<String, Val> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|key| self.store.get(&key).map(|v| (key, v)))
            .collect()
    }

    /* ===================== Shared Rules ===================== */

    fn typed<T>(
        &self,
        key: &str,
        default: Option<T>,
        expected: ValKind,
        convert: fn(&Val) -> Option<T>,
    ) -> BridgeResult<Option<T>> {
        match self.store.get(key) {
            None => Ok(default),
            Some(val) => convert(&val)
                .map(Some)
                .ok_or_else(|| BridgeError::mismatch(key, expected, val.kind())),
        }
    }

    fn asserted<T>(
        &self,
        key: &str,
        message: Option<&str>,
        expected: ValKind,
        convert: fn(&Val) -> Option<T>,
    ) -> BridgeResult<T> {
        let val = self
            .store
            .get(key)
            .ok_or_else(|| BridgeError::missing(key, message))?;
        convert(&val).ok_or_else(|| BridgeError::mismatch(key, expected, val.kind()))
    }

    /* ===================== String ===================== */

    pub fn get_string(&self, key: &str, default: Option<String>) -> BridgeResult<Option<String>> {
        self.typed(key, default, ValKind::String, coerce::to_string)
    }

    pub fn assert_string(&self, key: &str, message: Option<&str>) -> BridgeResult<String> {
        self.asserted(key, message, ValKind::String, coerce::to_string)
    }

    /* ===================== Number ===================== */

    pub fn get_number(&self, key: &str, default: Option<f64>) -> BridgeResult<Option<f64>> {
        self.typed(key, default, ValKind::Number, coerce::to_number)
    }

    pub fn assert_number(&self, key: &str, message: Option<&str>) -> BridgeResult<f64> {
        self.asserted(key, message, ValKind::Number, coerce::to_number)
    }

    /* ===================== Boolean ===================== */

    pub fn get_boolean(&self, key: &str, default: Option<bool>) -> BridgeResult<Option<bool>> {
        self.typed(key, default, ValKind::Boolean, coerce::to_boolean)
    }

    pub fn assert_boolean(&self, key: &str, message: Option<&str>) -> BridgeResult<bool> {
        self.asserted(key, message, ValKind::Boolean, coerce::to_boolean)
    }

    /* ===================== Int / Long ===================== */

    pub fn get_int(&self, key: &str, default: Option<i32>) -> BridgeResult<Option<i32>> {
        self.typed(key, default, ValKind::Int, coerce::to_int)
    }

    pub fn assert_int(&self, key: &str, message: Option<&str>) -> BridgeResult<i32> {
        self.asserted(key, message, ValKind::Int, coerce::to_int)
    }

    pub fn get_long(&self, key: &str, default: Option<i64>) -> BridgeResult<Option<i64>> {
        self.typed(key, default, ValKind::Long, coerce::to_long)
    }

    pub fn assert_long(&self, key: &str, message: Option<&str>) -> BridgeResult<i64> {
        self.asserted(key, message, ValKind::Long, coerce::to_long)
    }

    /* ===================== UUID ===================== */

    pub fn get_uuid(&self, key: &str, default: Option<Uuid>) -> BridgeResult<Option<Uuid>> {
        self.typed(key, default, ValKind::Uuid, coerce::to_uuid)
    }

    pub fn assert_uuid(&self, key: &str, message: Option<&str>) -> BridgeResult<Uuid> {
        self.asserted(key, message, ValKind::Uuid, coerce::to_uuid)
    }

    /* ===================== Containers ===================== */

    /// Accepts lists and unordered collections
    pub fn get_collection(
        &self,
        key: &str,
        default: Option<Vec<Val>>,
    ) -> BridgeResult<Option<Vec<Val>>> {
        self.typed(key, default, ValKind::Collection, coerce::to_collection)
    }

    pub fn assert_collection(&self, key: &str, message: Option<&str>) -> BridgeResult<Vec<Val>> {
        self.asserted(key, message, ValKind::Collection, coerce::to_collection)
    }

    pub fn get_map(
        &self,
        key: &str,
        default: Option<BTreeMap<String, Val>>,
    ) -> BridgeResult<Option<BTreeMap<String, Val>>> {
        self.typed(key, default, ValKind::Map, coerce::to_map)
    }

    pub fn assert_map(
        &self,
        key: &str,
        message: Option<&str>,
    ) -> BridgeResult<BTreeMap<String, Val>> {
        self.asserted(key, message, ValKind::Map, coerce::to_map)
    }

    pub fn get_list(&self, key: &str, default: Option<Vec<Val>>) -> BridgeResult<Option<Vec<Val>>> {
        self.typed(key, default, ValKind::List, coerce::to_list)
    }

    pub fn assert_list(&self, key: &str, message: Option<&str>) -> BridgeResult<Vec<Val>> {
        self.asserted(key, message, ValKind::List, coerce::to_list)
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new(MapStore::new())
    }
}

impl From<MapStore> for Variables {
    fn from(store: MapStore) -> Self {
        Self::new(store)
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variables")
            .field("keys", &self.store.keys())
            .finish()
    }
}
