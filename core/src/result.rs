//! Result sink
//!
//! Scripts publish key/value results here. The host reads them only after the
//! script returns; the last write for a key wins.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::values::Val;

/// Write-only channel from a script back to the host
pub trait ResultSink {
    fn set(&mut self, key: &str, value: Val);
}

/// Result entries collected during one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptResult {
    entries: BTreeMap<String, Val>,
}

impl ScriptResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, Val> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, Val> {
        self.entries
    }

    /// Published form handed to the host
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl ResultSink for ScriptResult {
    fn set(&mut self, key: &str, value: Val) {
        self.entries.insert(key.to_string(), value);
    }
}
