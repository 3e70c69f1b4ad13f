//! Runtime value types
//!
//! `Val` is the typed view of a single entry in a process instance's variable
//! store. The host hands values over untyped (JSON or YAML); conversion into
//! `Val` only tags them, it never coerces.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/* ===================== Values ===================== */

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Num(f64),
    Str(String),
    Uuid(Uuid),
    /// Ordered sequence
    List(Vec<Val>),
    /// Unordered collection; iteration order carries no meaning
    Set(Vec<Val>),
    Map(BTreeMap<String, Val>),
}

/// Type tag of a stored value, named the way scripts see it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValKind {
    Null,
    String,
    Number,
    Boolean,
    Int,
    Long,
    Uuid,
    Collection,
    Map,
    List,
}

impl fmt::Display for ValKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValKind::Null => "Null",
            ValKind::String => "String",
            ValKind::Number => "Number",
            ValKind::Boolean => "Boolean",
            ValKind::Int => "Int",
            ValKind::Long => "Long",
            ValKind::Uuid => "UUID",
            ValKind::Collection => "Collection",
            ValKind::Map => "Map",
            ValKind::List => "List",
        };
        f.write_str(name)
    }
}

impl Val {
    pub fn kind(&self) -> ValKind {
        match self {
            Val::Null => ValKind::Null,
            Val::Bool(_) => ValKind::Boolean,
            Val::Int(_) => ValKind::Int,
            Val::Long(_) => ValKind::Long,
            Val::Num(_) => ValKind::Number,
            Val::Str(_) => ValKind::String,
            Val::Uuid(_) => ValKind::Uuid,
            Val::List(_) => ValKind::List,
            Val::Set(_) => ValKind::Collection,
            Val::Map(_) => ValKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Null => false,
            _ => true,
        }
    }

    /// Numeric view used by comparisons; `None` for non-numeric values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Val::Int(i) => Some(*i as f64),
            Val::Long(l) => Some(*l as f64),
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to JSON for publishing results
    ///
    /// UUIDs become their hyphenated string, sets become arrays and
    /// non-finite numbers become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => JsonValue::Bool(*b),
            Val::Int(i) => JsonValue::from(*i),
            Val::Long(l) => JsonValue::from(*l),
            Val::Num(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Val::Str(s) => JsonValue::String(s.clone()),
            Val::Uuid(u) => JsonValue::String(u.to_string()),
            Val::List(items) | Val::Set(items) => {
                JsonValue::Array(items.iter().map(Val::to_json).collect())
            }
            Val::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/* ===================== Host Conversions ===================== */

fn int_or_long(i: i64) -> Val {
    match i32::try_from(i) {
        Ok(small) => Val::Int(small),
        Err(_) => Val::Long(i),
    }
}

impl From<&JsonValue> for Val {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Val::Null,
            JsonValue::Bool(b) => Val::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => int_or_long(i),
                None => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Val::Str(s.clone()),
            JsonValue::Array(items) => Val::List(items.iter().map(Val::from).collect()),
            JsonValue::Object(map) => Val::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Val::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for Val {
    fn from(value: JsonValue) -> Self {
        Val::from(&value)
    }
}

impl From<&serde_yaml::Value> for Val {
    fn from(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Val::Null,
            Yaml::Bool(b) => Val::Bool(*b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => int_or_long(i),
                None => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            },
            Yaml::String(s) => Val::Str(s.clone()),
            Yaml::Sequence(items) => Val::List(items.iter().map(Val::from).collect()),
            Yaml::Mapping(map) => Val::Map(
                map.iter()
                    .filter_map(|(k, v)| yaml_key(k).map(|key| (key, Val::from(v))))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Val::from(&tagged.value),
        }
    }
}

/// Mapping keys must be scalars; anything else is dropped
fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<i32> for Val {
    fn from(i: i32) -> Self {
        Val::Int(i)
    }
}

impl From<i64> for Val {
    fn from(l: i64) -> Self {
        Val::Long(l)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<Uuid> for Val {
    fn from(u: Uuid) -> Self {
        Val::Uuid(u)
    }
}

impl From<Vec<Val>> for Val {
    fn from(items: Vec<Val>) -> Self {
        Val::List(items)
    }
}

impl From<BTreeMap<String, Val>> for Val {
    fn from(map: BTreeMap<String, Val>) -> Self {
        Val::Map(map)
    }
}

/// Text form used for `${...}` interpolation and log formatting
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => f.write_str("null"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Int(i) => write!(f, "{}", i),
            Val::Long(l) => write!(f, "{}", l),
            Val::Num(n) => write!(f, "{}", n),
            Val::Str(s) => f.write_str(s),
            Val::Uuid(u) => write!(f, "{}", u),
            Val::List(_) | Val::Set(_) | Val::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}
