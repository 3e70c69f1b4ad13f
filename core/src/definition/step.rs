//! Flow steps
//!
//! A step is a YAML mapping whose leading key names its kind:
//!
//! ```yaml
//! - log: "Hello ${name}"
//! - call: other_flow
//! - if: "${x == 'y'}"
//!   then: [...]
//!   else: [...]
//! - set:
//!     a: "${b}"
//! - script: my_script
//!   in: { key: value }
//! - task: http
//!   in: { url: "..." }
//!   out: response
//! - return
//! ```

use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::BTreeMap;

use crate::values::Val;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Log {
        message: String,
    },
    Call {
        flow: String,
    },
    If {
        condition: String,
        then: Vec<Step>,
        otherwise: Vec<Step>,
    },
    Set {
        vars: BTreeMap<String, Val>,
    },
    Script {
        name: String,
        input: BTreeMap<String, Val>,
    },
    Task {
        name: String,
        input: BTreeMap<String, Val>,
        out: Option<String>,
    },
    Return,
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Log { .. } => "log",
            Step::Call { .. } => "call",
            Step::If { .. } => "if",
            Step::Set { .. } => "set",
            Step::Script { .. } => "script",
            Step::Task { .. } => "task",
            Step::Return => "return",
        }
    }

    /// Build a step from its YAML form
    pub fn from_yaml(value: &Yaml) -> Result<Step, String> {
        let map = match value {
            Yaml::String(s) if s == "return" => return Ok(Step::Return),
            Yaml::Mapping(map) => map,
            other => return Err(format!("Step must be a mapping, got {:?}", other)),
        };

        if let Some(v) = map.get("log") {
            return Ok(Step::Log {
                message: scalar(v, "log")?,
            });
        }
        if let Some(v) = map.get("call") {
            return Ok(Step::Call {
                flow: scalar(v, "call")?,
            });
        }
        if let Some(v) = map.get("if") {
            let then = map
                .get("then")
                .ok_or_else(|| "'if' step requires 'then'".to_string())?;
            return Ok(Step::If {
                condition: scalar(v, "if")?,
                then: steps(then)?,
                otherwise: map.get("else").map(steps).transpose()?.unwrap_or_default(),
            });
        }
        if let Some(v) = map.get("set") {
            return Ok(Step::Set {
                vars: values(v, "set")?,
            });
        }
        if let Some(v) = map.get("script") {
            return Ok(Step::Script {
                name: scalar(v, "script")?,
                input: optional_values(map, "in")?,
            });
        }
        if let Some(v) = map.get("task") {
            return Ok(Step::Task {
                name: scalar(v, "task")?,
                input: optional_values(map, "in")?,
                out: map.get("out").map(|o| scalar(o, "out")).transpose()?,
            });
        }

        Err(format!("Unsupported step with keys: {}", describe_keys(map)))
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Yaml::deserialize(deserializer)?;
        Step::from_yaml(&value).map_err(serde::de::Error::custom)
    }
}

/* ===================== YAML Helpers ===================== */

fn scalar(value: &Yaml, field: &str) -> Result<String, String> {
    match value {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        _ => Err(format!("'{}' must be a scalar", field)),
    }
}

fn steps(value: &Yaml) -> Result<Vec<Step>, String> {
    match value {
        Yaml::Sequence(items) => items.iter().map(Step::from_yaml).collect(),
        Yaml::Null => Ok(Vec::new()),
        _ => Err("Expected a sequence of steps".to_string()),
    }
}

fn values(value: &Yaml, field: &str) -> Result<BTreeMap<String, Val>, String> {
    match Val::from(value) {
        Val::Map(map) if matches!(value, Yaml::Mapping(_)) => Ok(map),
        _ => Err(format!("'{}' must be a mapping", field)),
    }
}

fn optional_values(map: &Mapping, field: &str) -> Result<BTreeMap<String, Val>, String> {
    map.get(field)
        .map(|v| values(v, field))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn describe_keys(map: &Mapping) -> String {
    map.keys()
        .filter_map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Vec<Step>, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_parse_all_kinds() {
        let steps = parse(
            r#"
- log: "Hello ${name}"
- call: other
- if: "${x == 'y'}"
  then:
    - set:
        a: "${b}"
  else:
    - return
- script: greet
  in:
    who: world
- task: http
  in:
    url: "https://example.com"
  out: response
"#,
        )
        .unwrap();

        let kinds: Vec<&str> = steps.iter().map(Step::kind).collect();
        assert_eq!(kinds, vec!["log", "call", "if", "script", "task"]);

        match &steps[2] {
            Step::If {
                condition,
                then,
                otherwise,
            } => {
                assert_eq!(condition, "${x == 'y'}");
                assert_eq!(then.len(), 1);
                assert_eq!(otherwise, &vec![Step::Return]);
            }
            other => panic!("expected if, got {:?}", other),
        }

        match &steps[4] {
            Step::Task { out, input, .. } => {
                assert_eq!(out.as_deref(), Some("response"));
                assert_eq!(input["url"], Val::from("https://example.com"));
            }
            other => panic!("expected task, got {:?}", other),
        }
    }

    #[test]
    fn test_if_without_then() {
        let err = parse("- if: \"${x}\"\n").unwrap_err();
        assert!(err.to_string().contains("requires 'then'"));
    }

    #[test]
    fn test_unsupported_step() {
        let err = parse("- parallel: []\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported step with keys: parallel"));
    }

    #[test]
    fn test_set_requires_mapping() {
        let err = parse("- set: [1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("'set' must be a mapping"));
    }
}
