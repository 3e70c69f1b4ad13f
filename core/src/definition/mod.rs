//! Process definition documents
//!
//! A definition is a YAML document with three top-level sections:
//!
//! - `resources.concord`: glob patterns locating additional fragments
//! - `configuration`: runtime identifier and pre-bound `arguments`
//! - `flows`: flow name to ordered list of steps
//!
//! Documents are produced externally (by hand or by the stress generator)
//! and consumed by the reference runner.

pub mod step;

use anyhow::{Context as _, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{BridgeError, BridgeResult};
use crate::values::Val;

pub use step::Step;

/* ===================== Document Model ===================== */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessDefinition {
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub configuration: Configuration,
    #[serde(default)]
    pub flows: BTreeMap<String, Vec<Step>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub concord: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub arguments: BTreeMap<String, serde_yaml::Value>,
}

impl Configuration {
    /// Arguments as typed values, ready to seed a variable store
    pub fn argument_values(&self) -> BTreeMap<String, Val> {
        self.arguments
            .iter()
            .map(|(k, v)| (k.clone(), Val::from(v)))
            .collect()
    }
}

impl ProcessDefinition {
    pub fn parse(source: &str) -> BridgeResult<Self> {
        serde_yaml::from_str(source).map_err(|e| BridgeError::definition(e.to_string()))
    }

    pub fn flow(&self, name: &str) -> BridgeResult<&[Step]> {
        self.flows
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| BridgeError::UnknownFlow {
                name: name.to_string(),
            })
    }

    /// Total number of steps, nested branches included
    pub fn step_count(&self) -> usize {
        self.flows.values().map(|steps| count_steps(steps)).sum()
    }

    /// Structural checks run before execution
    ///
    /// - the entry flow exists
    /// - every `call` targets a defined flow
    /// - every `set` assigns at least one variable
    pub fn validate(&self, entry_flow: &str) -> BridgeResult<()> {
        self.flow(entry_flow)?;

        for (name, steps) in &self.flows {
            self.validate_steps(name, steps)?;
        }

        Ok(())
    }

    fn validate_steps(&self, flow: &str, steps: &[Step]) -> BridgeResult<()> {
        for step in steps {
            match step {
                Step::Call { flow: target } if !self.flows.contains_key(target) => {
                    return Err(BridgeError::definition(format!(
                        "Flow '{}' calls undefined flow '{}'",
                        flow, target
                    )));
                }
                Step::Set { vars } if vars.is_empty() => {
                    return Err(BridgeError::definition(format!(
                        "Flow '{}' has a 'set' step without variables",
                        flow
                    )));
                }
                Step::If {
                    then, otherwise, ..
                } => {
                    self.validate_steps(flow, then)?;
                    self.validate_steps(flow, otherwise)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn count_steps(steps: &[Step]) -> usize {
    steps
        .iter()
        .map(|step| match step {
            Step::If {
                then, otherwise, ..
            } => 1 + count_steps(then) + count_steps(otherwise),
            _ => 1,
        })
        .sum()
}

/* ===================== Definition Files ===================== */

/// A definition document read from disk
#[derive(Debug, Clone)]
pub struct DefinitionFile {
    pub name: String,
    pub source: String,
    pub file_path: String,
}

impl DefinitionFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read definition {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "definition".to_string());

        Ok(Self {
            name,
            source,
            file_path: path.display().to_string(),
        })
    }

    pub fn parse(&self) -> Result<ProcessDefinition> {
        ProcessDefinition::parse(&self.source)
            .with_context(|| format!("Failed to parse definition from {}", self.file_path))
    }

    /// SHA-256 of the source, hex encoded
    pub fn version_hash(&self) -> String {
        hash_source(&self.source)
    }
}

fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
