//! Task accessor
//!
//! Tasks are host-provided capabilities looked up by name. The accessor does
//! not inspect a proxy beyond handing it out.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::errors::{BridgeError, BridgeResult};
use crate::values::Val;

/// Opaque capability exposed to scripts
pub trait TaskProxy: Send + Sync {
    /// Run the task with named inputs
    fn execute(&self, input: &BTreeMap<String, Val>) -> BridgeResult<Val>;
}

impl<F> TaskProxy for F
where
    F: Fn(&BTreeMap<String, Val>) -> BridgeResult<Val> + Send + Sync,
{
    fn execute(&self, input: &BTreeMap<String, Val>) -> BridgeResult<Val> {
        self(input)
    }
}

/// Read-only lookup of task proxies
pub trait TaskAccessor {
    /// Fails with `UnknownTask` when nothing is registered under `name`
    fn get(&self, name: &str) -> BridgeResult<Arc<dyn TaskProxy>>;
}

/// Name-keyed task table owned by the host
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn TaskProxy>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, task: impl TaskProxy + 'static) {
        self.tasks.insert(name.into(), Arc::new(task));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TaskAccessor for TaskRegistry {
    fn get(&self, name: &str) -> BridgeResult<Arc<dyn TaskProxy>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownTask {
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task() {
        let registry = TaskRegistry::new();
        let err = registry.get("deploy").err().unwrap();
        assert_eq!(
            err,
            BridgeError::UnknownTask {
                name: "deploy".to_string()
            }
        );
    }

    #[test]
    fn test_registered_closure() {
        let mut registry = TaskRegistry::new();
        registry.register("echo", |input: &BTreeMap<String, Val>| {
            Ok::<_, BridgeError>(input.get("msg").cloned().unwrap_or(Val::Null))
        });

        let task = registry.get("echo").unwrap();
        let mut input = BTreeMap::new();
        input.insert("msg".to_string(), Val::from("hi"));

        assert_eq!(task.execute(&input).unwrap(), Val::from("hi"));
        assert_eq!(registry.names(), vec!["echo".to_string()]);
    }
}
