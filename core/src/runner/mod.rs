//! # Reference Runner
//!
//! A minimal host that executes a process definition against a fresh process
//! instance. It exists so the script-facing surface can be exercised end to
//! end without a live engine.
//!
//! ## Execution model
//!
//! 1. Create the instance: new UUID, working directory `<root>/<uuid>`
//! 2. Seed the store with `configuration.arguments`, then caller overrides
//! 3. Run the entry flow synchronously, step by step
//! 4. Return variables, published results and captured log lines
//!
//! `set` steps write the store and publish the assigned values as results.
//! `script` steps receive a `ScriptEnv`; anything they publish lands in the
//! same result set. `if` conditions go through the Boolean coercion: a
//! `Bool` or the text `true`/`false`; anything else fails the run.

#[cfg(test)]
mod tests;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::{Context, ProcessContext};
use crate::definition::{ProcessDefinition, Step};
use crate::environment::{Script, ScriptEnv};
use crate::errors::{BridgeError, BridgeResult};
use crate::expression::{ElEvaluator, Evaluator};
use crate::logger::{CapturingLogger, LogLevel, LogRecord, ScriptLogger, TracingLogger};
use crate::result::{ResultSink, ScriptResult};
use crate::tasks::{TaskAccessor, TaskProxy, TaskRegistry};
use crate::values::Val;
use crate::variables::{coerce, MapStore, VariableStore, Variables};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/* ===================== Options / Outcome ===================== */

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub entry_flow: String,
    /// Applied on top of `configuration.arguments`
    pub arguments: BTreeMap<String, Val>,
    pub dry_run: bool,
    /// Parent of per-instance working directories
    pub work_dir_root: PathBuf,
    /// Create the working directory before the run and remove it afterwards
    pub manage_work_dir: bool,
    /// Keep script log lines in `RunOutcome::logs`; otherwise they only go to `tracing`
    pub capture_logs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            entry_flow: "default".to_string(),
            arguments: BTreeMap::new(),
            dry_run: false,
            work_dir_root: std::env::temp_dir().join("concord-script"),
            manage_work_dir: false,
            capture_logs: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub instance_id: Uuid,
    pub work_dir: PathBuf,
    /// Store contents after the run
    pub variables: BTreeMap<String, Val>,
    pub results: ScriptResult,
    pub logs: Vec<LogRecord>,
    pub steps_executed: usize,
}

#[derive(Serialize)]
struct OutcomeSummary<'a> {
    instance_id: Uuid,
    work_dir: String,
    steps_executed: usize,
    results: JsonValue,
    logs: &'a [LogRecord],
}

impl RunOutcome {
    pub fn to_json(&self) -> JsonValue {
        let summary = OutcomeSummary {
            instance_id: self.instance_id,
            work_dir: self.work_dir.display().to_string(),
            steps_executed: self.steps_executed,
            results: self.results.to_json(),
            logs: &self.logs,
        };
        serde_json::to_value(summary).unwrap_or_else(|e| {
            json!({ "instance_id": self.instance_id, "error": e.to_string() })
        })
    }
}

/* ===================== Runner ===================== */

/// Outcome of a sequence of steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return,
}

/// Script logger chosen by `RunOptions::capture_logs`
enum RunLogger {
    Capturing(CapturingLogger),
    Forwarding(TracingLogger),
}

impl RunLogger {
    fn new(instance_id: Uuid, capture: bool) -> Self {
        if capture {
            RunLogger::Capturing(CapturingLogger::new(instance_id))
        } else {
            RunLogger::Forwarding(TracingLogger::new(instance_id))
        }
    }

    fn as_logger(&self) -> &dyn ScriptLogger {
        match self {
            RunLogger::Capturing(logger) => logger,
            RunLogger::Forwarding(logger) => logger,
        }
    }

    fn into_records(self) -> Vec<LogRecord> {
        match self {
            RunLogger::Capturing(logger) => logger.into_records(),
            RunLogger::Forwarding(_) => Vec::new(),
        }
    }
}

/// Per-run mutable state
struct Execution<'d> {
    definition: &'d ProcessDefinition,
    context: ProcessContext,
    logger: RunLogger,
    result: ScriptResult,
    dry_run: bool,
    steps_executed: usize,
}

pub struct Runner {
    evaluator: Arc<dyn Evaluator>,
    scripts: HashMap<String, Arc<dyn Script>>,
    tasks: TaskRegistry,
    max_call_depth: usize,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            evaluator: Arc::new(ElEvaluator::new()),
            scripts: HashMap::new(),
            tasks: TaskRegistry::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn register_script(&mut self, name: impl Into<String>, script: impl Script + 'static) {
        self.scripts.insert(name.into(), Arc::new(script));
    }

    pub fn register_task(&mut self, name: impl Into<String>, task: impl TaskProxy + 'static) {
        self.tasks.register(name, task);
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Run `options.entry_flow` of `definition` in a new process instance
    pub fn run(&self, definition: &ProcessDefinition, options: RunOptions) -> BridgeResult<RunOutcome> {
        definition.validate(&options.entry_flow)?;

        let instance_id = Uuid::new_v4();
        let work_dir = options.work_dir_root.join(instance_id.to_string());
        if options.manage_work_dir {
            std::fs::create_dir_all(&work_dir).map_err(|e| {
                BridgeError::definition(format!(
                    "Failed to create working directory {}: {}",
                    work_dir.display(),
                    e
                ))
            })?;
        }

        let mut store = MapStore::from(definition.configuration.argument_values());
        for (key, value) in options.arguments {
            store.set(&key, value);
        }

        info!(
            %instance_id,
            flow = %options.entry_flow,
            arguments = store.len(),
            dry_run = options.dry_run,
            "Starting process instance"
        );

        let mut exec = Execution {
            definition,
            context: ProcessContext::new(
                instance_id,
                work_dir.clone(),
                Variables::from(store),
                self.evaluator.clone(),
            ),
            logger: RunLogger::new(instance_id, options.capture_logs),
            result: ScriptResult::new(),
            dry_run: options.dry_run,
            steps_executed: 0,
        };

        let outcome = self.exec_flow(&mut exec, &options.entry_flow, 0);

        if options.manage_work_dir {
            if let Err(e) = std::fs::remove_dir_all(&work_dir) {
                warn!(%instance_id, error = %e, "Failed to remove working directory");
            }
        }

        if let Err(e) = &outcome {
            warn!(%instance_id, code = e.code(), error = %e, "Process instance failed");
        }
        outcome?;

        info!(
            %instance_id,
            steps = exec.steps_executed,
            results = exec.result.len(),
            "Process instance completed"
        );

        Ok(RunOutcome {
            instance_id,
            work_dir,
            variables: exec.context.variables().to_map(),
            results: exec.result,
            logs: exec.logger.into_records(),
            steps_executed: exec.steps_executed,
        })
    }

    fn exec_flow(&self, exec: &mut Execution<'_>, name: &str, depth: usize) -> BridgeResult<()> {
        if depth >= self.max_call_depth {
            return Err(BridgeError::definition(format!(
                "Call depth limit {} exceeded entering flow '{}'",
                self.max_call_depth, name
            )));
        }

        let steps = exec.definition.flow(name)?;
        debug!(flow = %name, depth, steps = steps.len(), "Entering flow");

        // `return` ends this flow only; the caller continues
        self.exec_steps(exec, steps, depth)?;
        Ok(())
    }

    fn exec_steps(&self, exec: &mut Execution<'_>, steps: &[Step], depth: usize) -> BridgeResult<Flow> {
        for step in steps {
            if self.exec_step(exec, step, depth)? == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Continue)
    }

    fn exec_step(&self, exec: &mut Execution<'_>, step: &Step, depth: usize) -> BridgeResult<Flow> {
        exec.steps_executed += 1;

        match step {
            Step::Log { message } => {
                let text = exec.context.eval_in_scope(message)?;
                exec.logger.as_logger().log(LogLevel::Info, "{}", &[text]);
            }

            Step::Call { flow } => {
                self.exec_flow(exec, flow, depth + 1)?;
            }

            Step::If {
                condition,
                then,
                otherwise,
            } => {
                let value = exec.context.eval_in_scope(condition)?;
                let holds = coerce::to_boolean(&value).ok_or_else(|| {
                    BridgeError::expression(
                        condition.as_str(),
                        format!("condition must be boolean, got {}", value.kind()),
                    )
                })?;
                let branch = if holds { then } else { otherwise };
                return self.exec_steps(exec, branch, depth);
            }

            Step::Set { vars } => {
                // All values are evaluated against the scope before the step
                let scope = exec.context.scope();
                for (key, raw) in vars {
                    let value = self.evaluator.eval_value(raw, &scope)?;
                    exec.context.variables_mut().set(key, value.clone());
                    exec.result.set(key, value);
                }
            }

            Step::Script { name, input } => {
                let script = self
                    .scripts
                    .get(name)
                    .cloned()
                    .ok_or_else(|| BridgeError::UnknownScript { name: name.clone() })?;
                let input = self.eval_input(exec, input)?;

                debug!(script = %name, "Invoking script");
                let Execution {
                    context,
                    logger,
                    result,
                    dry_run,
                    ..
                } = exec;
                let mut env = ScriptEnv {
                    context: &*context,
                    tasks: &self.tasks,
                    log: logger.as_logger(),
                    result,
                    is_dry_run: *dry_run,
                    input,
                };
                script.run(&mut env)?;
            }

            Step::Task { name, input, out } => {
                let task = self.tasks.get(name)?;
                let input = self.eval_input(exec, input)?;

                debug!(task = %name, "Executing task");
                let output = task.execute(&input)?;
                if let Some(var) = out {
                    exec.context.variables_mut().set(var, output);
                }
            }

            Step::Return => return Ok(Flow::Return),
        }

        Ok(Flow::Continue)
    }

    fn eval_input(
        &self,
        exec: &Execution<'_>,
        input: &BTreeMap<String, Val>,
    ) -> BridgeResult<BTreeMap<String, Val>> {
        let scope = exec.context.scope();
        input
            .iter()
            .map(|(k, v)| -> BridgeResult<(String, Val)> {
                Ok((k.clone(), self.evaluator.eval_value(v, &scope)?))
            })
            .collect()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
