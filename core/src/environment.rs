//! Script environment
//!
//! Everything a script may touch is handed over in one explicit record
//! instead of ambient globals: the context, task lookup, logger, result sink,
//! the dry-run flag and the step's input values.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::errors::BridgeResult;
use crate::logger::ScriptLogger;
use crate::result::ResultSink;
use crate::tasks::TaskAccessor;
use crate::values::Val;

pub struct ScriptEnv<'a> {
    pub context: &'a dyn Context,
    pub tasks: &'a dyn TaskAccessor,
    pub log: &'a dyn ScriptLogger,
    pub result: &'a mut dyn ResultSink,
    /// Exposed as-is; the host attaches no behaviour to it here
    pub is_dry_run: bool,
    /// Evaluated `in` values of the invoking step
    pub input: BTreeMap<String, Val>,
}

/// A script the host can invoke with a `ScriptEnv`
pub trait Script: Send + Sync {
    fn run(&self, env: &mut ScriptEnv<'_>) -> BridgeResult<()>;
}

impl<F> Script for F
where
    F: Fn(&mut ScriptEnv<'_>) -> BridgeResult<()> + Send + Sync,
{
    fn run(&self, env: &mut ScriptEnv<'_>) -> BridgeResult<()> {
        self(env)
    }
}
