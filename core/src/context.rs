//! Execution context
//!
//! One `ProcessContext` exists per process instance. It carries the instance
//! identity, the working directory assigned by the host, the variable
//! accessor and the evaluator used for `eval`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::BridgeResult;
use crate::expression::{Evaluator, Scope};
use crate::values::Val;
use crate::variables::Variables;

/// Instance-scoped handle passed into every script invocation
pub trait Context {
    fn working_directory(&self) -> &Path;

    fn process_instance_id(&self) -> Uuid;

    /// Evaluate `expression` against the supplied scope, not the instance store
    fn eval(&self, expression: &str, variables: &Scope) -> BridgeResult<Val>;

    fn variables(&self) -> &Variables;
}

/* ===================== Process Context ===================== */

pub struct ProcessContext {
    instance_id: Uuid,
    work_dir: PathBuf,
    variables: Variables,
    evaluator: Arc<dyn Evaluator>,
}

impl ProcessContext {
    pub fn new(
        instance_id: Uuid,
        work_dir: impl Into<PathBuf>,
        variables: Variables,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            instance_id,
            work_dir: work_dir.into(),
            variables,
            evaluator,
        }
    }

    /// Host-side mutable access to the store
    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn into_variables(self) -> Variables {
        self.variables
    }

    /// Instance store plus the built-ins `txId` and `workDir`
    ///
    /// Store entries shadow built-ins of the same name.
    pub fn scope(&self) -> Scope {
        let mut scope = Scope::new();
        scope.insert("txId".to_string(), Val::Uuid(self.instance_id));
        scope.insert(
            "workDir".to_string(),
            Val::Str(self.work_dir.to_string_lossy().into_owned()),
        );
        scope.extend(self.variables.to_map());
        scope
    }

    /// Evaluate against the instance's own scope
    pub fn eval_in_scope(&self, expression: &str) -> BridgeResult<Val> {
        self.evaluator.eval(expression, &self.scope())
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }
}

impl Context for ProcessContext {
    fn working_directory(&self) -> &Path {
        &self.work_dir
    }

    fn process_instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn eval(&self, expression: &str, variables: &Scope) -> BridgeResult<Val> {
        self.evaluator.eval(expression, variables)
    }

    fn variables(&self) -> &Variables {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ElEvaluator;
    use crate::variables::MapStore;
    use maplit::{btreemap, hashmap};

    fn context() -> ProcessContext {
        let store = MapStore::from(hashmap! { "name".to_string() => Val::from("store") });
        ProcessContext::new(
            Uuid::new_v4(),
            "/tmp/work",
            Variables::from(store),
            Arc::new(ElEvaluator::new()),
        )
    }

    #[test]
    fn test_identity_and_work_dir() {
        let ctx = context();
        assert_eq!(ctx.working_directory(), Path::new("/tmp/work"));
        assert_eq!(ctx.process_instance_id(), ctx.process_instance_id());
        assert_eq!(ctx.variables().assert_string("name", None).unwrap(), "store");
    }

    #[test]
    fn test_eval_uses_supplied_scope() {
        let ctx = context();
        let scope = btreemap! { "name".to_string() => Val::from("override") };

        assert_eq!(ctx.eval("${name}", &scope).unwrap(), Val::from("override"));
        assert!(ctx.eval("${name}", &Scope::new()).is_err());
        assert_eq!(ctx.eval_in_scope("${name}").unwrap(), Val::from("store"));
    }

    #[test]
    fn test_scope_builtins() {
        let ctx = context();
        let scope = ctx.scope();

        assert_eq!(scope["txId"], Val::Uuid(ctx.process_instance_id()));
        assert_eq!(scope["workDir"], Val::from("/tmp/work"));
    }
}
