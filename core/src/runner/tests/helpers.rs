//! Test helpers for runner tests

use crate::definition::ProcessDefinition;
use crate::runner::{RunOptions, RunOutcome, Runner};
use crate::values::Val;
use std::collections::BTreeMap;

/// Parse a definition document, failing the test on syntax errors
pub fn parse_definition(source: &str) -> ProcessDefinition {
    ProcessDefinition::parse(source).expect("Parse definition failed")
}

/// Run the `default` flow with argument overrides
pub fn run_default(runner: &Runner, source: &str, arguments: BTreeMap<String, Val>) -> RunOutcome {
    let definition = parse_definition(source);
    runner
        .run(
            &definition,
            RunOptions {
                arguments,
                ..Default::default()
            },
        )
        .expect("Run failed")
}

/// Messages of every captured log line, in order
pub fn log_messages(outcome: &RunOutcome) -> Vec<String> {
    outcome.logs.iter().map(|r| r.message.clone()).collect()
}
