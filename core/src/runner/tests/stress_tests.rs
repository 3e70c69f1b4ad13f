//! Tests running generated stress documents

use super::super::*;
use super::helpers::{log_messages, parse_definition, run_default};
use crate::generator::{generate, StressOptions};
use maplit::btreemap;

#[test]
fn test_default_stress_run() {
    let source = generate(&StressOptions::default());
    let outcome = run_default(&Runner::new(), &source, btreemap! {});

    // Start + call, then log and if per index, then Done
    assert_eq!(outcome.steps_executed, 2003);
    assert!(outcome.results.is_empty());

    let messages = log_messages(&outcome);
    assert_eq!(messages.len(), 1002);
    assert_eq!(messages[0], "Start");
    assert_eq!(messages[501], "Step 500 processing value_500");
    assert_eq!(messages[1001], "Done");
}

#[test]
fn test_matching_argument_sets_temp_var() {
    let source = generate(&StressOptions::default());
    let outcome = run_default(
        &Runner::new(),
        &source,
        btreemap! { "stress_arg_500".to_string() => Val::from("test") },
    );

    assert_eq!(outcome.steps_executed, 2004);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results.get("temp_var_500"), Some(&Val::from("test")));
    assert_eq!(outcome.variables["temp_var_500"], Val::from("test"));
    assert!(!outcome.variables.contains_key("temp_var_499"));
}

#[test]
fn test_stress_script_reads_every_argument() {
    let mut runner = Runner::new();
    runner.register_script("audit", |env: &mut ScriptEnv<'_>| -> BridgeResult<()> {
        let vars = env.context.variables();
        let mut count = 0;
        for i in 0..50 {
            let key = format!("stress_arg_{i}");
            if vars.assert_string(&key, None)? == format!("value_{i}") {
                count += 1;
            }
        }
        env.result.set("matched", Val::Int(count));
        Ok(())
    });

    let mut source = generate(&StressOptions {
        steps: 50,
        marker_at: None,
    });
    source.push_str("  audit:\n    - script: audit\n");

    let definition = parse_definition(&source);
    let outcome = runner
        .run(
            &definition,
            RunOptions {
                entry_flow: "audit".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(outcome.results.get("matched"), Some(&Val::Int(50)));
}
