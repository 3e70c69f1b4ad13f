//! Stress document generator
//!
//! Produces a large definition document for load-testing a host's parser and
//! executor: `N` pre-bound arguments and a `stress_flow` with, per index `i`,
//! a `log` interpolating `stress_arg_i`, an `if` testing it against `'test'`
//! and a nested `set` writing `temp_var_i`.

use anyhow::{Context, Result};
use std::path::Path;

const RESOURCE_GLOBS: [&str; 4] = [
    "glob:concord/{**/,}{*.,}concord.yaml",
    "glob:flows/{**/,}{*.,}concord.yaml",
    "glob:profiles/{**/,}{*.,}concord.yaml",
    "glob:triggers/{**/,}{*.,}concord.yaml",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressOptions {
    /// Number of arguments and of log/if/set step groups
    pub steps: usize,
    /// Index preceded by a `# move here` marker comment
    pub marker_at: Option<usize>,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self {
            steps: 1000,
            marker_at: Some(500),
        }
    }
}

pub fn generate(options: &StressOptions) -> String {
    let mut out = String::new();

    out.push_str("resources:\n");
    out.push_str("  concord:\n");
    for glob in RESOURCE_GLOBS {
        out.push_str(&format!("    - \"{glob}\"\n"));
    }
    out.push('\n');

    out.push_str("configuration:\n");
    out.push_str("  runtime: concord-v2\n");
    out.push_str("  arguments:\n");
    for i in 0..options.steps {
        out.push_str(&format!("    stress_arg_{i}: \"value_{i}\"\n"));
    }

    out.push_str("\nflows:\n");
    out.push_str("  default:\n");
    out.push_str("    - log: \"Start\"\n");
    out.push_str("    - call: stress_flow\n");

    out.push_str("  stress_flow:\n");
    for i in 0..options.steps {
        if options.marker_at == Some(i) {
            out.push_str("    # move here\n");
        }
        out.push_str(&format!("    - log: \"Step {i} processing ${{stress_arg_{i}}}\"\n"));
        out.push_str(&format!("    - if: \"${{stress_arg_{i} == 'test'}}\"\n"));
        out.push_str("      then:\n");
        out.push_str("        - set:\n");
        out.push_str(&format!("            temp_var_{i}: \"${{stress_arg_{i}}}\"\n"));
    }
    out.push_str("    - log: \"Done\"\n");

    out
}

/// Generate and write the document, returning its size in bytes
pub fn write_to(path: impl AsRef<Path>, options: &StressOptions) -> Result<usize> {
    let path = path.as_ref();
    let document = generate(options);

    std::fs::write(path, &document)
        .with_context(|| format!("Failed to write stress document to {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        steps = options.steps,
        bytes = document.len(),
        "Generated stress document"
    );

    Ok(document.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ProcessDefinition, Step};
    use crate::values::Val;

    #[test]
    fn test_small_document_layout() {
        let doc = generate(&StressOptions {
            steps: 2,
            marker_at: Some(1),
        });

        let expected = r#"resources:
  concord:
    - "glob:concord/{**/,}{*.,}concord.yaml"
    - "glob:flows/{**/,}{*.,}concord.yaml"
    - "glob:profiles/{**/,}{*.,}concord.yaml"
    - "glob:triggers/{**/,}{*.,}concord.yaml"

configuration:
  runtime: concord-v2
  arguments:
    stress_arg_0: "value_0"
    stress_arg_1: "value_1"

flows:
  default:
    - log: "Start"
    - call: stress_flow
  stress_flow:
    - log: "Step 0 processing ${stress_arg_0}"
    - if: "${stress_arg_0 == 'test'}"
      then:
        - set:
            temp_var_0: "${stress_arg_0}"
    # move here
    - log: "Step 1 processing ${stress_arg_1}"
    - if: "${stress_arg_1 == 'test'}"
      then:
        - set:
            temp_var_1: "${stress_arg_1}"
    - log: "Done"
"#;
        pretty_assertions::assert_eq!(doc, expected);
    }

    #[test]
    fn test_default_document_parses() {
        let def = ProcessDefinition::parse(&generate(&StressOptions::default())).unwrap();

        assert_eq!(def.resources.concord.len(), 4);
        assert_eq!(def.configuration.runtime.as_deref(), Some("concord-v2"));
        assert_eq!(def.configuration.arguments.len(), 1000);
        assert_eq!(
            def.configuration.argument_values()["stress_arg_500"],
            Val::from("value_500")
        );

        let stress = def.flow("stress_flow").unwrap();
        // log + if per index, plus the trailing log
        assert_eq!(stress.len(), 2001);
        assert!(matches!(&stress[1001], Step::If { condition, .. } if condition == "${stress_arg_500 == 'test'}"));
        assert!(def.validate("default").is_ok());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concord.yaml");
        let options = StressOptions {
            steps: 3,
            marker_at: None,
        };

        let size = write_to(&path, &options).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert_eq!(size, written.len());
        assert!(!written.contains("# move here"));
    }
}
