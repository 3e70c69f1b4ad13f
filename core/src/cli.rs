use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::definition::DefinitionFile;
use crate::generator::{self, StressOptions};
use crate::runner::{RunOptions, Runner};
use crate::values::Val;

#[derive(Parser)]
#[command(name = "concord-script")]
#[command(about = "Concord script bridge - typed variable access for embedded scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stress-test definition document
    Generate {
        /// Output path (default: generator.output)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Number of arguments and step groups (default: generator.steps)
        #[arg(long)]
        steps: Option<usize>,

        /// Index preceded by the marker comment
        #[arg(long)]
        marker_at: Option<usize>,

        /// Omit the marker comment
        #[arg(long, conflicts_with = "marker_at")]
        no_marker: bool,
    },

    /// Parse and validate a definition document
    Validate {
        /// Definition file
        file: PathBuf,

        /// Entry flow that must exist
        #[arg(long, default_value = "default")]
        flow: String,
    },

    /// Run a definition document with the reference runner
    Run {
        /// Definition file
        file: PathBuf,

        /// Entry flow
        #[arg(long, default_value = "default")]
        flow: String,

        /// Argument override, repeatable (value parsed as a YAML scalar)
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// Expose the dry-run flag to scripts
        #[arg(long)]
        dry_run: bool,

        /// Create and remove a per-instance working directory
        #[arg(long)]
        manage_work_dir: bool,

        /// Send script log lines to the tracing output instead of the summary
        #[arg(long)]
        stream_logs: bool,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::try_parse_from(args)?;
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before any output so config errors surface first
    let config = Config::builder()
        .config_path(cli.config.clone())
        .build()
        .context("Failed to load configuration")?;

    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Generate {
            output,
            steps,
            marker_at,
            no_marker,
        } => {
            let mut generator_config = config.generator.clone();
            if let Some(steps) = steps {
                generator_config.steps = steps;
                // Drop a configured marker that no longer fits
                if generator_config.marker_at.is_some_and(|m| m >= steps) {
                    generator_config.marker_at = None;
                }
            }
            let mut options = generator_config.stress_options();
            if marker_at.is_some() {
                options.marker_at = marker_at;
            }
            if no_marker {
                options.marker_at = None;
            }
            check_stress_options(&options)?;

            let output = output.unwrap_or(generator_config.output);
            let bytes = generator::write_to(&output, &options)?;
            println!("Wrote {} ({} bytes, {} steps)", output.display(), bytes, options.steps);
        }

        Commands::Validate { file, flow } => {
            let file = DefinitionFile::load(&file)?;
            let definition = file.parse()?;
            definition
                .validate(&flow)
                .with_context(|| format!("Definition {} is invalid", file.file_path))?;

            println!("Definition: {}", file.name);
            println!("Version: {}", file.version_hash());
            println!("Flows: {}", definition.flows.len());
            println!("Steps: {}", definition.step_count());
            println!("Arguments: {}", definition.configuration.arguments.len());
        }

        Commands::Run {
            file,
            flow,
            args,
            dry_run,
            manage_work_dir,
            stream_logs,
        } => {
            let definition = DefinitionFile::load(&file)?.parse()?;
            let arguments = parse_arguments(&args)?;

            let outcome = Runner::new()
                .run(
                    &definition,
                    RunOptions {
                        entry_flow: flow,
                        arguments,
                        dry_run: dry_run || config.runtime.dry_run,
                        work_dir_root: config.runtime.work_dir_root.clone(),
                        manage_work_dir,
                        capture_logs: !stream_logs,
                    },
                )
                .with_context(|| format!("Run of {} failed", file.display()))?;

            let summary = serde_json::to_string_pretty(&outcome.to_json())
                .context("Failed to render run summary")?;
            println!("{}", summary);
        }
    }

    Ok(())
}

fn init_tracing(fallback_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level));
    // Already installed when invoked more than once in one process
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn check_stress_options(options: &StressOptions) -> Result<()> {
    if options.steps == 0 {
        return Err(anyhow!("--steps must be greater than zero"));
    }
    if let Some(marker) = options.marker_at {
        if marker >= options.steps {
            return Err(anyhow!(
                "--marker-at {} is out of range for {} steps",
                marker,
                options.steps
            ));
        }
    }
    Ok(())
}

/// Parse `KEY=VALUE` overrides; values are read as YAML scalars
fn parse_arguments(args: &[String]) -> Result<BTreeMap<String, Val>> {
    args.iter()
        .map(|arg| {
            let (key, raw) = arg
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid argument '{}', expected KEY=VALUE", arg))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("Invalid argument '{}', key is empty", arg));
            }
            let value = serde_yaml::from_str::<serde_yaml::Value>(raw)
                .map(|v| Val::from(&v))
                .unwrap_or_else(|_| Val::from(raw));
            Ok((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_arguments() {
        let parsed = parse_arguments(&args(&["name=world", "count=3", "flag=true", "empty="])).unwrap();

        assert_eq!(
            parsed,
            btreemap! {
                "name".to_string() => Val::from("world"),
                "count".to_string() => Val::Int(3),
                "flag".to_string() => Val::Bool(true),
                "empty".to_string() => Val::Null,
            }
        );
    }

    #[test]
    fn test_parse_arguments_rejects_missing_separator() {
        assert!(parse_arguments(&args(&["nokey"])).is_err());
        assert!(parse_arguments(&args(&["=value"])).is_err());
    }

    #[test]
    fn test_check_stress_options() {
        assert!(check_stress_options(&StressOptions::default()).is_ok());
        assert!(check_stress_options(&StressOptions { steps: 0, marker_at: None }).is_err());
        assert!(check_stress_options(&StressOptions { steps: 5, marker_at: Some(5) }).is_err());
    }

    #[test]
    fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("cli.toml");
        std::fs::write(&config_path, "[logging]\nlevel = \"warn\"\n").unwrap();
        let output = dir.path().join("stress.yaml");

        run_cli_from_args(args(&[
            "concord-script",
            "--config",
            config_path.to_str().unwrap(),
            "generate",
            "--output",
            output.to_str().unwrap(),
            "--steps",
            "10",
        ]))
        .unwrap();
        assert!(output.is_file());

        run_cli_from_args(args(&[
            "concord-script",
            "--config",
            config_path.to_str().unwrap(),
            "validate",
            output.to_str().unwrap(),
        ]))
        .unwrap();
    }

    #[test]
    fn test_config_with_only_steps() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("cli.toml");
        std::fs::write(&config_path, "[generator]\nsteps = 10\n").unwrap();
        let output = dir.path().join("small.yaml");

        run_cli_from_args(args(&[
            "concord-script",
            "--config",
            config_path.to_str().unwrap(),
            "generate",
            "--output",
            output.to_str().unwrap(),
        ]))
        .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("stress_arg_9:"));
        assert!(!written.contains("stress_arg_10:"));
        assert!(!written.contains("# move here"));

        run_cli_from_args(args(&[
            "concord-script",
            "--config",
            config_path.to_str().unwrap(),
            "validate",
            output.to_str().unwrap(),
        ]))
        .unwrap();
    }

    #[test]
    fn test_validate_reports_missing_flow() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("cli.toml");
        std::fs::write(&config_path, "").unwrap();
        let file = dir.path().join("concord.yaml");
        std::fs::write(&file, "flows:\n  default:\n    - log: hi\n").unwrap();

        let err = run_cli_from_args(args(&[
            "concord-script",
            "--config",
            config_path.to_str().unwrap(),
            "validate",
            file.to_str().unwrap(),
            "--flow",
            "main",
        ]))
        .unwrap_err();

        assert!(format!("{:#}", err).contains("Flow 'main' is not defined"));
    }
}
