//! Layered configuration
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config` / `CONCORD_SCRIPT_CONFIG_PATH`, else
//!    `concord-script.toml` in the current directory when present
//! 3. Environment variables, `CONCORD_SCRIPT_` prefix with `__` between
//!    sections (`CONCORD_SCRIPT_RUNTIME__DRY_RUN=true`)
//! 4. Builder overrides
//!
//! `.env` files are loaded before the environment is read.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::generator::StressOptions;

pub const ENV_PREFIX: &str = "CONCORD_SCRIPT";
pub const CONFIG_PATH_ENV: &str = "CONCORD_SCRIPT_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "concord-script.toml";

/* ===================== Sections ===================== */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Parent of per-instance working directories
    #[serde(default = "default_work_dir_root")]
    pub work_dir_root: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Explicit marker index; unset falls back to the generator default when
    /// it fits inside `steps`
    #[serde(default)]
    pub marker_at: Option<usize>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_work_dir_root() -> PathBuf {
    std::env::temp_dir().join("concord-script")
}

fn default_steps() -> usize {
    StressOptions::default().steps
}

fn default_output() -> PathBuf {
    PathBuf::from("concord.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            work_dir_root: default_work_dir_root(),
            dry_run: false,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            marker_at: None,
            output: default_output(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GeneratorConfig {
    pub fn stress_options(&self) -> StressOptions {
        let marker_at = self.marker_at.or_else(|| {
            StressOptions::default()
                .marker_at
                .filter(|marker| *marker < self.steps)
        });
        StressOptions {
            steps: self.steps,
            marker_at,
        }
    }
}

/* ===================== Loading ===================== */

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    fn from_sources(path: Option<&Path>, use_env: bool) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        if use_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.generator.steps == 0 {
            bail!("generator.steps must be greater than zero");
        }
        if let Some(marker) = self.generator.marker_at {
            if marker >= self.generator.steps {
                bail!(
                    "generator.marker_at ({}) must be below generator.steps ({})",
                    marker,
                    self.generator.steps
                );
            }
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    work_dir_root: Option<PathBuf>,
    dry_run: Option<bool>,
    skip_env: bool,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn work_dir_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_dir_root = root;
        self
    }

    pub fn dry_run(mut self, dry_run: Option<bool>) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Ignore `.env` and process environment variables
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // A missing .env file is not an error
            let _ = dotenvy::dotenv();
        }

        let path = self.resolve_path()?;
        let mut config = Config::from_sources(path.as_deref(), !self.skip_env)?;

        if let Some(root) = self.work_dir_root {
            config.runtime.work_dir_root = root;
        }
        if let Some(dry_run) = self.dry_run {
            config.runtime.dry_run = dry_run;
        }

        tracing::debug!(
            path = ?path,
            work_dir_root = %config.runtime.work_dir_root.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn resolve_path(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.config_path {
            return Ok(Some(path.clone()));
        }
        if !self.skip_env {
            if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
                return Ok(Some(PathBuf::from(path)));
            }
        }

        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        Ok(candidate.is_file().then_some(candidate))
    }
}
