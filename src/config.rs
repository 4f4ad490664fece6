use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bench::Variant;
use crate::path_utils;

/// Dataset sizes measured by default, matching the kernels' usual range
fn default_total_points() -> Vec<u64> {
    vec![10_000_000, 50_000_000, 100_000_000]
}

fn default_worker_counts() -> Vec<u32> {
    vec![1, 2, 4, 6, 8]
}

fn default_runs() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Build and run argument vectors for one variant
///
/// Placeholders `{points}` and `{workers}` are substituted into individual
/// arguments before spawning; commands never pass through a shell.
#[derive(Debug, Deserialize, Clone)]
pub struct CommandTemplate {
    /// Optional build step, executed before every measured run
    #[serde(default)]
    pub build: Option<Vec<String>>,
    /// The measured invocation
    pub run: Vec<String>,
}

impl CommandTemplate {
    pub fn build_argv(&self, total_points: u64, workers: Option<u32>) -> Option<Vec<String>> {
        self.build
            .as_ref()
            .map(|args| substitute_args(args, total_points, workers))
    }

    pub fn run_argv(&self, total_points: u64, workers: Option<u32>) -> Vec<String> {
        substitute_args(&self.run, total_points, workers)
    }
}

fn substitute_args(args: &[String], total_points: u64, workers: Option<u32>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut arg = arg.replace("{points}", &total_points.to_string());
            if let Some(workers) = workers {
                arg = arg.replace("{workers}", &workers.to_string());
            }
            arg
        })
        .collect()
}

/// Command templates for all three variants
#[derive(Debug, Deserialize, Clone)]
pub struct VariantCommands {
    pub sequential: CommandTemplate,
    pub parallel: CommandTemplate,
    pub spawned: CommandTemplate,
}

impl VariantCommands {
    pub fn for_variant(&self, variant: Variant) -> &CommandTemplate {
        match variant {
            Variant::Sequential => &self.sequential,
            Variant::Parallel => &self.parallel,
            Variant::Spawned => &self.spawned,
        }
    }
}

/// The full configuration matrix for one benchmark session
///
/// Constructed once, validated, and passed into the orchestrator; nothing
/// reads configuration as ambient global state.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    /// Dataset sizes, in traversal order
    #[serde(default = "default_total_points")]
    pub total_points: Vec<u64>,
    /// Worker counts for the parallel and spawned variants, in traversal order
    #[serde(default = "default_worker_counts")]
    pub worker_counts: Vec<u32>,
    /// Repetitions per configuration point
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Wall-clock budget per invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory build/run commands execute in
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Directory receiving timestamped run artifacts
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    pub variants: VariantCommands,
}

impl MatrixConfig {
    pub fn validate(&self) -> Result<()> {
        if self.total_points.is_empty() {
            anyhow::bail!("total_points must not be empty");
        }
        if self.worker_counts.is_empty() {
            anyhow::bail!("worker_counts must not be empty");
        }
        if let Some(&bad) = self.worker_counts.iter().find(|&&w| w < 1) {
            anyhow::bail!("worker counts must be >= 1, got {bad}");
        }
        if self.runs < 1 {
            anyhow::bail!("runs must be >= 1");
        }
        if self.timeout_secs < 1 {
            anyhow::bail!("timeout_secs must be >= 1");
        }
        for variant in Variant::ALL {
            if self.variants.for_variant(variant).run.is_empty() {
                anyhow::bail!("empty run command for variant '{variant}'");
            }
        }
        Ok(())
    }
}

/// Load the matrix configuration from a YAML file
///
/// Paths are expanded (`~`, env vars) and resolved relative to the config
/// file's directory.
pub fn load_config(config_path: &Path) -> Result<MatrixConfig> {
    if !config_path.exists() {
        anyhow::bail!("Config file not found: {config_path:?}");
    }

    let config_dir = config_path
        .parent()
        .context("Failed to get config directory")?;

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

    let mut config: MatrixConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML from file: {config_path:?}"))?;

    config.results_dir = path_utils::resolve_path(&config.results_dir, config_dir);
    config.working_dir = config
        .working_dir
        .as_ref()
        .map(|dir| path_utils::resolve_path(dir, config_dir));

    config.validate()?;

    debug!("Using configuration\n{config:?}");
    Ok(config)
}
