use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::path::{Path, PathBuf};

use crate::bench::matrix::ResultMatrix;
use crate::path_utils;

const RESULTS_FILENAME: &str = "results.json";

/// One completed orchestration pass, stamped at creation time
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    /// Generation timestamp, `YYYYmmdd_HHMMSS`
    pub timestamp: String,
    pub matrix: ResultMatrix,
}

impl BenchmarkRun {
    pub fn new(matrix: ResultMatrix) -> Self {
        Self {
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            matrix,
        }
    }
}

/// Persists aggregated matrices and reloads them for downstream consumers
pub struct ResultStore {
    results_dir: PathBuf,
}

impl ResultStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Write a run's matrix into its own timestamped directory and return
    /// that directory. Any failure here is fatal to the benchmark session.
    pub fn persist(&self, run: &BenchmarkRun) -> Result<PathBuf> {
        path_utils::ensure_directory(&self.results_dir)?;
        let run_dir = self.claim_run_dir(&run.timestamp)?;

        let json = serde_json::to_string_pretty(&run.matrix)
            .context("Failed to serialize result matrix")?;

        let path = run_dir.join(RESULTS_FILENAME);
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write results to {path:?}"))?;

        info!("Results saved to {}", path.display());
        Ok(run_dir)
    }

    /// Reload a persisted matrix, read-only
    pub fn load(path: &Path) -> Result<ResultMatrix> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read results file {path:?}"))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse results file {path:?}"))
    }

    /// Create a fresh directory for this run. Two runs stamped in the same
    /// second get distinct suffixed directories instead of colliding.
    fn claim_run_dir(&self, timestamp: &str) -> Result<PathBuf> {
        let base = self.results_dir.join(format!("run_{timestamp}"));
        let mut candidate = base.clone();
        let mut attempt = 0u32;

        loop {
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    if attempt > 1000 {
                        anyhow::bail!("Could not claim a run directory under {base:?}");
                    }
                    candidate = PathBuf::from(format!("{}_{attempt}", base.display()));
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create run directory {candidate:?}"));
                }
            }
        }
    }
}
