use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::time::Duration;

use crate::bench::command::{ProcessRunner, RunOutcome};
use crate::bench::extract::extract_execution_time;
use crate::bench::matrix::{
    AggregateResult, ConfigurationPoint, ResultMatrix, Sample, SampleFailure, Variant,
};
use crate::config::{CommandTemplate, MatrixConfig};

/// Drives the full configuration matrix, one invocation at a time
///
/// Traversal order is fixed: variant, then dataset size, then worker count,
/// then repetition. Nothing runs concurrently inside the orchestrator; the
/// only parallelism lives inside the measured process groups, and overlapping
/// them would contaminate the wall-clock timings being compared.
pub struct Orchestrator {
    config: MatrixConfig,
    runner: ProcessRunner,
}

impl Orchestrator {
    pub fn new(config: MatrixConfig) -> Self {
        let runner = ProcessRunner::new(
            Duration::from_secs(config.timeout_secs),
            config.working_dir.clone(),
        );
        Self { config, runner }
    }

    /// Measure every configuration point and return the aggregated matrix.
    ///
    /// Failed points are omitted and never abort the traversal; the matrix
    /// is owned exclusively in memory until the caller persists it.
    pub fn run(&self) -> Result<ResultMatrix> {
        let progress = self.progress_bar();
        let mut matrix = ResultMatrix::default();

        for variant in Variant::ALL {
            let template = self.config.variants.for_variant(variant);
            info!("Benchmarking {variant} variant");

            for &total_points in &self.config.total_points {
                for workers in self.worker_dimension(variant) {
                    let point = ConfigurationPoint {
                        variant,
                        total_points,
                        workers,
                    };

                    match self.measure_point(template, &point, &progress) {
                        Some(aggregate) => {
                            info!(
                                "{point}: avg={:.6}s over {} successful run(s)",
                                aggregate.mean_secs, aggregate.samples
                            );
                            matrix.insert(&point, aggregate);
                        }
                        None => {
                            warn!("{point}: all {} repetition(s) failed, omitting", self.config.runs);
                        }
                    }
                }
            }
        }

        progress.finish_and_clear();
        Ok(matrix)
    }

    /// The sequential variant has exactly one implicit worker slot
    fn worker_dimension(&self, variant: Variant) -> Vec<Option<u32>> {
        match variant {
            Variant::Sequential => vec![None],
            Variant::Parallel | Variant::Spawned => {
                self.config.worker_counts.iter().map(|&w| Some(w)).collect()
            }
        }
    }

    /// Run all repetitions of one point and average the successes
    fn measure_point(
        &self,
        template: &CommandTemplate,
        point: &ConfigurationPoint,
        progress: &ProgressBar,
    ) -> Option<AggregateResult> {
        let mut samples = Vec::with_capacity(self.config.runs);

        for repetition in 0..self.config.runs {
            progress.set_message(format!("{point}"));
            let sample = self.run_once(template, point);
            match &sample {
                Sample::Time(secs) => {
                    debug!("{point} run {}/{}: {secs:.6}s", repetition + 1, self.config.runs)
                }
                Sample::Failed(failure) => warn!(
                    "{point} run {}/{}: {failure}",
                    repetition + 1,
                    self.config.runs
                ),
            }
            samples.push(sample);
            progress.inc(1);
        }

        AggregateResult::from_samples(&samples)
    }

    /// One repetition: optional build step, then the measured run
    fn run_once(&self, template: &CommandTemplate, point: &ConfigurationPoint) -> Sample {
        if let Some(build_argv) = template.build_argv(point.total_points, point.workers) {
            match self.invoke(&build_argv) {
                Ok(RunOutcome::Completed { exit_code: 0, .. }) => {}
                Ok(RunOutcome::Completed { exit_code, .. }) => {
                    return Sample::Failed(SampleFailure::BuildFailed(exit_code));
                }
                // A build that hits the budget counts as a failed build
                Ok(RunOutcome::TimedOut) => {
                    return Sample::Failed(SampleFailure::BuildFailed(-1));
                }
                Err(e) => {
                    warn!("Build step could not be started: {e:#}");
                    return Sample::Failed(SampleFailure::BuildFailed(-1));
                }
            }
        }

        let run_argv = template.run_argv(point.total_points, point.workers);
        match self.invoke(&run_argv) {
            Ok(RunOutcome::TimedOut) => {
                Sample::Failed(SampleFailure::TimedOut(self.config.timeout_secs))
            }
            Ok(RunOutcome::Completed { exit_code, .. }) if exit_code != 0 => {
                // Partial output from a failing run is never salvaged
                Sample::Failed(SampleFailure::RunFailed(exit_code))
            }
            Ok(RunOutcome::Completed { output, .. }) => match extract_execution_time(&output) {
                Some(secs) => Sample::Time(secs),
                // Covers both a missing marker and output truncated mid-flush
                None => Sample::Failed(SampleFailure::MissingTime),
            },
            Err(e) => {
                warn!("Run command could not be started: {e:#}");
                Sample::Failed(SampleFailure::RunFailed(-1))
            }
        }
    }

    fn invoke(&self, argv: &[String]) -> Result<RunOutcome> {
        // Config validation guarantees a non-empty argv
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("empty command"))?;
        self.runner.run(program, args)
    }

    fn progress_bar(&self) -> ProgressBar {
        let per_variant_points = self.config.total_points.len();
        let invocations = self.config.runs
            * (per_variant_points
                + 2 * per_variant_points * self.config.worker_counts.len());

        let pb = ProgressBar::new(invocations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:60.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
        pb
    }
}
