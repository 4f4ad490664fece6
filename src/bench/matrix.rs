use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One of the three execution strategies under measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Single-process baseline
    Sequential,
    /// Fixed number of homogeneous MPI processes
    Parallel,
    /// One controller process that spawns workers at runtime
    Spawned,
}

impl Variant {
    /// All variants, in the fixed order the matrix is traversed
    pub const ALL: [Variant; 3] = [Variant::Sequential, Variant::Parallel, Variant::Spawned];

    /// Section name used in the persisted result artifact
    pub fn key(&self) -> &'static str {
        match self {
            Variant::Sequential => "sequential",
            Variant::Parallel => "parallel",
            Variant::Spawned => "spawned",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One point of the configuration matrix
///
/// `workers` is `None` for the sequential variant, which is not
/// cross-multiplied with the worker-count list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigurationPoint {
    pub variant: Variant,
    pub total_points: u64,
    pub workers: Option<u32>,
}

impl fmt::Display for ConfigurationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.workers {
            Some(w) => write!(f, "{} points={} workers={}", self.variant, self.total_points, w),
            None => write!(f, "{} points={}", self.variant, self.total_points),
        }
    }
}

/// Why a single repetition produced no usable timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleFailure {
    #[error("build step exited with status {0}")]
    BuildFailed(i32),
    #[error("run exited with status {0}")]
    RunFailed(i32),
    #[error("timed out after {0}s")]
    TimedOut(u64),
    #[error("no execution time marker found in output")]
    MissingTime,
}

/// One measured repetition: a timing in seconds, or a classified failure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Time(f64),
    Failed(SampleFailure),
}

/// Mean over the successful samples of one configuration point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
    /// Arithmetic mean of successful timings, in seconds
    pub mean_secs: f64,
    /// Number of successful samples that contributed (always >= 1)
    pub samples: usize,
}

impl AggregateResult {
    /// Average the successful samples, ignoring failures entirely.
    /// Returns `None` when no sample succeeded, so the point can be
    /// omitted from the matrix rather than recorded as zero.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let times: Vec<f64> = samples
            .iter()
            .filter_map(|s| match s {
                Sample::Time(t) => Some(*t),
                Sample::Failed(_) => None,
            })
            .collect();

        if times.is_empty() {
            return None;
        }

        Some(Self {
            mean_secs: times.iter().sum::<f64>() / times.len() as f64,
            samples: times.len(),
        })
    }
}

/// Aggregated averages for one full benchmark pass
///
/// Keys are numeric internally and ordered; serde renders them as their
/// canonical decimal strings at the JSON boundary and reconstructs them as
/// numbers on reload. Points with no successful samples are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    /// dataset size -> average seconds
    pub sequential: BTreeMap<u64, f64>,
    /// dataset size -> worker count -> average seconds
    pub parallel: BTreeMap<u64, BTreeMap<u32, f64>>,
    /// dataset size -> worker count -> average seconds
    pub spawned: BTreeMap<u64, BTreeMap<u32, f64>>,
}

impl ResultMatrix {
    /// Record the aggregate for one configuration point
    pub fn insert(&mut self, point: &ConfigurationPoint, aggregate: AggregateResult) {
        match (point.variant, point.workers) {
            (Variant::Sequential, _) => {
                self.sequential
                    .insert(point.total_points, aggregate.mean_secs);
            }
            (Variant::Parallel, Some(workers)) => {
                self.parallel
                    .entry(point.total_points)
                    .or_default()
                    .insert(workers, aggregate.mean_secs);
            }
            (Variant::Spawned, Some(workers)) => {
                self.spawned
                    .entry(point.total_points)
                    .or_default()
                    .insert(workers, aggregate.mean_secs);
            }
            // A parallel/spawned point without a worker count never
            // reaches here; the orchestrator always supplies one.
            (_, None) => {}
        }
    }

    /// Sequential baseline average for a dataset size, if present
    pub fn sequential_secs(&self, total_points: u64) -> Option<f64> {
        self.sequential.get(&total_points).copied()
    }

    /// Per-worker-count averages for a parallel or spawned variant
    pub fn worker_results(
        &self,
        variant: Variant,
        total_points: u64,
    ) -> Option<&BTreeMap<u32, f64>> {
        match variant {
            Variant::Sequential => None,
            Variant::Parallel => self.parallel.get(&total_points),
            Variant::Spawned => self.spawned.get(&total_points),
        }
    }

    /// Dataset sizes present anywhere in the matrix, ascending
    pub fn dataset_sizes(&self) -> Vec<u64> {
        let mut sizes: Vec<u64> = self
            .sequential
            .keys()
            .chain(self.parallel.keys())
            .chain(self.spawned.keys())
            .copied()
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn is_empty(&self) -> bool {
        self.sequential.is_empty() && self.parallel.is_empty() && self.spawned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_ignores_failures() {
        let samples = [
            Sample::Time(10.0),
            Sample::Failed(SampleFailure::TimedOut(300)),
            Sample::Time(14.0),
            Sample::Failed(SampleFailure::MissingTime),
        ];

        let agg = AggregateResult::from_samples(&samples).unwrap();
        assert_eq!(agg.mean_secs, 12.0);
        assert_eq!(agg.samples, 2);
    }

    #[test]
    fn test_aggregate_none_when_all_failed() {
        let samples = [
            Sample::Failed(SampleFailure::BuildFailed(2)),
            Sample::Failed(SampleFailure::RunFailed(1)),
        ];
        assert!(AggregateResult::from_samples(&samples).is_none());
    }

    #[test]
    fn test_aggregate_none_when_empty() {
        assert!(AggregateResult::from_samples(&[]).is_none());
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut matrix = ResultMatrix::default();
        matrix.insert(
            &ConfigurationPoint {
                variant: Variant::Sequential,
                total_points: 10_000_000,
                workers: None,
            },
            AggregateResult {
                mean_secs: 12.0,
                samples: 2,
            },
        );
        matrix.insert(
            &ConfigurationPoint {
                variant: Variant::Parallel,
                total_points: 10_000_000,
                workers: Some(4),
            },
            AggregateResult {
                mean_secs: 3.3,
                samples: 2,
            },
        );

        assert_eq!(matrix.sequential_secs(10_000_000), Some(12.0));
        assert_eq!(
            matrix
                .worker_results(Variant::Parallel, 10_000_000)
                .and_then(|m| m.get(&4))
                .copied(),
            Some(3.3)
        );
        assert!(matrix.worker_results(Variant::Spawned, 10_000_000).is_none());
        assert_eq!(matrix.dataset_sizes(), vec![10_000_000]);
    }

    #[test]
    fn test_json_keys_are_decimal_strings() {
        let mut matrix = ResultMatrix::default();
        matrix.sequential.insert(10_000_000, 12.5);

        let json = serde_json::to_value(&matrix).unwrap();
        assert!(json["sequential"]["10000000"].is_number());
    }
}
