mod command;
pub use command::{ProcessRunner, RunOutcome};
mod extract;
pub use extract::extract_execution_time;
mod matrix;
pub use matrix::{
    AggregateResult, ConfigurationPoint, ResultMatrix, Sample, SampleFailure, Variant,
};
pub mod metrics;
mod runner;
pub use runner::Orchestrator;
mod store;
pub use store::{BenchmarkRun, ResultStore};
