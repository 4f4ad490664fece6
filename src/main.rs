use anyhow::Result;
use pibench::{
    bench::{BenchmarkRun, Orchestrator, ResultStore},
    config::load_config,
    report, system_info,
};

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "pibench.yml";

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Benchmark sequential, parallel and spawned pi-estimation kernels from a YAML config"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full benchmark matrix and persist the results
    Run {
        /// Benchmark matrix config
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Summarize a previously persisted results file
    Report {
        /// Path to a results.json produced by `run`
        results: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { config } => {
            let config = load_config(config)?;
            let store = ResultStore::new(config.results_dir.clone());

            info!(
                "Benchmarking {} dataset size(s) x {} worker count(s), {} run(s) each",
                config.total_points.len(),
                config.worker_counts.len(),
                config.runs
            );

            let matrix = Orchestrator::new(config).run()?;

            // Nothing is written until the whole matrix pass has finished;
            // a failure past this point aborts with a nonzero exit
            let run = BenchmarkRun::new(matrix);
            let run_dir = store.persist(&run)?;
            system_info::dump_sys_info(&run_dir.join("system_info"))?;

            report::print_summary(&run.matrix);
            info!("Benchmark complete, results in {}", run_dir.display());
        }
        Commands::Report { results } => {
            let matrix = ResultStore::load(results)?;
            report::print_summary(&matrix);
        }
    }

    Ok(())
}
