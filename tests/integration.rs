use anyhow::Result;
use std::path::PathBuf;

use pibench::bench::{
    metrics, BenchmarkRun, Orchestrator, ResultStore, Variant,
};
use pibench::config::{CommandTemplate, MatrixConfig, VariantCommands};

fn sh(script: &str) -> CommandTemplate {
    CommandTemplate {
        build: None,
        run: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
    }
}

fn config(
    sequential: CommandTemplate,
    parallel: CommandTemplate,
    spawned: CommandTemplate,
) -> MatrixConfig {
    MatrixConfig {
        total_points: vec![10_000_000],
        worker_counts: vec![1, 2, 4],
        runs: 2,
        timeout_secs: 20,
        working_dir: None,
        results_dir: PathBuf::from("results"),
        variants: VariantCommands {
            sequential,
            parallel,
            spawned,
        },
    }
}

/// Full pipeline against stub kernels: orchestrate, persist, reload, and
/// recompute the derived metrics from the reloaded artifact.
#[test]
fn test_end_to_end_run_persist_reload_report() -> Result<()> {
    // Stub kernels report fixed timings per worker count
    let parallel_script = "\
case \"$1\" in
  1) echo 'Execution Time: 12.500000 seconds' ;;
  2) echo 'Execution Time: 6.400000 seconds' ;;
  4) echo 'Execution Time: 3.300000 seconds' ;;
esac";
    let parallel = CommandTemplate {
        build: None,
        run: vec![
            "sh".to_string(),
            "-c".to_string(),
            parallel_script.to_string(),
            "stub".to_string(),
            "{workers}".to_string(),
        ],
    };

    let config = config(
        sh("echo 'Execution Time: 12.000000 seconds'"),
        parallel.clone(),
        parallel,
    );

    let matrix = Orchestrator::new(config).run()?;

    let results_dir = tempfile::tempdir()?;
    let store = ResultStore::new(results_dir.path());
    let run = BenchmarkRun::new(matrix);
    let run_dir = store.persist(&run)?;

    let reloaded = ResultStore::load(&run_dir.join("results.json"))?;
    assert_eq!(reloaded, run.matrix);

    let seq = reloaded.sequential_secs(10_000_000).unwrap();
    assert_eq!(seq, 12.0);

    let parallel = reloaded.worker_results(Variant::Parallel, 10_000_000).unwrap();
    let expectations = [
        (1u32, 12.5, 0.96, 96.0),
        (2, 6.4, 1.875, 93.75),
        (4, 3.3, 3.636, 90.9),
    ];
    for (workers, secs, want_speedup, want_efficiency) in expectations {
        assert_eq!(parallel.get(&workers), Some(&secs));
        let m = metrics::derive(seq, secs, workers).unwrap();
        assert!((m.speedup - want_speedup).abs() < 1e-2, "workers={workers}");
        assert!(
            (m.efficiency - want_efficiency).abs() < 0.1,
            "workers={workers}"
        );
    }

    Ok(())
}

/// A repetition that blows the budget is killed and recorded as a failure;
/// the rest of the matrix still runs and the point averages only the
/// successful repetitions.
#[test]
fn test_timeout_is_nonfatal_and_excluded_from_average() -> Result<()> {
    let scratch = tempfile::tempdir()?;
    let marker = scratch.path().join("slow-once");
    // Sleeps past the budget on the first repetition only
    let script = format!(
        "if [ -e {m} ]; then echo 'Execution Time: 3.0 seconds'; else touch {m}; sleep 30; fi",
        m = marker.display()
    );

    let mut config = config(
        sh(&script),
        sh("echo 'Execution Time: 2.0 seconds'"),
        sh("echo 'Execution Time: 1.0 seconds'"),
    );
    config.worker_counts = vec![2];
    config.timeout_secs = 1;

    let matrix = Orchestrator::new(config).run()?;

    // Average over the single successful sequential repetition
    assert_eq!(matrix.sequential_secs(10_000_000), Some(3.0));
    // The remainder of the matrix was unaffected
    assert_eq!(
        matrix
            .worker_results(Variant::Parallel, 10_000_000)
            .and_then(|m| m.get(&2)),
        Some(&2.0)
    );
    assert_eq!(
        matrix
            .worker_results(Variant::Spawned, 10_000_000)
            .and_then(|m| m.get(&2)),
        Some(&1.0)
    );

    Ok(())
}

/// A missing sequential baseline leaves parallel averages intact but no
/// derived metrics are computable for that dataset size.
#[test]
fn test_missing_baseline_leaves_metrics_undefined() -> Result<()> {
    let config = config(
        sh("exit 1"),
        sh("echo 'Execution Time: 2.0 seconds'"),
        sh("echo 'Execution Time: 1.0 seconds'"),
    );

    let matrix = Orchestrator::new(config).run()?;

    assert!(matrix.sequential_secs(10_000_000).is_none());
    let parallel = matrix.worker_results(Variant::Parallel, 10_000_000).unwrap();
    assert_eq!(parallel.get(&2), Some(&2.0));

    // No baseline, no metrics: the Option chain used by the reporter
    let derived = matrix
        .sequential_secs(10_000_000)
        .and_then(|seq| metrics::derive(seq, 2.0, 2));
    assert!(derived.is_none());

    Ok(())
}

/// Build failures poison individual samples, not the session.
#[test]
fn test_build_failure_omits_point_only() -> Result<()> {
    let broken_build = CommandTemplate {
        build: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'cc: fatal error' >&2; exit 2".to_string(),
        ]),
        run: vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'Execution Time: 1.0 seconds'".to_string(),
        ],
    };

    let mut config = config(
        sh("echo 'Execution Time: 5.0 seconds'"),
        broken_build,
        sh("echo 'Execution Time: 2.5 seconds'"),
    );
    config.worker_counts = vec![2];

    let matrix = Orchestrator::new(config).run()?;

    assert_eq!(matrix.sequential_secs(10_000_000), Some(5.0));
    assert!(matrix.worker_results(Variant::Parallel, 10_000_000).is_none());
    assert!(matrix.worker_results(Variant::Spawned, 10_000_000).is_some());

    Ok(())
}
