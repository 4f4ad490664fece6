use crate::bench::metrics;
use crate::bench::{ResultMatrix, Variant};

/// Print a per-dataset-size summary of a result matrix.
///
/// Speedup and efficiency are recomputed here from the stored averages with
/// the same formulas the orchestrator side uses, so a reloaded artifact and
/// a fresh run always report identical numbers.
pub fn print_summary(matrix: &ResultMatrix) {
    println!("{}", "=".repeat(80));
    println!("BENCHMARK SUMMARY");
    println!("{}", "=".repeat(80));

    if matrix.is_empty() {
        println!("No configuration point produced a usable measurement.");
        return;
    }

    for total_points in matrix.dataset_sizes() {
        println!("\nDataset size: {total_points} points");
        println!("{}", "-".repeat(80));

        let baseline = matrix.sequential_secs(total_points);
        match baseline {
            Some(secs) => println!("  Sequential:  {secs:.6}s"),
            None => println!("  Sequential:  (no successful runs)"),
        }

        for variant in [Variant::Parallel, Variant::Spawned] {
            let Some(results) = matrix.worker_results(variant, total_points) else {
                continue;
            };
            println!("  {}:", variant_label(variant));

            for (&workers, &secs) in results {
                // Without a baseline the derived metrics are undefined and
                // must not be substituted with defaults
                match baseline.and_then(|seq| metrics::derive(seq, secs, workers)) {
                    Some(m) => println!(
                        "    {workers:2} worker(s): {secs:.6}s  (speedup: {:.2}x, efficiency: {:.1}%)",
                        m.speedup, m.efficiency
                    ),
                    None => println!("    {workers:2} worker(s): {secs:.6}s"),
                }
            }
        }
    }
}

fn variant_label(variant: Variant) -> &'static str {
    match variant {
        Variant::Sequential => "Sequential",
        Variant::Parallel => "Parallel (static)",
        Variant::Spawned => "Spawned (dynamic)",
    }
}
