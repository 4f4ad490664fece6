//! Speedup and efficiency relative to the sequential baseline.
//!
//! The reporting side recomputes these from the persisted artifact with the
//! same functions; keeping both sides on this module is what prevents the
//! two from silently diverging.

/// Speedup of a variant over the sequential baseline.
///
/// Defined only for a positive variant time; the caller supplies both
/// averages, so an absent baseline never reaches this function.
pub fn speedup(seq_secs: f64, variant_secs: f64) -> Option<f64> {
    if variant_secs > 0.0 {
        Some(seq_secs / variant_secs)
    } else {
        None
    }
}

/// Efficiency as a percentage of ideal linear scaling
pub fn efficiency(speedup: f64, workers: u32) -> Option<f64> {
    if workers >= 1 {
        Some(speedup / workers as f64 * 100.0)
    } else {
        None
    }
}

/// Derived metrics for one worker count of a parallel or spawned variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub speedup: f64,
    pub efficiency: f64,
}

/// Compute both metrics at once; `None` when either is undefined
pub fn derive(seq_secs: f64, variant_secs: f64, workers: u32) -> Option<DerivedMetrics> {
    let speedup = speedup(seq_secs, variant_secs)?;
    let efficiency = efficiency(speedup, workers)?;
    Some(DerivedMetrics {
        speedup,
        efficiency,
    })
}
