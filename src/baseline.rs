//! Run-wide noise floor estimation
//!
//! A robust (low-percentile) estimate of the noise floor amplitude across
//! the run. SNR computations everywhere else divide by this value.

use tracing::debug;

use crate::config::ClassificationConfig;
use crate::stats::percentile;
use crate::types::SampleRecord;

/// Estimate the run noise baseline (g).
///
/// Takes the configured low percentile (p20 by default) of all non-null
/// per-sample floor amplitudes; a literal `0.0` floor participates. Falls
/// back to the configured constant when no floor is present at all.
pub fn run_noise_baseline_g(samples: &[SampleRecord], cfg: &ClassificationConfig) -> f64 {
    let floors: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.strength_floor_amp_g)
        .collect();
    let baseline = percentile(&floors, cfg.noise_baseline_percentile)
        .unwrap_or(cfg.noise_baseline_fallback_g);
    debug!(
        n_floors = floors.len(),
        baseline_g = baseline,
        "run noise baseline estimated"
    );
    baseline
}
