//! Per-frequency-bin peak statistics and classification
//!
//! Aggregates every sample's top-peak list into 1-Hz bins across the
//! analysis window, then classifies each bin as baseline noise, transient,
//! patterned resonance, or persistent fault.

use std::collections::BTreeMap;

use crate::config::{AnalysisConfig, ClassificationConfig};
use crate::stats::{mean, percentile, std_dev, EPS_AMP_G};
use crate::types::{PeakClassification, SampleRecord, SensorLocation};

/// One matched peak occurrence inside a frequency bin.
#[derive(Debug, Clone, Copy)]
pub struct BinPoint {
    pub sample_idx: usize,
    pub amp_g: f64,
    pub speed_kmh: Option<f64>,
    pub location: SensorLocation,
    pub t_s: Option<f64>,
    pub strength_db: Option<f64>,
}

/// Aggregate statistics for one 1-Hz frequency bin across the run.
#[derive(Debug, Clone)]
pub struct BinStats {
    /// Lower edge of the bin (Hz)
    pub bin_hz: f64,
    /// Fraction of samples carrying a peak in this bin
    pub presence_ratio: f64,
    pub median_amp_g: f64,
    pub p95_amp_g: f64,
    pub max_amp_g: f64,
    /// `max / median`, clamped to [1, ∞)
    pub burstiness: f64,
    /// `p95 / run_noise_baseline`
    pub snr: f64,
    /// 1.0 when every sensor sees the bin equally; `None` below 2 sensors
    pub spatial_uniformity: Option<f64>,
    pub classification: PeakClassification,
    /// `p95 · presence / max(burstiness, 1)`
    pub persistence_score: f64,
    pub samples_with_peak: usize,
    /// One strongest point per contributing sample
    pub points: Vec<BinPoint>,
}

impl BinStats {
    /// Bin center frequency (Hz).
    pub fn center_hz(&self) -> f64 {
        self.bin_hz + 0.5
    }

    /// Band label from the amplitude-weighted median speed of the bin's
    /// points; `"unknown"` when no point carries a speed.
    pub fn amplitude_weighted_band(&self) -> String {
        let pairs: Vec<(f64, f64)> = self
            .points
            .iter()
            .filter_map(|p| p.speed_kmh.map(|v| (v, p.amp_g)))
            .collect();
        let Some(typical_speed) = crate::stats::weighted_percentile(&pairs, 50.0) else {
            return "unknown".to_string();
        };
        let speeds: Vec<f64> = pairs.iter().map(|(v, _)| *v).collect();
        let uniform = crate::speedbins::speeds_are_uniform(&speeds);
        crate::speedbins::label_for_band(
            crate::speedbins::band_start(typical_speed),
            uniform,
            typical_speed,
        )
    }
}

/// Classify one bin from its aggregate signals.
///
/// The cascade order is significant: noise gates run first, then the
/// transient gates, then patterned, with persistent as the remainder.
pub fn classify_peak(
    presence_ratio: f64,
    burstiness: f64,
    snr: f64,
    spatial_uniformity: Option<f64>,
    cfg: &ClassificationConfig,
) -> PeakClassification {
    if snr < cfg.snr_baseline_noise {
        return PeakClassification::BaselineNoise;
    }
    if let Some(uniformity) = spatial_uniformity {
        // Everything vibrating equally at high presence is the vehicle
        // itself, not a localized fault.
        if uniformity >= cfg.spatial_uniformity_noise
            && presence_ratio >= cfg.presence_patterned_min
        {
            return PeakClassification::BaselineNoise;
        }
    }
    if presence_ratio < cfg.presence_transient_max {
        return PeakClassification::Transient;
    }
    if burstiness > cfg.burstiness_transient {
        return PeakClassification::Transient;
    }
    if presence_ratio >= cfg.presence_patterned_min && burstiness <= cfg.burstiness_patterned_max {
        return PeakClassification::Patterned;
    }
    PeakClassification::Persistent
}

/// Collect per-bin statistics over all samples.
///
/// Bins outside `[min_hz, max_hz)` are ignored; a sample contributes at
/// most one point (its strongest peak) per bin.
pub fn collect_bin_stats(
    samples: &[SampleRecord],
    run_noise_baseline_g: f64,
    cfg: &AnalysisConfig,
) -> Vec<BinStats> {
    let total_samples = samples.len();
    if total_samples == 0 {
        return Vec::new();
    }
    let bin_width = cfg.frequency.bin_width_hz.max(0.25);

    // bin index -> per-sample strongest point
    let mut per_bin: BTreeMap<i64, BTreeMap<usize, BinPoint>> = BTreeMap::new();
    // client_id -> sample count (for per-sensor presence)
    let mut sensor_samples: BTreeMap<&str, usize> = BTreeMap::new();

    for (idx, sample) in samples.iter().enumerate() {
        *sensor_samples.entry(sample.client_id.as_str()).or_insert(0) += 1;
        for peak in &sample.top_peaks {
            if peak.hz < cfg.frequency.min_hz || peak.hz >= cfg.frequency.max_hz {
                continue;
            }
            let bin = (peak.hz / bin_width).floor() as i64;
            let point = BinPoint {
                sample_idx: idx,
                amp_g: peak.amp,
                speed_kmh: sample.speed_kmh,
                location: sample.location,
                t_s: sample.t_s,
                strength_db: sample.vibration_strength_db,
            };
            per_bin
                .entry(bin)
                .or_default()
                .entry(idx)
                .and_modify(|existing| {
                    if peak.amp > existing.amp_g {
                        *existing = point;
                    }
                })
                .or_insert(point);
        }
    }

    per_bin
        .into_iter()
        .map(|(bin, by_sample)| {
            let points: Vec<BinPoint> = by_sample.into_values().collect();
            let amps: Vec<f64> = points.iter().map(|p| p.amp_g).collect();
            let presence_ratio = points.len() as f64 / total_samples as f64;
            let median_amp_g = percentile(&amps, 50.0).unwrap_or(0.0);
            let p95_amp_g = percentile(&amps, 95.0).unwrap_or(0.0);
            let max_amp_g = amps.iter().copied().fold(0.0f64, f64::max);
            let burstiness = (max_amp_g / median_amp_g.max(EPS_AMP_G)).max(1.0);
            let snr = p95_amp_g / run_noise_baseline_g.max(EPS_AMP_G);
            let spatial_uniformity =
                spatial_uniformity_for_bin(samples, &points, &sensor_samples);
            let classification = classify_peak(
                presence_ratio,
                burstiness,
                snr,
                spatial_uniformity,
                &cfg.classification,
            );
            let persistence_score = p95_amp_g * presence_ratio / burstiness.max(1.0);
            BinStats {
                bin_hz: bin as f64 * bin_width,
                presence_ratio,
                median_amp_g,
                p95_amp_g,
                max_amp_g,
                burstiness,
                snr,
                spatial_uniformity,
                classification,
                persistence_score,
                samples_with_peak: amps.len(),
                points,
            }
        })
        .collect()
}

/// Spatial uniformity: inverted coefficient of variation of per-sensor
/// presence ratios. 1.0 means every sensor sees the bin equally.
fn spatial_uniformity_for_bin(
    samples: &[SampleRecord],
    points: &[BinPoint],
    sensor_samples: &BTreeMap<&str, usize>,
) -> Option<f64> {
    if sensor_samples.len() < 2 {
        return None;
    }
    let mut hits: BTreeMap<&str, usize> = BTreeMap::new();
    for p in points {
        let id = samples[p.sample_idx].client_id.as_str();
        *hits.entry(id).or_insert(0) += 1;
    }
    let ratios: Vec<f64> = sensor_samples
        .iter()
        .map(|(id, &n)| {
            let h = hits.get(id).copied().unwrap_or(0);
            h as f64 / n.max(1) as f64
        })
        .collect();
    let m = mean(&ratios)?;
    if m < 1e-9 {
        return Some(1.0);
    }
    let sd = std_dev(&ratios).unwrap_or(0.0);
    Some((1.0 - sd / m).clamp(0.0, 1.0))
}
