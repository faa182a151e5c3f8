//! Source-aware localization
//!
//! Aggregates per-location intensity, selects the hotspot location for a
//! finding (wheel-class findings prefer wheel sensors even when a cabin
//! sensor rides the transfer path louder), flags weak spatial separation
//! and ambiguity, and detects diffuse excitation.

use std::collections::BTreeMap;

use crate::config::{AnalysisConfig, LocalizationConfig};
use crate::stats::{percentile, EPS_AMP_G};
use crate::types::{
    BucketCounts, SampleRecord, SensorIntensityRow, SensorLocation, StrengthBucketDistribution,
    SuspectedSource,
};

// ============================================================================
// Strength buckets
// ============================================================================

/// Bucket index (0..=5) for a strength value (dB).
///
/// Ranges: `[-inf,0) [0,8) [8,16) [16,26) [26,36) [36,inf)`.
pub fn bucket_for_strength(db: f64) -> usize {
    if db < 0.0 {
        0
    } else if db < 8.0 {
        1
    } else if db < 16.0 {
        2
    } else if db < 26.0 {
        3
    } else if db < 36.0 {
        4
    } else {
        5
    }
}

fn bucket_distribution(strengths: &[f64]) -> StrengthBucketDistribution {
    let mut counts = [0usize; 6];
    for &db in strengths {
        counts[bucket_for_strength(db)] += 1;
    }
    let total = strengths.len().max(1) as f64;
    let pct = |n: usize| n as f64 / total * 100.0;
    StrengthBucketDistribution {
        counts: BucketCounts {
            l0: counts[0],
            l1: counts[1],
            l2: counts[2],
            l3: counts[3],
            l4: counts[4],
            l5: counts[5],
        },
        percent_time_l0: pct(counts[0]),
        percent_time_l1: pct(counts[1]),
        percent_time_l2: pct(counts[2]),
        percent_time_l3: pct(counts[3]),
        percent_time_l4: pct(counts[4]),
        percent_time_l5: pct(counts[5]),
    }
}

// ============================================================================
// Per-location intensity rows
// ============================================================================

/// Aggregate strength statistics per canonical location.
///
/// A literal 0.0 dB strength is a measurement and participates in counts
/// and percentiles. Rows sort by max intensity descending, ties by
/// canonical location order.
pub fn sensor_intensity_rows(
    samples: &[SampleRecord],
    cfg: &AnalysisConfig,
) -> Vec<SensorIntensityRow> {
    let mut by_location: BTreeMap<SensorLocation, Vec<f64>> = BTreeMap::new();
    let mut counts: BTreeMap<SensorLocation, usize> = BTreeMap::new();
    for s in samples {
        *counts.entry(s.location).or_insert(0) += 1;
        if let Some(db) = s.vibration_strength_db {
            by_location.entry(s.location).or_default().push(db);
        } else {
            by_location.entry(s.location).or_default();
        }
    }
    let max_count = counts.values().copied().max().unwrap_or(0);

    let mut rows: Vec<SensorIntensityRow> = counts
        .iter()
        .map(|(&location, &sample_count)| {
            let strengths = by_location.get(&location).cloned().unwrap_or_default();
            let coverage = if max_count == 0 {
                0.0
            } else {
                sample_count as f64 / max_count as f64
            };
            let partial = coverage < cfg.suitability.partial_coverage_ratio;
            SensorIntensityRow {
                location: location.label().to_string(),
                sample_count,
                p50_intensity_db: percentile(&strengths, 50.0),
                p95_intensity_db: percentile(&strengths, 95.0),
                max_intensity_db: percentile(&strengths, 100.0),
                strength_bucket_distribution: bucket_distribution(&strengths),
                sample_coverage_ratio: coverage,
                partial_coverage: partial,
                sample_coverage_warning: sample_count < cfg.suitability.min_location_samples
                    || partial,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let a_max = a.max_intensity_db.unwrap_or(f64::NEG_INFINITY);
        let b_max = b.max_intensity_db.unwrap_or(f64::NEG_INFINITY);
        b_max
            .partial_cmp(&a_max)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.location.cmp(&b.location))
    });
    rows
}

// ============================================================================
// Hotspot selection
// ============================================================================

/// Outcome of source-aware hotspot selection for one finding.
#[derive(Debug, Clone)]
pub struct LocationSelection {
    /// Canonical label, or `"ambiguous location: <L1> / <L2>"`
    pub location_label: String,
    pub primary: Option<SensorLocation>,
    pub alternatives: Vec<String>,
    /// Strongest / second-strongest mean amplitude within the source filter
    pub dominance_ratio: f64,
    pub weak_spatial_separation: bool,
    pub ambiguous: bool,
    pub localization_confidence: f64,
    /// Locations with at least one matched point (unfiltered)
    pub n_matched_locations: usize,
    /// Wheel-class finding with no wheel sensors anywhere in the run
    pub no_wheel_sensors: bool,
}

impl Default for LocationSelection {
    fn default() -> Self {
        Self {
            location_label: "unknown".to_string(),
            primary: None,
            alternatives: Vec::new(),
            dominance_ratio: 1.0,
            weak_spatial_separation: true,
            ambiguous: false,
            localization_confidence: 0.0,
            n_matched_locations: 0,
            no_wheel_sensors: false,
        }
    }
}

/// Select the hotspot location from `(location, amp)` evidence points.
///
/// For wheel-class sources with wheel sensors in the run the candidate set
/// is restricted to wheel locations (transfer-path suppression); cabin or
/// chassis sensors can ride louder without claiming the fault. Without
/// wheel sensors the globally strongest location wins.
///
/// `n_run_locations` is the number of locations connected during the run;
/// a signal seen at exactly one of several connected locations is strongly
/// localized, while one sensor alone can never corroborate itself.
pub fn select_location(
    points: &[(SensorLocation, f64)],
    suspected_source: SuspectedSource,
    run_has_wheel_sensors: bool,
    n_run_locations: usize,
    cfg: &LocalizationConfig,
) -> LocationSelection {
    if points.is_empty() {
        return LocationSelection::default();
    }

    let mut sums: BTreeMap<SensorLocation, (f64, usize)> = BTreeMap::new();
    for &(loc, amp) in points {
        let entry = sums.entry(loc).or_insert((0.0, 0));
        entry.0 += amp;
        entry.1 += 1;
    }
    let n_matched_locations = sums.len();

    let wheel_filter = suspected_source.is_wheel_class()
        && run_has_wheel_sensors
        && sums.keys().any(|loc| loc.is_wheel());
    let no_wheel_sensors = suspected_source.is_wheel_class() && !run_has_wheel_sensors;

    // (location, mean amp), strongest first; canonical order breaks ties.
    let mut candidates: Vec<(SensorLocation, f64)> = sums
        .iter()
        .filter(|(loc, _)| !wheel_filter || loc.is_wheel())
        .map(|(&loc, &(sum, n))| (loc, sum / n.max(1) as f64))
        .collect();
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let Some(&(top_loc, top_amp)) = candidates.first() else {
        return LocationSelection::default();
    };

    let second = candidates.get(1).copied();
    let dominance_ratio = second.map_or(1.0, |(_, amp)| top_amp / amp.max(EPS_AMP_G));

    let ambiguous = second.is_some() && dominance_ratio < cfg.dominance_ambiguous;
    let weak_spatial_separation = match n_matched_locations {
        // A single matched location among several connected sensors is the
        // sharpest separation there is; a single-sensor run can never
        // corroborate, which the scorer handles separately.
        0 | 1 => n_run_locations <= 1,
        2 => dominance_ratio < cfg.weak_separation_2_locations,
        3 => dominance_ratio < cfg.weak_separation_3_locations,
        _ => dominance_ratio < cfg.weak_separation_4plus_locations,
    };

    let location_label = if ambiguous {
        let (second_loc, _) = second.unwrap_or((top_loc, 0.0));
        format!("ambiguous location: {} / {}", top_loc.label(), second_loc.label())
    } else {
        top_loc.label().to_string()
    };

    let alternatives: Vec<String> = candidates
        .iter()
        .skip(1)
        .take(2)
        .map(|(loc, _)| loc.label().to_string())
        .collect();

    let localization_confidence = if n_matched_locations == 1 {
        if n_run_locations > 1 {
            // Exclusive to one corner while the others stay quiet.
            0.9
        } else {
            0.5
        }
    } else {
        let graded = (0.3 + 0.4 * (dominance_ratio - 1.0)).clamp(0.3, 1.0);
        if ambiguous {
            graded.min(cfg.ambiguous_localization_cap)
        } else {
            graded
        }
    };

    LocationSelection {
        location_label,
        primary: Some(top_loc),
        alternatives,
        dominance_ratio,
        weak_spatial_separation,
        ambiguous,
        localization_confidence,
        n_matched_locations,
        no_wheel_sensors,
    }
}

// ============================================================================
// Diffuse excitation
// ============================================================================

/// Diffuse-excitation verdict.
#[derive(Debug, Clone, Copy)]
pub struct DiffuseResult {
    pub is_diffuse: bool,
    /// Confidence multiplier (1.0 when not diffuse)
    pub penalty: f64,
}

/// Detect diffuse excitation: match rates and amplitudes uniform across
/// locations. Needs at least 2 locations with 3+ matched samples each.
pub fn detect_diffuse(
    points: &[(SensorLocation, f64)],
    possible_by_location: &BTreeMap<SensorLocation, usize>,
    cfg: &LocalizationConfig,
) -> DiffuseResult {
    let not_diffuse = DiffuseResult {
        is_diffuse: false,
        penalty: 1.0,
    };

    let mut sums: BTreeMap<SensorLocation, (f64, usize)> = BTreeMap::new();
    for &(loc, amp) in points {
        let entry = sums.entry(loc).or_insert((0.0, 0));
        entry.0 += amp;
        entry.1 += 1;
    }
    let qualified: Vec<(SensorLocation, f64, usize)> = sums
        .iter()
        .filter(|(_, (_, n))| *n >= cfg.diffuse_min_samples_per_location)
        .map(|(&loc, &(sum, n))| (loc, sum / n.max(1) as f64, n))
        .collect();
    if qualified.len() < cfg.diffuse_min_locations {
        return not_diffuse;
    }

    let rates: Vec<f64> = qualified
        .iter()
        .map(|(loc, _, n)| {
            let possible = possible_by_location.get(loc).copied().unwrap_or(*n);
            *n as f64 / possible.max(1) as f64
        })
        .collect();
    let amps: Vec<f64> = qualified.iter().map(|(_, amp, _)| *amp).collect();

    if relative_range(&rates) < cfg.diffuse_rate_range_max
        && relative_range(&amps) < cfg.diffuse_amp_range_max
    {
        DiffuseResult {
            is_diffuse: true,
            penalty: cfg.diffuse_penalty,
        }
    } else {
        not_diffuse
    }
}

/// `(max - min) / max`, 0.0 for degenerate input.
fn relative_range(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if !max.is_finite() || !min.is_finite() || max <= EPS_AMP_G {
        return 0.0;
    }
    (max - min) / max
}
