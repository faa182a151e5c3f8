//! Speed-scaled reference-order matching
//!
//! Builds the reference order set from the vehicle parameters (wheel
//! 1x/2x/3x, driveshaft 1x/2x, engine 1x/2x), matches each sample's peak
//! list against the speed-scaled reference frequency inside a tolerant
//! window, and aggregates match quality per reference.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::speedbins;
use crate::stats::{pearson, Correlation, EPS_AMP_G, EPS_FREQ_HZ};
use crate::types::{RunMetadata, SampleRecord, SensorLocation, SuspectedSource};

/// One speed-scaled reference order.
#[derive(Debug, Clone)]
pub struct OrderRef {
    /// e.g. `wheel_1x`, `driveshaft_2x`
    pub key: String,
    /// e.g. `"1x wheel order"`
    pub label: String,
    pub source: SuspectedSource,
    /// Multiple of the base rotational frequency
    pub multiple: f64,
    kind: OrderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderKind {
    Wheel,
    Driveshaft,
    Engine,
}

/// One matched sample peak for a reference.
#[derive(Debug, Clone)]
pub struct MatchPoint {
    pub sample_idx: usize,
    pub speed_kmh: f64,
    pub amp_g: f64,
    pub location: SensorLocation,
    pub matched_hz: f64,
    pub ref_hz: f64,
    pub rel_error: f64,
    pub sensor_id: String,
    pub strength_db: Option<f64>,
    pub t_s: Option<f64>,
}

/// Aggregated match result for one reference order.
#[derive(Debug, Clone)]
pub struct OrderMatch {
    pub reference: OrderRef,
    pub matches: Vec<MatchPoint>,
    /// Samples with valid speed, per location (match opportunities)
    pub possible_by_location: BTreeMap<SensorLocation, usize>,
    /// `matched / Σ possible`, possibly substituted by the focused band
    pub effective_match_rate: f64,
    /// Band start when the focused-band rescue substituted the rate
    pub rescued_band_start: Option<f64>,
    /// |Pearson(amp, speed)| clamped to [0, 1]; undefined on zero variance
    pub corr: Correlation,
    /// Strongest / second-strongest location mean amplitude (1.0 for a
    /// single location)
    pub dominance_ratio: f64,
    /// Amplitude-weighted mean strength of the matched samples (dB)
    pub absolute_strength_db: f64,
    pub mean_rel_error: f64,
    pub strongest_speed_band_start: Option<f64>,
    pub strongest_speed_band_label: String,
    /// Distinct locations with at least 3 matched points
    pub corroborating_locations: usize,
}

/// Build the reference order set the run metadata supports.
///
/// Wheel orders need a tire circumference; driveshaft orders additionally
/// need the final drive ratio; engine orders the gear ratio on top.
pub fn reference_orders(metadata: &RunMetadata) -> Vec<OrderRef> {
    let mut refs = Vec::new();
    if metadata.tire_circumference_m.is_none() {
        return refs;
    }
    for multiple in [1.0, 2.0, 3.0] {
        refs.push(OrderRef {
            key: format!("wheel_{}x", multiple as u8),
            label: format!("{}x wheel order", multiple as u8),
            source: SuspectedSource::WheelTire,
            multiple,
            kind: OrderKind::Wheel,
        });
    }
    if metadata.final_drive_ratio.is_none() {
        return refs;
    }
    for multiple in [1.0, 2.0] {
        refs.push(OrderRef {
            key: format!("driveshaft_{}x", multiple as u8),
            label: format!("{}x driveshaft order", multiple as u8),
            source: SuspectedSource::Driveline,
            multiple,
            kind: OrderKind::Driveshaft,
        });
    }
    if metadata.current_gear_ratio.is_none() {
        return refs;
    }
    for multiple in [1.0, 2.0] {
        refs.push(OrderRef {
            key: format!("engine_{}x", multiple as u8),
            label: format!("{}x engine order", multiple as u8),
            source: SuspectedSource::Engine,
            multiple,
            kind: OrderKind::Engine,
        });
    }
    refs
}

/// Wheel-1x frequency (Hz) at `speed_kmh` for a given tire circumference.
pub fn wheel_hz_from_speed_kmh(speed_kmh: f64, tire_circumference_m: f64) -> Option<f64> {
    if !speed_kmh.is_finite() || speed_kmh < 0.0 || tire_circumference_m <= 0.0 {
        return None;
    }
    Some(speed_kmh / 3.6 / tire_circumference_m)
}

impl OrderRef {
    /// Reference frequency at `speed_kmh`, or `None` when the metadata
    /// lacks a required ratio.
    pub fn reference_hz(&self, speed_kmh: f64, metadata: &RunMetadata) -> Option<f64> {
        let wheel = wheel_hz_from_speed_kmh(speed_kmh, metadata.tire_circumference_m?)?;
        let base = match self.kind {
            OrderKind::Wheel => wheel,
            OrderKind::Driveshaft => wheel * metadata.final_drive_ratio?,
            OrderKind::Engine => {
                wheel * metadata.final_drive_ratio? * metadata.current_gear_ratio?
            }
        };
        Some(base * self.multiple)
    }
}

/// Match all samples against all supported reference orders.
pub fn match_orders(
    samples: &[SampleRecord],
    metadata: &RunMetadata,
    cfg: &AnalysisConfig,
) -> Vec<OrderMatch> {
    reference_orders(metadata)
        .into_iter()
        .map(|reference| match_one_reference(reference, samples, metadata, cfg))
        .collect()
}

fn match_one_reference(
    reference: OrderRef,
    samples: &[SampleRecord],
    metadata: &RunMetadata,
    cfg: &AnalysisConfig,
) -> OrderMatch {
    let tolerance = cfg.orders.match_tolerance;
    let mut matches: Vec<MatchPoint> = Vec::new();
    let mut possible_by_location: BTreeMap<SensorLocation, usize> = BTreeMap::new();
    // Per band: (possible, matched) for the focused-band rescue.
    let mut band_possible: BTreeMap<i64, usize> = BTreeMap::new();
    let mut band_matched: BTreeMap<i64, usize> = BTreeMap::new();
    let mut run_speed_sum = 0.0f64;
    let mut run_speed_n = 0usize;

    for (idx, sample) in samples.iter().enumerate() {
        let Some(speed) = sample.speed_kmh.filter(|v| v.is_finite() && *v > 0.0) else {
            continue;
        };
        let Some(ref_hz) = reference.reference_hz(speed, metadata) else {
            continue;
        };
        *possible_by_location.entry(sample.location).or_insert(0) += 1;
        let band = speedbins::band_start(speed) as i64;
        *band_possible.entry(band).or_insert(0) += 1;
        run_speed_sum += speed;
        run_speed_n += 1;

        let best = sample
            .top_peaks
            .iter()
            .map(|p| (p, (p.hz - ref_hz).abs() / ref_hz.max(EPS_FREQ_HZ)))
            .filter(|(_, rel)| *rel <= tolerance)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((peak, rel_error)) = best {
            *band_matched.entry(band).or_insert(0) += 1;
            matches.push(MatchPoint {
                sample_idx: idx,
                speed_kmh: speed,
                amp_g: peak.amp,
                location: sample.location,
                matched_hz: peak.hz,
                ref_hz,
                rel_error,
                sensor_id: sample.client_id.clone(),
                strength_db: sample.vibration_strength_db,
                t_s: sample.t_s,
            });
        }
    }

    let possible_total: usize = possible_by_location.values().sum();
    let mut effective_match_rate = matches.len() as f64 / possible_total.max(1) as f64;

    // Focused-band rescue: a fault that only expresses in one speed band
    // (e.g. a resonance window) should not be diluted by the whole run.
    let mut rescued_band_start = None;
    if effective_match_rate < cfg.orders.rescue_trigger_rate {
        if let Some((band, rate)) = best_rescue_band(&band_possible, &band_matched, cfg) {
            effective_match_rate = rate;
            rescued_band_start = Some(band as f64);
        }
    }

    let speeds: Vec<f64> = matches.iter().map(|m| m.speed_kmh).collect();
    let amps: Vec<f64> = matches.iter().map(|m| m.amp_g).collect();
    let corr = match pearson(&amps, &speeds) {
        Correlation::Defined(r) => Correlation::Defined(r.abs().clamp(0.0, 1.0)),
        Correlation::Undefined => Correlation::Undefined,
    };

    let dominance_ratio = dominance_ratio(&matches);
    let absolute_strength_db = amplitude_weighted_strength_db(&matches);
    let mean_rel_error = if matches.is_empty() {
        0.0
    } else {
        matches.iter().map(|m| m.rel_error).sum::<f64>() / matches.len() as f64
    };

    // A uniform-speed run is one where every valid-speed sample falls into
    // a single canonical band.
    let uniform_run = band_possible.len() <= 1;
    let run_mean_speed = run_speed_sum / run_speed_n.max(1) as f64;
    let (strongest_speed_band_start, strongest_speed_band_label) = strongest_speed_band(
        &matches,
        &band_possible,
        &band_matched,
        rescued_band_start,
        uniform_run,
        run_mean_speed,
    );

    let mut per_location_counts: BTreeMap<SensorLocation, usize> = BTreeMap::new();
    for m in &matches {
        *per_location_counts.entry(m.location).or_insert(0) += 1;
    }
    let corroborating_locations = per_location_counts.values().filter(|&&n| n >= 3).count();

    debug!(
        reference = %reference.key,
        matched = matches.len(),
        possible = possible_total,
        rate = effective_match_rate,
        "order reference matched"
    );

    OrderMatch {
        reference,
        matches,
        possible_by_location,
        effective_match_rate,
        rescued_band_start,
        corr,
        dominance_ratio,
        absolute_strength_db,
        mean_rel_error,
        strongest_speed_band_start,
        strongest_speed_band_label,
        corroborating_locations,
    }
}

/// The single band qualifying for rescue, best in-band rate first, lowest
/// band on ties.
fn best_rescue_band(
    band_possible: &BTreeMap<i64, usize>,
    band_matched: &BTreeMap<i64, usize>,
    cfg: &AnalysisConfig,
) -> Option<(i64, f64)> {
    let mut best: Option<(i64, f64)> = None;
    for (&band, &possible) in band_possible {
        if possible < cfg.orders.rescue_min_band_samples {
            continue;
        }
        let matched = band_matched.get(&band).copied().unwrap_or(0);
        let rate = matched as f64 / possible as f64;
        if rate < cfg.orders.rescue_min_band_rate {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_rate)) => rate > best_rate,
        };
        if better {
            best = Some((band, rate));
        }
    }
    best
}

/// Strongest / second-strongest per-location mean amplitude.
fn dominance_ratio(matches: &[MatchPoint]) -> f64 {
    let mut sums: BTreeMap<SensorLocation, (f64, usize)> = BTreeMap::new();
    for m in matches {
        let entry = sums.entry(m.location).or_insert((0.0, 0));
        entry.0 += m.amp_g;
        entry.1 += 1;
    }
    let mut means: Vec<f64> = sums
        .values()
        .map(|(sum, n)| sum / (*n).max(1) as f64)
        .collect();
    if means.len() < 2 {
        return 1.0;
    }
    means.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    means[0] / means[1].max(EPS_AMP_G)
}

/// Amplitude-weighted mean of matched-sample strengths (dB).
fn amplitude_weighted_strength_db(matches: &[MatchPoint]) -> f64 {
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for m in matches {
        if let Some(db) = m.strength_db {
            weighted += db * m.amp_g;
            weight += m.amp_g;
        }
    }
    if weight < EPS_AMP_G {
        0.0
    } else {
        weighted / weight
    }
}

/// The band maximizing `mean(amp) · presence`; rescue bands win outright.
fn strongest_speed_band(
    matches: &[MatchPoint],
    band_possible: &BTreeMap<i64, usize>,
    band_matched: &BTreeMap<i64, usize>,
    rescued_band_start: Option<f64>,
    uniform: bool,
    mean_speed: f64,
) -> (Option<f64>, String) {
    if matches.is_empty() {
        return (None, "unknown".to_string());
    }
    if let Some(band) = rescued_band_start {
        return (
            Some(band),
            speedbins::label_for_band(band, uniform, mean_speed),
        );
    }

    let mut amp_sums: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for m in matches {
        let band = speedbins::band_start(m.speed_kmh) as i64;
        let entry = amp_sums.entry(band).or_insert((0.0, 0));
        entry.0 += m.amp_g;
        entry.1 += 1;
    }
    let mut best: Option<(i64, f64)> = None;
    for (&band, &(amp_sum, n)) in &amp_sums {
        let mean_amp = amp_sum / n.max(1) as f64;
        let possible = band_possible.get(&band).copied().unwrap_or(0);
        let matched = band_matched.get(&band).copied().unwrap_or(0);
        let presence = matched as f64 / possible.max(1) as f64;
        let product = mean_amp * presence;
        let better = match best {
            None => true,
            Some((_, best_product)) => product > best_product,
        };
        if better {
            best = Some((band, product));
        }
    }
    match best {
        Some((band, _)) => (
            Some(band as f64),
            speedbins::label_for_band(band as f64, uniform, mean_speed),
        ),
        None => (None, "unknown".to_string()),
    }
}
