//! Findings construction, suppression, and ranking
//!
//! Turns order matches, classified peak bins, and missing-input conditions
//! into `Finding` records, suppresses engine/driveline aliases under a
//! dominant wheel finding, and selects the ranked top causes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::confidence::{label_for, score_confidence, ConfidenceInputs};
use crate::config::AnalysisConfig;
use crate::localization::{detect_diffuse, select_location, LocationSelection};
use crate::orders::OrderMatch;
use crate::peaks::BinStats;
use crate::phases::PhaseAnalysis;
use crate::stats::{percentile, stable_hash_hex, Correlation, EPS_AMP_G, EPS_FREQ_HZ};
use crate::types::{
    DrivePhase, EvidenceMetrics, Finding, FindingType, PeakClassification, PhaseEvidence,
    RunMetadata, SampleRecord, SensorLocation, SuspectedSource, TopCause,
};

/// Transfer-path compliance applied when a wheel-class finding has to be
/// localized without any wheel sensor in the run.
const NO_WHEEL_SENSOR_PATH_COMPLIANCE: f64 = 1.25;

/// Everything the builder needs about the run.
pub struct FindingsInput<'a> {
    pub metadata: &'a RunMetadata,
    pub samples: &'a [SampleRecord],
    pub phase: &'a PhaseAnalysis,
    pub order_matches: &'a [OrderMatch],
    pub bin_stats: &'a [BinStats],
    pub run_noise_baseline_g: f64,
    pub constant_speed: bool,
    pub steady_speed: bool,
}

/// Build, suppress, and sort all findings for a run.
pub fn build_findings(input: &FindingsInput<'_>, cfg: &AnalysisConfig) -> Vec<Finding> {
    let run_locations = distinct_locations(input.samples);
    let run_has_wheel = run_locations.iter().any(|l| l.is_wheel());
    let n_run_locations = run_locations.len();

    let mut findings = Vec::new();
    let mut claimed_hz: Vec<f64> = Vec::new();

    for om in input.order_matches {
        if om.matches.len() < cfg.orders.min_matched
            || om.effective_match_rate < cfg.orders.min_match_rate
        {
            continue;
        }
        claimed_hz.extend(om.matches.iter().map(|m| m.matched_hz));
        findings.push(order_finding(
            input,
            om,
            run_has_wheel,
            n_run_locations,
            cfg,
        ));
    }

    findings.extend(peak_findings(
        input,
        &claimed_hz,
        run_has_wheel,
        n_run_locations,
        cfg,
    ));
    findings.extend(reference_findings(input));

    findings.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
    suppress_aliases(&mut findings, cfg);
    findings.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));

    debug!(count = findings.len(), "findings built");
    findings
}

/// Distinct canonical locations seen in the run, canonical order.
fn distinct_locations(samples: &[SampleRecord]) -> Vec<SensorLocation> {
    let mut locations: Vec<SensorLocation> = samples.iter().map(|s| s.location).collect();
    locations.sort();
    locations.dedup();
    locations
}

// ============================================================================
// Order findings
// ============================================================================

fn order_finding(
    input: &FindingsInput<'_>,
    om: &OrderMatch,
    run_has_wheel: bool,
    n_run_locations: usize,
    cfg: &AnalysisConfig,
) -> Finding {
    let points: Vec<(SensorLocation, f64)> =
        om.matches.iter().map(|m| (m.location, m.amp_g)).collect();
    let selection = select_location(
        &points,
        om.reference.source,
        run_has_wheel,
        n_run_locations,
        &cfg.localization,
    );
    let diffuse = detect_diffuse(&points, &om.possible_by_location, &cfg.localization);
    let phase_evidence =
        phase_evidence_for(input.phase, om.matches.iter().map(|m| m.sample_idx));

    let amps: Vec<f64> = om.matches.iter().map(|m| m.amp_g).collect();
    let snr = percentile(&amps, 95.0).unwrap_or(0.0) / input.run_noise_baseline_g.max(EPS_AMP_G);

    let path_compliance = if selection.no_wheel_sensors {
        NO_WHEEL_SENSOR_PATH_COMPLIANCE
    } else {
        1.0
    };
    let inputs = ConfidenceInputs {
        effective_match_rate: om.effective_match_rate,
        mean_rel_error: om.mean_rel_error,
        corr: om.corr,
        snr,
        absolute_strength_db: om.absolute_strength_db,
        localization_confidence: selection.localization_confidence,
        weak_spatial_separation: selection.weak_spatial_separation,
        constant_speed: input.constant_speed,
        steady_speed: input.steady_speed,
        matched: om.matches.len(),
        corroborating_locations: om.corroborating_locations,
        phases_with_evidence: phase_evidence.phases_detected.len(),
        is_diffuse_excitation: diffuse.is_diffuse,
        diffuse_penalty: diffuse.penalty,
        n_connected_locations: n_run_locations,
        path_compliance,
    };
    let confidence = score_confidence(&inputs, &cfg.confidence);

    let evidence_metrics = EvidenceMetrics {
        effective_match_rate: om.effective_match_rate,
        corr: om.corr.value(),
        snr,
        absolute_strength_db: om.absolute_strength_db,
        localization_confidence: selection.localization_confidence,
        matched: om.matches.len(),
        mean_rel_error: om.mean_rel_error,
        presence_ratio: om.effective_match_rate,
        burstiness: 1.0,
        corroborating_locations: om.corroborating_locations,
    };

    Finding {
        finding_id: finding_id(&input.metadata.run_id, &om.reference.key, None),
        finding_key: om.reference.key.clone(),
        finding_type: FindingType::Order,
        suspected_source: om.reference.source,
        peak_classification: None,
        strongest_location: selection.location_label.clone(),
        strongest_speed_band: om.strongest_speed_band_label.clone(),
        confidence_0_to_1: Some(confidence),
        confidence_label_key: label_for(confidence, &cfg.confidence),
        phase_evidence,
        dominance_ratio: selection.dominance_ratio,
        weak_spatial_separation: selection.weak_spatial_separation,
        diffuse_excitation: diffuse.penalty,
        is_diffuse_excitation: diffuse.is_diffuse,
        ambiguous_location: selection.ambiguous,
        alternative_locations: alternatives_for(&selection),
        frequency_hz_or_order: om.reference.label.clone(),
        evidence_metrics,
        quick_checks: Vec::new(),
    }
}

// ============================================================================
// Persistent-peak findings
// ============================================================================

fn peak_findings(
    input: &FindingsInput<'_>,
    claimed_hz: &[f64],
    run_has_wheel: bool,
    n_run_locations: usize,
    cfg: &AnalysisConfig,
) -> Vec<Finding> {
    // Per-location sample totals: presence opportunities for diffuse rates.
    let mut possible_by_location: BTreeMap<SensorLocation, usize> = BTreeMap::new();
    for s in input.samples {
        *possible_by_location.entry(s.location).or_insert(0) += 1;
    }

    let mut ranked: Vec<&BinStats> = input
        .bin_stats
        .iter()
        .filter(|b| b.classification != PeakClassification::BaselineNoise)
        .filter(|b| {
            let center = b.bin_hz + 0.5;
            !claimed_hz
                .iter()
                .any(|hz| (hz - center).abs() <= cfg.findings.order_claim_tolerance_hz)
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.persistence_score
            .partial_cmp(&a.persistence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.bin_hz
                    .partial_cmp(&b.bin_hz)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    // Adjacent bins straddling one physical peak collapse onto the
    // higher-ranked bin.
    let mut picked_hz: Vec<f64> = Vec::new();
    let mut out = Vec::new();
    for bin in ranked {
        if out.len() >= cfg.findings.max_persistent_peak_findings {
            break;
        }
        let center = bin.bin_hz + 0.5;
        if picked_hz
            .iter()
            .any(|hz| (hz - center).abs() <= cfg.findings.order_claim_tolerance_hz)
        {
            continue;
        }
        picked_hz.push(center);
        out.push(peak_finding(
            input,
            bin,
            &possible_by_location,
            run_has_wheel,
            n_run_locations,
            cfg,
        ));
    }
    out
}

fn peak_finding(
    input: &FindingsInput<'_>,
    bin: &BinStats,
    possible_by_location: &BTreeMap<SensorLocation, usize>,
    run_has_wheel: bool,
    n_run_locations: usize,
    cfg: &AnalysisConfig,
) -> Finding {
    let center_hz = bin.center_hz();
    let (finding_type, source) = match bin.classification {
        PeakClassification::Transient => (FindingType::Transient, SuspectedSource::TransientImpact),
        PeakClassification::Patterned => {
            (FindingType::PersistentPeak, SuspectedSource::PatternedResonance)
        }
        _ => (FindingType::PersistentPeak, SuspectedSource::Unknown),
    };
    let finding_key = match bin.classification {
        PeakClassification::Transient => "transient_impact".to_string(),
        PeakClassification::Patterned => format!("patterned_{}", freq_token(center_hz)),
        _ => format!("peak_{}", freq_token(center_hz)),
    };

    let points: Vec<(SensorLocation, f64)> =
        bin.points.iter().map(|p| (p.location, p.amp_g)).collect();
    let selection = select_location(
        &points,
        source,
        run_has_wheel,
        n_run_locations,
        &cfg.localization,
    );
    let diffuse = detect_diffuse(&points, possible_by_location, &cfg.localization);
    let phase_evidence =
        phase_evidence_for(input.phase, bin.points.iter().map(|p| p.sample_idx));

    let strongest_speed_band = bin.amplitude_weighted_band();
    let absolute_strength_db = amplitude_weighted_strength(bin);

    // The scorer is shared with order findings; presence stands in for the
    // match rate and the bin quantization for the frequency error.
    let inputs = ConfidenceInputs {
        effective_match_rate: bin.presence_ratio,
        mean_rel_error: 0.5 / center_hz.max(EPS_FREQ_HZ),
        corr: Correlation::Undefined,
        snr: bin.snr,
        absolute_strength_db,
        localization_confidence: selection.localization_confidence,
        weak_spatial_separation: selection.weak_spatial_separation,
        constant_speed: input.constant_speed,
        steady_speed: input.steady_speed,
        matched: bin.samples_with_peak,
        corroborating_locations: corroborating_locations(&bin.points),
        phases_with_evidence: phase_evidence.phases_detected.len(),
        is_diffuse_excitation: diffuse.is_diffuse,
        diffuse_penalty: diffuse.penalty,
        n_connected_locations: n_run_locations,
        path_compliance: 1.0,
    };
    let mut confidence = score_confidence(&inputs, &cfg.confidence);
    if bin.classification == PeakClassification::Transient {
        confidence = confidence.min(cfg.findings.transient_confidence_cap);
    }

    let evidence_metrics = EvidenceMetrics {
        effective_match_rate: bin.presence_ratio,
        corr: None,
        snr: bin.snr,
        absolute_strength_db,
        localization_confidence: selection.localization_confidence,
        matched: bin.samples_with_peak,
        mean_rel_error: 0.0,
        presence_ratio: bin.presence_ratio,
        burstiness: bin.burstiness,
        corroborating_locations: corroborating_locations(&bin.points),
    };

    Finding {
        finding_id: finding_id(&input.metadata.run_id, &finding_key, Some(center_hz)),
        finding_key,
        finding_type,
        suspected_source: source,
        peak_classification: Some(bin.classification),
        strongest_location: selection.location_label.clone(),
        strongest_speed_band,
        confidence_0_to_1: Some(confidence),
        confidence_label_key: label_for(confidence, &cfg.confidence),
        phase_evidence,
        dominance_ratio: selection.dominance_ratio,
        weak_spatial_separation: selection.weak_spatial_separation,
        diffuse_excitation: diffuse.penalty,
        is_diffuse_excitation: diffuse.is_diffuse,
        ambiguous_location: selection.ambiguous,
        alternative_locations: alternatives_for(&selection),
        frequency_hz_or_order: format!("{center_hz:.1} Hz"),
        evidence_metrics,
        quick_checks: Vec::new(),
    }
}

/// `27.5` -> `27_5` for use in finding keys.
fn freq_token(hz: f64) -> String {
    format!("{hz:.1}").replace('.', "_")
}

fn corroborating_locations(points: &[crate::peaks::BinPoint]) -> usize {
    let mut counts: BTreeMap<SensorLocation, usize> = BTreeMap::new();
    for p in points {
        *counts.entry(p.location).or_insert(0) += 1;
    }
    counts.values().filter(|&&n| n >= 3).count()
}

fn amplitude_weighted_strength(bin: &BinStats) -> f64 {
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for p in &bin.points {
        if let Some(db) = p.strength_db {
            weighted += db * p.amp_g;
            weight += p.amp_g;
        }
    }
    if weight < EPS_AMP_G {
        0.0
    } else {
        weighted / weight
    }
}

// ============================================================================
// Reference findings
// ============================================================================

fn reference_findings(input: &FindingsInput<'_>) -> Vec<Finding> {
    let mut refs = Vec::new();
    let total = input.samples.len();
    let missing_speed = input
        .samples
        .iter()
        .filter(|s| s.speed_kmh.is_none())
        .count();

    if total == 0 || missing_speed as f64 > total as f64 * 0.5 {
        refs.push(reference_finding(
            input,
            "REF_SPEED",
            &[
                "QUICK_CHECK_ENABLE_GPS",
                "QUICK_CHECK_SET_MANUAL_SPEED",
                "QUICK_CHECK_DRIVE_STEADY_SEGMENT",
            ],
        ));
    }
    if input.metadata.raw_sample_rate_hz.is_none() {
        refs.push(reference_finding(
            input,
            "REF_SAMPLE_RATE",
            &[
                "QUICK_CHECK_UPDATE_SENSOR_FIRMWARE",
                "QUICK_CHECK_RECONNECT_SENSOR",
            ],
        ));
    }
    if input.metadata.tire_circumference_m.is_none() {
        refs.push(reference_finding(
            input,
            "REF_WHEEL",
            &[
                "QUICK_CHECK_SET_TIRE_SIZE",
                "QUICK_CHECK_CHECK_TIRE_PLACARD",
            ],
        ));
    }
    if input.metadata.final_drive_ratio.is_none() || input.metadata.current_gear_ratio.is_none() {
        refs.push(reference_finding(
            input,
            "REF_ENGINE",
            &[
                "QUICK_CHECK_SET_FINAL_DRIVE",
                "QUICK_CHECK_SET_GEAR_RATIO",
                "QUICK_CHECK_NOTE_GEAR_USED",
            ],
        ));
    }
    refs
}

fn reference_finding(input: &FindingsInput<'_>, key: &str, quick_checks: &[&str]) -> Finding {
    Finding {
        finding_id: format!(
            "REF_{}",
            &stable_hash_hex(&[&input.metadata.run_id, key])[..12]
        ),
        finding_key: key.to_string(),
        finding_type: FindingType::Reference,
        suspected_source: SuspectedSource::Unknown,
        peak_classification: None,
        strongest_location: "unknown".to_string(),
        strongest_speed_band: "unknown".to_string(),
        confidence_0_to_1: None,
        confidence_label_key: crate::types::ConfidenceLabel::Low,
        phase_evidence: PhaseEvidence::default(),
        dominance_ratio: 1.0,
        weak_spatial_separation: false,
        diffuse_excitation: 1.0,
        is_diffuse_excitation: false,
        ambiguous_location: false,
        alternative_locations: Vec::new(),
        frequency_hz_or_order: "n/a".to_string(),
        evidence_metrics: EvidenceMetrics::default(),
        quick_checks: quick_checks.iter().take(3).map(|s| (*s).to_string()).collect(),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn finding_id(run_id: &str, key: &str, freq_hz: Option<f64>) -> String {
    let freq = freq_hz.map(|f| format!("{f:.1}")).unwrap_or_default();
    stable_hash_hex(&[run_id, key, &freq])[..12].to_string()
}

fn alternatives_for(selection: &LocationSelection) -> Vec<String> {
    selection.alternatives.clone()
}

/// Canonical phase display order for `phases_detected`.
const PHASE_ORDER: [DrivePhase; 6] = [
    DrivePhase::Idle,
    DrivePhase::Acceleration,
    DrivePhase::Cruise,
    DrivePhase::Deceleration,
    DrivePhase::CoastDown,
    DrivePhase::SpeedUnknown,
];

fn phase_evidence_for(
    phase: &PhaseAnalysis,
    sample_idxs: impl Iterator<Item = usize>,
) -> PhaseEvidence {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut total = 0usize;
    let mut cruise = 0usize;
    for idx in sample_idxs {
        let Some(&p) = phase.per_sample_phases.get(idx) else {
            continue;
        };
        if p == DrivePhase::SpeedUnknown {
            continue;
        }
        let order = PHASE_ORDER.iter().position(|&x| x == p).unwrap_or(5);
        *counts.entry(order).or_insert(0) += 1;
        total += 1;
        if p == DrivePhase::Cruise {
            cruise += 1;
        }
    }
    PhaseEvidence {
        phases_detected: counts.keys().map(|&i| PHASE_ORDER[i]).collect(),
        cruise_fraction: if total == 0 {
            0.0
        } else {
            cruise as f64 / total as f64
        },
    }
}

// ============================================================================
// Suppression & ranking
// ============================================================================

/// When a wheel finding reaches medium confidence, engine and driveline
/// findings at strictly lower confidence are probably gear-ratio aliases of
/// the same physical signal; scale them down.
fn suppress_aliases(findings: &mut [Finding], cfg: &AnalysisConfig) {
    let wheel_conf = findings
        .iter()
        .filter(|f| f.suspected_source.is_wheel_class())
        .filter_map(|f| f.confidence_0_to_1)
        .fold(f64::NEG_INFINITY, f64::max);
    if wheel_conf < cfg.findings.suppression_wheel_min_confidence {
        return;
    }
    for f in findings.iter_mut() {
        if !f.suspected_source.is_suppressible_alias() {
            continue;
        }
        if let Some(conf) = f.confidence_0_to_1 {
            if conf < wheel_conf {
                let suppressed = conf * cfg.findings.suppression_mult;
                f.confidence_0_to_1 = Some(suppressed);
                f.confidence_label_key = label_for(suppressed, &cfg.confidence);
            }
        }
    }
}

/// Ranking score: cruise-heavy evidence ranks slightly above equal
/// confidence seen only in transients of other phases.
fn ranking_score(f: &Finding) -> f64 {
    let conf = f.confidence_0_to_1.unwrap_or(0.0);
    conf * (0.85 + 0.15 * f.phase_evidence.cruise_fraction)
}

/// Select up to the configured number of top causes from sorted findings.
pub fn rank_top_causes(findings: &[Finding], cfg: &AnalysisConfig) -> Vec<TopCause> {
    let mut scored: Vec<&Finding> = findings
        .iter()
        .filter(|f| f.finding_type != FindingType::Reference)
        .collect();
    scored.sort_by(|a, b| {
        ranking_score(b)
            .partial_cmp(&ranking_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ordering_key().cmp(&b.ordering_key()))
    });
    scored
        .into_iter()
        .take(cfg.findings.top_causes_max)
        .enumerate()
        .map(|(i, f)| TopCause {
            rank: i + 1,
            finding_id: f.finding_id.clone(),
            finding_key: f.finding_key.clone(),
            suspected_source: f.suspected_source,
            strongest_location: f.strongest_location.clone(),
            strongest_speed_band: f.strongest_speed_band.clone(),
            confidence: f.confidence_0_to_1.unwrap_or(0.0),
            confidence_label_key: f.confidence_label_key,
            frequency_hz_or_order: f.frequency_hz_or_order.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::run_noise_baseline_g;
    use crate::orders::{match_orders, wheel_hz_from_speed_kmh};
    use crate::peaks::collect_bin_stats;
    use crate::phases::segment_phases;
    use crate::types::Peak;

    fn metadata() -> RunMetadata {
        RunMetadata {
            run_id: "run-findings".to_string(),
            tire_circumference_m: Some(2.036),
            final_drive_ratio: Some(3.73),
            current_gear_ratio: Some(0.64),
            raw_sample_rate_hz: Some(800.0),
            sensor_model: "ADXL345".to_string(),
            ..RunMetadata::default()
        }
    }

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    fn sample(
        idx: usize,
        sensor: &str,
        speed: Option<f64>,
        peaks: Vec<Peak>,
        vib_db: f64,
    ) -> SampleRecord {
        SampleRecord {
            t_s: Some(idx as f64),
            client_id: format!("sensor-{sensor}"),
            client_name: sensor.to_string(),
            location: SensorLocation::canonicalize(sensor),
            speed_kmh: speed,
            vibration_strength_db: Some(vib_db),
            strength_floor_amp_g: Some(0.004),
            top_peaks: peaks,
            ..SampleRecord::default()
        }
    }

    fn fault_run(fault_sensor: &str, speed: f64, n_ticks: usize) -> Vec<SampleRecord> {
        let sensors = ["front-left", "front-right", "rear-left", "rear-right"];
        let whz = wheel_hz_from_speed_kmh(speed, 2.036).unwrap_or(10.0);
        let mut out = Vec::new();
        for i in 0..n_ticks {
            for s in sensors {
                if s == fault_sensor {
                    out.push(sample(
                        i,
                        s,
                        Some(speed),
                        vec![
                            Peak { hz: whz, amp: 0.07 },
                            Peak { hz: whz * 2.0, amp: 0.028 },
                        ],
                        26.0,
                    ));
                } else {
                    out.push(sample(
                        i,
                        s,
                        Some(speed),
                        vec![Peak { hz: 142.5, amp: 0.004 }],
                        8.0,
                    ));
                }
            }
        }
        out
    }

    fn build(samples: &[SampleRecord]) -> Vec<Finding> {
        let cfg = cfg();
        let meta = metadata();
        let phase = segment_phases(samples, &cfg.phases);
        let baseline = run_noise_baseline_g(samples, &cfg.classification);
        let order_matches = match_orders(samples, &meta, &cfg);
        let bin_stats = collect_bin_stats(samples, baseline, &cfg);
        let input = FindingsInput {
            metadata: &meta,
            samples,
            phase: &phase,
            order_matches: &order_matches,
            bin_stats: &bin_stats,
            run_noise_baseline_g: baseline,
            constant_speed: true,
            steady_speed: false,
        };
        build_findings(&input, &cfg)
    }

    #[test]
    fn corner_fault_yields_wheel_order_finding() {
        let samples = fault_run("front-left", 80.0, 30);
        let findings = build(&samples);
        let wheel = findings
            .iter()
            .find(|f| f.finding_key == "wheel_1x")
            .expect("wheel_1x finding");
        assert_eq!(wheel.suspected_source, SuspectedSource::WheelTire);
        assert_eq!(wheel.strongest_location, "front-left wheel");
        let conf = wheel.confidence_0_to_1.unwrap_or(0.0);
        assert!(conf >= 0.40, "confidence {conf}");
        assert!(!wheel.is_diffuse_excitation);
    }

    #[test]
    fn findings_are_sorted_by_confidence_desc() {
        let samples = fault_run("front-left", 80.0, 30);
        let findings = build(&samples);
        let confs: Vec<f64> = findings
            .iter()
            .filter_map(|f| f.confidence_0_to_1)
            .collect();
        for pair in confs.windows(2) {
            assert!(pair[0] >= pair[1] - 1e-12, "unsorted: {confs:?}");
        }
    }

    #[test]
    fn suppression_scales_down_weaker_driveline_aliases() {
        let samples = fault_run("front-left", 80.0, 30);
        let cfg = cfg();
        let mut findings = build(&samples);
        let wheel_conf = findings
            .iter()
            .find(|f| f.finding_key == "wheel_1x")
            .and_then(|f| f.confidence_0_to_1)
            .unwrap_or(0.0);
        // Inject a synthetic driveline alias just below the wheel finding.
        let mut alias = findings[0].clone();
        alias.finding_key = "driveshaft_1x".to_string();
        alias.suspected_source = SuspectedSource::Driveline;
        alias.confidence_0_to_1 = Some(wheel_conf - 0.05);
        let pre = wheel_conf - 0.05;
        findings.push(alias);
        suppress_aliases(&mut findings, &cfg);
        let post = findings
            .iter()
            .find(|f| f.finding_key == "driveshaft_1x")
            .and_then(|f| f.confidence_0_to_1)
            .unwrap_or(0.0);
        assert!((post - pre * 0.75).abs() < 1e-9, "pre {pre} post {post}");
        // The wheel finding itself is untouched.
        let wheel_post = findings
            .iter()
            .find(|f| f.finding_key == "wheel_1x")
            .and_then(|f| f.confidence_0_to_1)
            .unwrap_or(0.0);
        assert!((wheel_post - wheel_conf).abs() < 1e-12);
    }

    #[test]
    fn transient_spike_capped_at_quarter_confidence() {
        let mut samples = fault_run("front-left", 60.0, 0);
        let sensors = ["front-left", "front-right", "rear-left", "rear-right"];
        for i in 0..30 {
            for s in sensors {
                samples.push(sample(
                    i,
                    s,
                    Some(60.0),
                    vec![Peak { hz: 142.5, amp: 0.004 }],
                    8.0,
                ));
            }
        }
        // A 3-tick spike at 50 Hz on the front-left sensor.
        for i in 30..33 {
            samples.push(sample(
                i,
                "front-left",
                Some(60.0),
                vec![Peak { hz: 50.0, amp: 0.20 }],
                35.0,
            ));
        }
        let findings = build(&samples);
        let transient = findings
            .iter()
            .find(|f| f.peak_classification == Some(PeakClassification::Transient))
            .expect("transient finding");
        let conf = transient.confidence_0_to_1.unwrap_or(1.0);
        assert!(conf <= 0.25 + 1e-9, "confidence {conf}");
        assert_eq!(transient.finding_type, FindingType::Transient);
    }

    #[test]
    fn missing_metadata_emits_reference_findings() {
        let meta = RunMetadata {
            run_id: "run-empty".to_string(),
            ..RunMetadata::default()
        };
        let cfg = cfg();
        let samples: Vec<SampleRecord> = Vec::new();
        let phase = segment_phases(&samples, &cfg.phases);
        let input = FindingsInput {
            metadata: &meta,
            samples: &samples,
            phase: &phase,
            order_matches: &[],
            bin_stats: &[],
            run_noise_baseline_g: 0.003,
            constant_speed: false,
            steady_speed: false,
        };
        let findings = build_findings(&input, &cfg);
        let keys: Vec<&str> = findings.iter().map(|f| f.finding_key.as_str()).collect();
        assert!(keys.contains(&"REF_SPEED"));
        assert!(keys.contains(&"REF_SAMPLE_RATE"));
        assert!(keys.contains(&"REF_WHEEL"));
        assert!(keys.contains(&"REF_ENGINE"));
        for f in &findings {
            assert!(f.confidence_0_to_1.is_none());
            assert!(f.finding_id.starts_with("REF_"));
            assert!(f.quick_checks.len() <= 3 && !f.quick_checks.is_empty());
        }
    }

    #[test]
    fn top_causes_exclude_references_and_cap_at_five() {
        let samples = fault_run("front-left", 80.0, 30);
        let cfg = cfg();
        let findings = build(&samples);
        let causes = rank_top_causes(&findings, &cfg);
        assert!(causes.len() <= 5);
        assert!(!causes.is_empty());
        assert_eq!(causes[0].rank, 1);
        assert_eq!(causes[0].suspected_source, SuspectedSource::WheelTire);
    }

    #[test]
    fn finding_ids_are_stable_across_runs() {
        let samples = fault_run("front-left", 80.0, 30);
        let a = build(&samples);
        let b = build(&samples);
        let ids_a: Vec<&str> = a.iter().map(|f| f.finding_id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|f| f.finding_id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
