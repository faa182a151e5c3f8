//! Default analysis constants.
//!
//! Centralises the calibration values of the diagnostic core. Grouped by
//! pipeline stage for easy discovery; `AnalysisConfig::default()` mirrors
//! every value here.

// ============================================================================
// Frequency analysis window
// ============================================================================

/// Minimum analysis frequency (Hz). Peaks below this are excluded on ingest.
pub const MIN_ANALYSIS_HZ: f64 = 5.0;

/// Maximum analysis frequency (Hz).
pub const MAX_ANALYSIS_HZ: f64 = 200.0;

/// Width of a peak-statistics frequency bin (Hz).
pub const PEAK_BIN_WIDTH_HZ: f64 = 1.0;

/// Width of a spectrum-plot frequency bin (Hz).
pub const SPECTRUM_BIN_WIDTH_HZ: f64 = 2.0;

// ============================================================================
// Phase segmentation
// ============================================================================

/// Speed at or below which a sample is idle (km/h).
pub const IDLE_SPEED_KMH: f64 = 3.0;

/// Slope threshold separating cruise from acceleration/deceleration
/// (km/h per second). Calibration parameter.
pub const PHASE_SLOPE_KMH_PER_S: f64 = 1.5;

/// Sliding window length for the smoothed speed derivative (ticks).
pub const PHASE_SMOOTH_WINDOW: usize = 5;

/// Segments shorter than this many ticks merge into the adjacent
/// dominant phase.
pub const MIN_SEGMENT_TICKS: usize = 2;

// ============================================================================
// Peak classification
// ============================================================================

/// SNR below this is baseline noise.
pub const SNR_BASELINE_NOISE: f64 = 1.2;

/// Spatial uniformity at or above this (with high presence) marks global
/// vehicle vibration.
pub const SPATIAL_UNIFORMITY_NOISE: f64 = 0.85;

/// Presence ratio below this marks a transient.
pub const PRESENCE_TRANSIENT_MAX: f64 = 0.15;

/// Burstiness above this marks a transient.
pub const BURSTINESS_TRANSIENT: f64 = 5.0;

/// Presence ratio at or above this (with low burstiness) marks a
/// patterned resonance.
pub const PRESENCE_PATTERNED_MIN: f64 = 0.40;

/// Burstiness at or below this qualifies for the patterned class.
pub const BURSTINESS_PATTERNED_MAX: f64 = 3.0;

/// Noise-floor percentile used for the run noise baseline.
pub const NOISE_BASELINE_PERCENTILE: f64 = 20.0;

/// Fallback run noise baseline (g) when no per-sample floor is present.
pub const NOISE_BASELINE_FALLBACK_G: f64 = 0.003;

// ============================================================================
// Order matching
// ============================================================================

/// Relative frequency tolerance for reference-order matching.
pub const ORDER_MATCH_TOLERANCE: f64 = 0.06;

/// Minimum matched samples for an order finding.
pub const ORDER_MIN_MATCHED: usize = 8;

/// Minimum effective match rate (possibly band-rescued) for an order finding.
pub const ORDER_MIN_MATCH_RATE: f64 = 0.15;

/// Match rate below which the focused-band rescue is attempted.
pub const RESCUE_TRIGGER_RATE: f64 = 0.25;

/// In-band match rate a rescue band must reach.
pub const RESCUE_MIN_BAND_RATE: f64 = 0.25;

/// Minimum samples a rescue band must contain.
pub const RESCUE_MIN_BAND_SAMPLES: usize = 8;

// ============================================================================
// Localization
// ============================================================================

/// Dominance ratio below which the top two locations are ambiguous.
pub const DOMINANCE_AMBIGUOUS: f64 = 1.25;

/// Localization confidence ceiling for ambiguous locations.
pub const AMBIGUOUS_LOCALIZATION_CAP: f64 = 0.40;

/// Weak-spatial-separation dominance threshold, 2 connected locations.
/// Empirical; config-exposed.
pub const WEAK_SEPARATION_2_LOCATIONS: f64 = 1.50;

/// Weak-spatial-separation dominance threshold, 3 connected locations.
pub const WEAK_SEPARATION_3_LOCATIONS: f64 = 1.30;

/// Weak-spatial-separation dominance threshold, 4+ connected locations.
pub const WEAK_SEPARATION_4PLUS_LOCATIONS: f64 = 1.20;

/// Diffuse excitation: minimum locations with enough samples.
pub const DIFFUSE_MIN_LOCATIONS: usize = 2;

/// Diffuse excitation: minimum samples per participating location.
pub const DIFFUSE_MIN_SAMPLES_PER_LOCATION: usize = 3;

/// Diffuse excitation: maximum relative range of per-location match rates.
pub const DIFFUSE_RATE_RANGE_MAX: f64 = 0.20;

/// Diffuse excitation: maximum relative range of per-location mean
/// amplitudes.
pub const DIFFUSE_AMP_RANGE_MAX: f64 = 0.30;

/// Confidence multiplier applied to diffuse findings.
pub const DIFFUSE_PENALTY: f64 = 0.65;

// ============================================================================
// Confidence scoring
// ============================================================================

/// Base weight: effective match rate.
pub const WEIGHT_MATCH_RATE: f64 = 0.30;

/// Base weight: frequency error score.
pub const WEIGHT_ERROR_SCORE: f64 = 0.10;

/// Base weight: amplitude-speed correlation.
pub const WEIGHT_CORRELATION: f64 = 0.15;

/// Base weight: SNR score.
pub const WEIGHT_SNR: f64 = 0.15;

/// Base weight: normalized absolute strength.
pub const WEIGHT_STRENGTH: f64 = 0.15;

/// Base weight: localization confidence.
pub const WEIGHT_LOCALIZATION: f64 = 0.15;

/// Strength below this (dB) is negligible; result capped at 0.45.
pub const STRENGTH_NEGLIGIBLE_DB: f64 = 8.0;

/// Strength below this (dB, and at least negligible) is light; 0.80
/// multiplier.
pub const STRENGTH_LIGHT_DB: f64 = 16.0;

/// Confidence cap for negligible absolute strength.
pub const NEGLIGIBLE_STRENGTH_CAP: f64 = 0.45;

/// Light-strength confidence multiplier.
pub const LIGHT_STRENGTH_MULT: f64 = 0.80;

/// Weak-spatial-separation confidence multiplier.
pub const WEAK_SEPARATION_MULT: f64 = 0.80;

/// Constant-speed-run confidence multiplier.
pub const CONSTANT_SPEED_MULT: f64 = 0.80;

/// Steady-speed (narrow spread) confidence multiplier.
pub const STEADY_SPEED_MULT: f64 = 0.90;

/// Single-connected-sensor confidence multiplier.
pub const SINGLE_SENSOR_MULT: f64 = 0.70;

/// Bonus for 3+ corroborating locations.
pub const CORROBORATION_BONUS: f64 = 1.10;

/// Bonus for evidence across 3+ phases.
pub const PHASE_COVERAGE_BONUS: f64 = 1.05;

/// Corroborating locations needed for the corroboration bonus.
pub const CORROBORATION_MIN_LOCATIONS: usize = 3;

/// Phases with evidence needed for the phase-coverage bonus.
pub const PHASE_BONUS_MIN_PHASES: usize = 3;

/// Matched counts below this scale confidence by `matched / 10`.
pub const FULL_CONFIDENCE_MIN_MATCHED: usize = 10;

/// Final confidence clamp, lower edge.
pub const CONFIDENCE_MIN: f64 = 0.08;

/// Final confidence clamp, upper edge.
pub const CONFIDENCE_MAX: f64 = 0.97;

/// Confidence at or above this labels HIGH (tier C).
pub const CONFIDENCE_HIGH_MIN: f64 = 0.70;

/// Confidence at or above this labels MEDIUM (tier B).
pub const CONFIDENCE_MEDIUM_MIN: f64 = 0.40;

// ============================================================================
// Findings
// ============================================================================

/// Maximum persistent-peak findings per run.
pub const MAX_PERSISTENT_PEAK_FINDINGS: usize = 6;

/// Peaks within this distance (Hz) of a matched order bin are claimed by
/// the order finding.
pub const ORDER_CLAIM_TOLERANCE_HZ: f64 = 1.5;

/// Confidence cap for transient-classified findings.
pub const TRANSIENT_CONFIDENCE_CAP: f64 = 0.25;

/// Wheel-finding confidence from which engine/driveline aliases are
/// suppressed.
pub const SUPPRESSION_WHEEL_MIN_CONFIDENCE: f64 = 0.40;

/// Suppression multiplier for engine/driveline aliases.
pub const SUPPRESSION_MULT: f64 = 0.75;

/// Maximum top causes in the summary.
pub const TOP_CAUSES_MAX: usize = 5;

/// Minimum confidence for a finding to mark timeline fault evidence.
pub const FAULT_EVIDENCE_MIN_CONFIDENCE: f64 = 0.15;

// ============================================================================
// Suitability
// ============================================================================

/// Total speed range (km/h) below which a run counts as literally
/// constant-speed.
pub const CONSTANT_SPEED_RANGE_KMH: f64 = 2.0;

/// Speed range (km/h) below which a run counts as steady-speed.
pub const STEADY_SPEED_RANGE_KMH: f64 = 10.0;

/// Fraction of the run that must sit inside the narrow range.
pub const STEADY_SPEED_FRACTION: f64 = 0.80;

/// Minimum distinct canonical locations for good sensor coverage.
pub const MIN_DISTINCT_LOCATIONS: usize = 3;

/// Coverage ratio below which a location row is partial.
pub const PARTIAL_COVERAGE_RATIO: f64 = 0.40;

/// Minimum samples per location before the coverage warning clears.
pub const MIN_LOCATION_SAMPLES: usize = 10;

/// Fraction of full scale at which an accel axis counts as saturated.
pub const SATURATION_FRACTION: f64 = 0.98;

/// Missing-speed fraction above which `REF_SPEED` is emitted.
pub const SPEED_MISSING_REF_FRACTION: f64 = 0.50;

// ============================================================================
// Spectrogram diffuse-broadband suppression
// ============================================================================

/// Minimum peaks in one tick to consider broadband suppression.
pub const SPECTROGRAM_DIFFUSE_MIN_PEAKS: usize = 6;

/// Minimum frequency spread (Hz) of those peaks.
pub const SPECTROGRAM_DIFFUSE_SPREAD_HZ: f64 = 60.0;

/// Peaks below this multiple of the run noise baseline are floor-level.
pub const SPECTROGRAM_DIFFUSE_AMP_MULT: f64 = 3.0;
