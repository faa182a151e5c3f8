//! Analysis configuration
//!
//! Every calibration value of the diagnostic core is a field here, grouped
//! by pipeline stage. The config is one plain record passed into the
//! pipeline root — there is no process-wide mutable state. Defaults mirror
//! `defaults.rs`; an operator TOML file can overlay any subset of fields.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use self::defaults as d;

/// Raised when a config overlay file cannot be read or parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Frequency analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Minimum analysis frequency (Hz); peaks below are dropped on ingest
    pub min_hz: f64,
    /// Maximum analysis frequency (Hz)
    pub max_hz: f64,
    /// Peak-statistics bin width (Hz)
    pub bin_width_hz: f64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            min_hz: d::MIN_ANALYSIS_HZ,
            max_hz: d::MAX_ANALYSIS_HZ,
            bin_width_hz: d::PEAK_BIN_WIDTH_HZ,
        }
    }
}

/// Phase segmentation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub idle_speed_kmh: f64,
    /// Slope threshold (km/h per second); calibration parameter
    pub slope_kmh_per_s: f64,
    /// Sliding window for the smoothed derivative (ticks)
    pub smooth_window: usize,
    /// Minimum segment length before merging (ticks)
    pub min_segment_ticks: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            idle_speed_kmh: d::IDLE_SPEED_KMH,
            slope_kmh_per_s: d::PHASE_SLOPE_KMH_PER_S,
            smooth_window: d::PHASE_SMOOTH_WINDOW,
            min_segment_ticks: d::MIN_SEGMENT_TICKS,
        }
    }
}

/// Peak classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub snr_baseline_noise: f64,
    pub spatial_uniformity_noise: f64,
    pub presence_transient_max: f64,
    pub burstiness_transient: f64,
    pub presence_patterned_min: f64,
    pub burstiness_patterned_max: f64,
    pub noise_baseline_percentile: f64,
    pub noise_baseline_fallback_g: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            snr_baseline_noise: d::SNR_BASELINE_NOISE,
            spatial_uniformity_noise: d::SPATIAL_UNIFORMITY_NOISE,
            presence_transient_max: d::PRESENCE_TRANSIENT_MAX,
            burstiness_transient: d::BURSTINESS_TRANSIENT,
            presence_patterned_min: d::PRESENCE_PATTERNED_MIN,
            burstiness_patterned_max: d::BURSTINESS_PATTERNED_MAX,
            noise_baseline_percentile: d::NOISE_BASELINE_PERCENTILE,
            noise_baseline_fallback_g: d::NOISE_BASELINE_FALLBACK_G,
        }
    }
}

/// Order-matching tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Relative frequency tolerance (0.06 = 6%)
    pub match_tolerance: f64,
    pub min_matched: usize,
    pub min_match_rate: f64,
    pub rescue_trigger_rate: f64,
    pub rescue_min_band_rate: f64,
    pub rescue_min_band_samples: usize,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            match_tolerance: d::ORDER_MATCH_TOLERANCE,
            min_matched: d::ORDER_MIN_MATCHED,
            min_match_rate: d::ORDER_MIN_MATCH_RATE,
            rescue_trigger_rate: d::RESCUE_TRIGGER_RATE,
            rescue_min_band_rate: d::RESCUE_MIN_BAND_RATE,
            rescue_min_band_samples: d::RESCUE_MIN_BAND_SAMPLES,
        }
    }
}

/// Localization tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub dominance_ambiguous: f64,
    pub ambiguous_localization_cap: f64,
    pub weak_separation_2_locations: f64,
    pub weak_separation_3_locations: f64,
    pub weak_separation_4plus_locations: f64,
    pub diffuse_min_locations: usize,
    pub diffuse_min_samples_per_location: usize,
    pub diffuse_rate_range_max: f64,
    pub diffuse_amp_range_max: f64,
    pub diffuse_penalty: f64,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            dominance_ambiguous: d::DOMINANCE_AMBIGUOUS,
            ambiguous_localization_cap: d::AMBIGUOUS_LOCALIZATION_CAP,
            weak_separation_2_locations: d::WEAK_SEPARATION_2_LOCATIONS,
            weak_separation_3_locations: d::WEAK_SEPARATION_3_LOCATIONS,
            weak_separation_4plus_locations: d::WEAK_SEPARATION_4PLUS_LOCATIONS,
            diffuse_min_locations: d::DIFFUSE_MIN_LOCATIONS,
            diffuse_min_samples_per_location: d::DIFFUSE_MIN_SAMPLES_PER_LOCATION,
            diffuse_rate_range_max: d::DIFFUSE_RATE_RANGE_MAX,
            diffuse_amp_range_max: d::DIFFUSE_AMP_RANGE_MAX,
            diffuse_penalty: d::DIFFUSE_PENALTY,
        }
    }
}

/// Confidence-scoring weights and modifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub weight_match_rate: f64,
    pub weight_error_score: f64,
    pub weight_correlation: f64,
    pub weight_snr: f64,
    pub weight_strength: f64,
    pub weight_localization: f64,
    pub strength_negligible_db: f64,
    pub strength_light_db: f64,
    pub negligible_strength_cap: f64,
    pub light_strength_mult: f64,
    pub weak_separation_mult: f64,
    pub constant_speed_mult: f64,
    pub steady_speed_mult: f64,
    pub single_sensor_mult: f64,
    pub corroboration_bonus: f64,
    pub phase_coverage_bonus: f64,
    pub corroboration_min_locations: usize,
    pub phase_bonus_min_phases: usize,
    pub full_confidence_min_matched: usize,
    pub clamp_min: f64,
    pub clamp_max: f64,
    pub label_high_min: f64,
    pub label_medium_min: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            weight_match_rate: d::WEIGHT_MATCH_RATE,
            weight_error_score: d::WEIGHT_ERROR_SCORE,
            weight_correlation: d::WEIGHT_CORRELATION,
            weight_snr: d::WEIGHT_SNR,
            weight_strength: d::WEIGHT_STRENGTH,
            weight_localization: d::WEIGHT_LOCALIZATION,
            strength_negligible_db: d::STRENGTH_NEGLIGIBLE_DB,
            strength_light_db: d::STRENGTH_LIGHT_DB,
            negligible_strength_cap: d::NEGLIGIBLE_STRENGTH_CAP,
            light_strength_mult: d::LIGHT_STRENGTH_MULT,
            weak_separation_mult: d::WEAK_SEPARATION_MULT,
            constant_speed_mult: d::CONSTANT_SPEED_MULT,
            steady_speed_mult: d::STEADY_SPEED_MULT,
            single_sensor_mult: d::SINGLE_SENSOR_MULT,
            corroboration_bonus: d::CORROBORATION_BONUS,
            phase_coverage_bonus: d::PHASE_COVERAGE_BONUS,
            corroboration_min_locations: d::CORROBORATION_MIN_LOCATIONS,
            phase_bonus_min_phases: d::PHASE_BONUS_MIN_PHASES,
            full_confidence_min_matched: d::FULL_CONFIDENCE_MIN_MATCHED,
            clamp_min: d::CONFIDENCE_MIN,
            clamp_max: d::CONFIDENCE_MAX,
            label_high_min: d::CONFIDENCE_HIGH_MIN,
            label_medium_min: d::CONFIDENCE_MEDIUM_MIN,
        }
    }
}

/// Findings construction and ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FindingsConfig {
    pub max_persistent_peak_findings: usize,
    pub order_claim_tolerance_hz: f64,
    pub transient_confidence_cap: f64,
    pub suppression_wheel_min_confidence: f64,
    pub suppression_mult: f64,
    pub top_causes_max: usize,
    pub fault_evidence_min_confidence: f64,
}

impl Default for FindingsConfig {
    fn default() -> Self {
        Self {
            max_persistent_peak_findings: d::MAX_PERSISTENT_PEAK_FINDINGS,
            order_claim_tolerance_hz: d::ORDER_CLAIM_TOLERANCE_HZ,
            transient_confidence_cap: d::TRANSIENT_CONFIDENCE_CAP,
            suppression_wheel_min_confidence: d::SUPPRESSION_WHEEL_MIN_CONFIDENCE,
            suppression_mult: d::SUPPRESSION_MULT,
            top_causes_max: d::TOP_CAUSES_MAX,
            fault_evidence_min_confidence: d::FAULT_EVIDENCE_MIN_CONFIDENCE,
        }
    }
}

/// Run-suitability checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConfig {
    pub constant_speed_range_kmh: f64,
    pub steady_speed_range_kmh: f64,
    pub steady_speed_fraction: f64,
    pub min_distinct_locations: usize,
    pub partial_coverage_ratio: f64,
    pub min_location_samples: usize,
    pub saturation_fraction: f64,
    pub speed_missing_ref_fraction: f64,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            constant_speed_range_kmh: d::CONSTANT_SPEED_RANGE_KMH,
            steady_speed_range_kmh: d::STEADY_SPEED_RANGE_KMH,
            steady_speed_fraction: d::STEADY_SPEED_FRACTION,
            min_distinct_locations: d::MIN_DISTINCT_LOCATIONS,
            partial_coverage_ratio: d::PARTIAL_COVERAGE_RATIO,
            min_location_samples: d::MIN_LOCATION_SAMPLES,
            saturation_fraction: d::SATURATION_FRACTION,
            speed_missing_ref_fraction: d::SPEED_MISSING_REF_FRACTION,
        }
    }
}

/// Plot-series tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub spectrum_bin_width_hz: f64,
    pub diffuse_min_peaks: usize,
    pub diffuse_spread_hz: f64,
    pub diffuse_amp_mult: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            spectrum_bin_width_hz: d::SPECTRUM_BIN_WIDTH_HZ,
            diffuse_min_peaks: d::SPECTROGRAM_DIFFUSE_MIN_PEAKS,
            diffuse_spread_hz: d::SPECTROGRAM_DIFFUSE_SPREAD_HZ,
            diffuse_amp_mult: d::SPECTROGRAM_DIFFUSE_AMP_MULT,
        }
    }
}

// ============================================================================
// Top-level config
// ============================================================================

/// Root analysis configuration, passed by reference into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub frequency: FrequencyConfig,
    pub phases: PhaseConfig,
    pub classification: ClassificationConfig,
    pub orders: OrderConfig,
    pub localization: LocalizationConfig,
    pub confidence: ConfidenceConfig,
    pub findings: FindingsConfig,
    pub suitability: SuitabilityConfig,
    pub plots: PlotConfig,
}

impl AnalysisConfig {
    /// Parse a TOML overlay; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML overlay file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
