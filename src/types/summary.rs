//! The assembled diagnostic report shape consumed by the PDF renderer and
//! API serializer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CertaintyTier, DrivePhase, Finding, Language, SuspectedSource, TopCause,
};

// ============================================================================
// Speed breakdown
// ============================================================================

/// Strength statistics for one canonical 10-km/h speed band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeedBandRow {
    /// e.g. "80-90 km/h"
    pub speed_range: String,
    /// Lower band edge (km/h); rows sort by this ascending
    pub band_start_kmh: f64,
    pub count: usize,
    pub p50_db: Option<f64>,
    pub p95_db: Option<f64>,
    pub max_db: Option<f64>,
}

// ============================================================================
// Phase timeline
// ============================================================================

/// One timeline entry per phase segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub phase: DrivePhase,
    pub start_t_s: f64,
    pub end_t_s: f64,
    pub speed_min_kmh: Option<f64>,
    pub speed_max_kmh: Option<f64>,
    /// A non-reference finding with confidence >= 0.15 has evidence here
    pub has_fault_evidence: bool,
}

// ============================================================================
// Sensor intensity rows
// ============================================================================

/// Raw per-bucket sample counts (`l0`..`l5` dB bands).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub l0: usize,
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
    pub l4: usize,
    pub l5: usize,
}

/// Six fixed strength buckets over dB ranges
/// `[-inf,0) [0,8) [8,16) [16,26) [26,36) [36,inf)`, with percentages
/// normalized to 100% over non-missing samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StrengthBucketDistribution {
    pub counts: BucketCounts,
    pub percent_time_l0: f64,
    pub percent_time_l1: f64,
    pub percent_time_l2: f64,
    pub percent_time_l3: f64,
    pub percent_time_l4: f64,
    pub percent_time_l5: f64,
}

/// Aggregated intensity statistics for one canonical location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorIntensityRow {
    pub location: String,
    pub sample_count: usize,
    pub p50_intensity_db: Option<f64>,
    pub p95_intensity_db: Option<f64>,
    pub max_intensity_db: Option<f64>,
    pub strength_bucket_distribution: StrengthBucketDistribution,
    /// `sample_count / max_per_location_count`
    pub sample_coverage_ratio: f64,
    /// Coverage ratio below 0.40
    pub partial_coverage: bool,
    /// Fewer than 10 samples, or partial coverage
    pub sample_coverage_warning: bool,
}

// ============================================================================
// Suitability checks
// ============================================================================

/// Outcome of one run-suitability check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Pass,
    Warn,
}

/// One suitability check result; `check_key` and `explanation` are opaque
/// keys the renderer translates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuitabilityCheck {
    pub check_key: String,
    pub state: CheckState,
    pub explanation: String,
}

// ============================================================================
// Most-likely origin
// ============================================================================

/// Key attributes of the top-ranked non-reference finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MostLikelyOrigin {
    pub source: SuspectedSource,
    pub location: String,
    pub speed_band: String,
    pub confidence: Option<f64>,
    pub weak_spatial_separation: bool,
    pub alternative_locations: Vec<String>,
}

// ============================================================================
// Accel statistics & data quality
// ============================================================================

/// Per-axis acceleration statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AccelAxisStats {
    pub mean_g: Option<f64>,
    pub variance_g2: Option<f64>,
    /// Samples at or beyond 0.98 x full scale on this axis
    pub saturation_count: usize,
}

/// Acceleration statistics across the run. Vector magnitude is computed
/// only for samples carrying all three axes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AccelStats {
    pub x: AccelAxisStats,
    pub y: AccelAxisStats,
    pub z: AccelAxisStats,
    pub magnitude_p50_g: Option<f64>,
    pub magnitude_p95_g: Option<f64>,
    pub magnitude_max_g: Option<f64>,
    pub samples_with_magnitude: usize,
}

/// Accelerometer sanity counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AccelSanity {
    /// Samples with any single axis at or beyond 0.98 x full scale
    pub saturation_count: usize,
}

/// Frame-loss accounting across the run, per-sensor deltas summed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FrameIntegrity {
    pub dropped_frames_delta: i64,
    pub queue_overflow_delta: i64,
    /// Strictly-decreasing counter observations (accumulator restarts)
    pub counter_resets: usize,
}

/// Data-quality block of the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataQuality {
    pub accel_sanity: AccelSanity,
    pub frame_integrity: FrameIntegrity,
}

/// Run parameters echoed for the renderer (units, hardware scale).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MetadataEcho {
    pub raw_sample_rate_hz: Option<f64>,
    pub accel_full_scale_g: Option<f64>,
    pub accel_units: String,
}

// ============================================================================
// Plot series
// ============================================================================

/// One spectrum bin: `(freq_hz, amp)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpectrumPoint {
    pub freq_hz: f64,
    pub amp: f64,
}

/// One time x frequency spectrogram cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpectrogramCell {
    pub t_s: f64,
    pub freq_hz: f64,
    pub amp: f64,
}

/// One ranked peaks-table row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeakTableRow {
    pub rank: usize,
    pub frequency_hz: f64,
    pub max_amp_g: f64,
    pub p95_amp_g: f64,
    pub presence_ratio: f64,
    pub burstiness: f64,
    /// `p95_amp * presence_ratio / max(burstiness, 1.0)`; rows rank by this
    pub persistence_score: f64,
    pub peak_classification: super::PeakClassification,
    pub typical_speed_band: String,
}

/// Matched-point amplitude aggregated into one 10-km/h band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeedAmpPoint {
    pub band_start_kmh: f64,
    pub speed_range: String,
    pub mean_amp_g: f64,
    pub count: usize,
}

/// Per-reference matched amplitude vs speed series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedAmpSeries {
    pub reference_key: String,
    pub points: Vec<SpeedAmpPoint>,
}

/// One vibration-magnitude trace point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VibMagnitudePoint {
    pub t_s: f64,
    pub magnitude_g: f64,
}

/// All renderer-facing plot series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlotData {
    /// 2-Hz bins, persistence-weighted amplitudes (transient bursts
    /// down-weighted)
    pub fft_spectrum: Vec<SpectrumPoint>,
    /// Same bins, max amplitude (debug view)
    pub fft_spectrum_raw: Vec<SpectrumPoint>,
    /// Diagnostic view; diffuse broadband ticks near the noise floor are
    /// suppressed
    pub peaks_spectrogram: Vec<SpectrogramCell>,
    pub peaks_spectrogram_raw: Vec<SpectrogramCell>,
    pub peaks_table: Vec<PeakTableRow>,
    pub matched_amp_vs_speed: Vec<MatchedAmpSeries>,
    pub vib_magnitude: Vec<VibMagnitudePoint>,
}

// ============================================================================
// The summary itself
// ============================================================================

/// Fully-populated structured diagnostic summary. Always well-formed: a run
/// with no data still carries reference findings, warnings, and tier "A".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub run_id: String,
    pub lang: Language,
    pub report_date: DateTime<Utc>,
    pub duration_text: String,
    pub sample_count: usize,
    pub sensor_count_used: usize,
    pub sensor_locations: Vec<String>,
    /// All findings, sorted by confidence descending
    pub findings: Vec<Finding>,
    /// Up to 5 highest-ranked non-reference findings, after suppression
    pub top_causes: Vec<TopCause>,
    pub speed_breakdown: Vec<SpeedBandRow>,
    pub phase_timeline: Vec<TimelineEntry>,
    pub sensor_intensity_by_location: Vec<SensorIntensityRow>,
    pub run_suitability: Vec<SuitabilityCheck>,
    pub plots: PlotData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_likely_origin: Option<MostLikelyOrigin>,
    pub warnings: Vec<String>,
    pub run_noise_baseline_g: f64,
    pub certainty_tier_key: CertaintyTier,
    pub accel_stats: AccelStats,
    pub data_quality: DataQuality,
    pub metadata_echo: MetadataEcho,
}
