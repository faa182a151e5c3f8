//! Finding types: detected faults, pseudo-findings, and their enums

use serde::{Deserialize, Serialize};

use super::DrivePhase;

/// Kind of finding emitted by the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    Order,
    PersistentPeak,
    Transient,
    /// Pseudo-finding signaling a missing input rather than a detected fault
    Reference,
}

/// Suspected mechanical source of a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SuspectedSource {
    #[serde(rename = "wheel/tire")]
    WheelTire,
    #[serde(rename = "driveline")]
    Driveline,
    #[serde(rename = "engine")]
    Engine,
    #[serde(rename = "transient_impact")]
    TransientImpact,
    #[serde(rename = "patterned_resonance")]
    PatternedResonance,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SuspectedSource {
    /// Wheel-class sources are subject to transfer-path localization rules.
    pub fn is_wheel_class(self) -> bool {
        matches!(self, Self::WheelTire)
    }

    /// Engine/driveline findings can be aliases of a dominant wheel fault.
    pub fn is_suppressible_alias(self) -> bool {
        matches!(self, Self::Engine | Self::Driveline)
    }
}

/// Behavior class of a frequency bin across the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PeakClassification {
    BaselineNoise,
    Transient,
    Patterned,
    Persistent,
}

/// Confidence band label key (renderer translates; the core never compares
/// label text).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConfidenceLabel {
    #[serde(rename = "CONFIDENCE_LOW")]
    Low,
    #[serde(rename = "CONFIDENCE_MEDIUM")]
    Medium,
    #[serde(rename = "CONFIDENCE_HIGH")]
    High,
}

/// Report emphasis tier: A = data-insufficient (guidance only), B =
/// hypothesis, C = confident diagnosis with repair suggestions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum CertaintyTier {
    #[default]
    A,
    B,
    C,
}

/// Phases in which a finding's evidence was observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PhaseEvidence {
    pub phases_detected: Vec<DrivePhase>,
    /// Fraction of the finding's evidence time spent in cruise
    pub cruise_fraction: f64,
}

/// Quality signals backing a finding's confidence score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EvidenceMetrics {
    pub effective_match_rate: f64,
    /// |Pearson(amp, speed)|; `None` when undefined (zero variance)
    pub corr: Option<f64>,
    pub snr: f64,
    /// Amplitude-weighted mean strength (dB); raw, not normalized
    pub absolute_strength_db: f64,
    pub localization_confidence: f64,
    pub matched: usize,
    pub mean_rel_error: f64,
    pub presence_ratio: f64,
    pub burstiness: f64,
    pub corroborating_locations: usize,
}

/// A detected fault, classified peak, or missing-input reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    /// Opaque, stable per run; reference findings are prefixed `REF_`
    pub finding_id: String,
    /// e.g. `wheel_1x`, `driveshaft_2x`, `patterned_27_5`, `transient_impact`
    pub finding_key: String,
    pub finding_type: FindingType,
    pub suspected_source: SuspectedSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_classification: Option<PeakClassification>,
    /// Canonical sensor label, or `"ambiguous location: <L1> / <L2>"`
    pub strongest_location: String,
    /// e.g. `"80-90 km/h"`, `"50 km/h"` (uniform run), `"unknown"`
    pub strongest_speed_band: String,
    /// Clamped to [0.08, 0.97]; `None` for reference findings
    pub confidence_0_to_1: Option<f64>,
    pub confidence_label_key: ConfidenceLabel,
    pub phase_evidence: PhaseEvidence,
    pub dominance_ratio: f64,
    pub weak_spatial_separation: bool,
    /// Penalty multiplier applied for diffuse excitation (1.0 when not diffuse)
    pub diffuse_excitation: f64,
    pub is_diffuse_excitation: bool,
    pub ambiguous_location: bool,
    pub alternative_locations: Vec<String>,
    /// e.g. `"25.0 Hz"`, `"1x wheel order"`
    pub frequency_hz_or_order: String,
    pub evidence_metrics: EvidenceMetrics,
    /// Up to 3 quick-check suggestion keys (reference findings only)
    pub quick_checks: Vec<String>,
}

/// A ranked top cause extracted from a non-reference finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopCause {
    pub rank: usize,
    pub finding_id: String,
    pub finding_key: String,
    pub suspected_source: SuspectedSource,
    pub strongest_location: String,
    pub strongest_speed_band: String,
    pub confidence: f64,
    pub confidence_label_key: ConfidenceLabel,
    pub frequency_hz_or_order: String,
}

impl Finding {
    /// Deterministic sort key: confidence desc, then finding_key,
    /// strongest_location, frequency ascending.
    pub fn ordering_key(&self) -> (i64, &str, &str, i64) {
        // Negate a scaled confidence so ascending tuple order sorts desc;
        // reference findings (no confidence) sort after everything scored.
        let conf_scaled = self
            .confidence_0_to_1
            .map_or(i64::MAX, |c| -((c * 1e9).round() as i64));
        let freq_scaled = (self.evidence_metrics_frequency_hz() * 1000.0).round() as i64;
        (
            conf_scaled,
            self.finding_key.as_str(),
            self.strongest_location.as_str(),
            freq_scaled,
        )
    }

    /// Numeric frequency used for tie-breaks (0.0 for pure order labels).
    fn evidence_metrics_frequency_hz(&self) -> f64 {
        self.frequency_hz_or_order
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}
