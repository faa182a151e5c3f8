//! Weighted confidence scoring for findings
//!
//! Combines the quality signals of a finding into one clamped confidence:
//! a weighted base sum over normalized scores, then a fixed sequence of
//! multiplicative modifiers for evidence weaknesses and corroboration.

use crate::config::ConfidenceConfig;
use crate::stats::Correlation;
use crate::types::{CertaintyTier, ConfidenceLabel};

/// SNR at which the SNR score saturates at 1.0.
const SNR_FULL_SCALE: f64 = 5.0;

/// Strength (dB) at which the normalized strength score saturates.
const STRENGTH_FULL_SCALE_DB: f64 = 36.0;

/// Path-compliance span over which the correlation weight fully shifts
/// onto match rate.
const PATH_COMPLIANCE_SPAN: f64 = 0.5;

/// All signals feeding one confidence score.
#[derive(Debug, Clone)]
pub struct ConfidenceInputs {
    /// Effective (possibly band-rescued) match rate, [0, 1]
    pub effective_match_rate: f64,
    /// Mean relative frequency error of the matches
    pub mean_rel_error: f64,
    pub corr: Correlation,
    /// Raw SNR (p95 amplitude over run noise baseline)
    pub snr: f64,
    /// Amplitude-weighted mean strength (dB); raw, not normalized
    pub absolute_strength_db: f64,
    pub localization_confidence: f64,
    pub weak_spatial_separation: bool,
    pub constant_speed: bool,
    pub steady_speed: bool,
    pub matched: usize,
    pub corroborating_locations: usize,
    pub phases_with_evidence: usize,
    pub is_diffuse_excitation: bool,
    /// Multiplier applied when diffuse (1.0 otherwise)
    pub diffuse_penalty: f64,
    pub n_connected_locations: usize,
    /// Transfer-path bias factor, [1.0, 1.5]; above 1.0 the correlation
    /// weight shifts onto match rate
    pub path_compliance: f64,
}

impl Default for ConfidenceInputs {
    fn default() -> Self {
        Self {
            effective_match_rate: 0.0,
            mean_rel_error: 0.0,
            corr: Correlation::Undefined,
            snr: 0.0,
            absolute_strength_db: 0.0,
            localization_confidence: 0.0,
            weak_spatial_separation: false,
            constant_speed: false,
            steady_speed: false,
            matched: 0,
            corroborating_locations: 0,
            phases_with_evidence: 0,
            is_diffuse_excitation: false,
            diffuse_penalty: 1.0,
            n_connected_locations: 0,
            path_compliance: 1.0,
        }
    }
}

/// Score a finding's confidence, clamped to the configured band.
pub fn score_confidence(inputs: &ConfidenceInputs, cfg: &ConfidenceConfig) -> f64 {
    let match_score = inputs.effective_match_rate.clamp(0.0, 1.0);
    let error_score = (1.0 - inputs.mean_rel_error).clamp(0.0, 1.0);
    let snr_score = (inputs.snr / SNR_FULL_SCALE).clamp(0.0, 1.0);
    let strength_score = (inputs.absolute_strength_db / STRENGTH_FULL_SCALE_DB).clamp(0.0, 1.0);
    let localization = inputs.localization_confidence.clamp(0.0, 1.0);

    // Undefined correlation contributes nothing itself; its weight moves to
    // match rate. Path compliance above 1.0 shifts the same way.
    let (corr_score, mut w_match, mut w_corr) = match inputs.corr.value() {
        Some(r) => (
            r.abs().clamp(0.0, 1.0),
            cfg.weight_match_rate,
            cfg.weight_correlation,
        ),
        None => (
            0.0,
            cfg.weight_match_rate + cfg.weight_correlation,
            0.0,
        ),
    };
    if inputs.path_compliance > 1.0 && w_corr > 0.0 {
        let shift_frac =
            ((inputs.path_compliance - 1.0) / PATH_COMPLIANCE_SPAN).clamp(0.0, 1.0);
        let shifted = w_corr * shift_frac;
        w_match += shifted;
        w_corr -= shifted;
    }

    let mut score = w_match * match_score
        + cfg.weight_error_score * error_score
        + w_corr * corr_score
        + cfg.weight_snr * snr_score
        + cfg.weight_strength * strength_score
        + cfg.weight_localization * localization;

    // Modifier order is part of the contract: caps before multipliers,
    // weaknesses before bonuses, sparse-match scaling last.
    if inputs.absolute_strength_db < cfg.strength_negligible_db {
        score = score.min(cfg.negligible_strength_cap);
    } else if inputs.absolute_strength_db < cfg.strength_light_db {
        score *= cfg.light_strength_mult;
    }
    if inputs.weak_spatial_separation {
        score *= cfg.weak_separation_mult;
    }
    if inputs.constant_speed {
        score *= cfg.constant_speed_mult;
    }
    if inputs.steady_speed {
        score *= cfg.steady_speed_mult;
    }
    if inputs.is_diffuse_excitation {
        score *= inputs.diffuse_penalty;
    }
    if inputs.n_connected_locations == 1 {
        score *= cfg.single_sensor_mult;
    }
    if inputs.corroborating_locations >= cfg.corroboration_min_locations {
        score *= cfg.corroboration_bonus;
    }
    if inputs.phases_with_evidence >= cfg.phase_bonus_min_phases {
        score *= cfg.phase_coverage_bonus;
    }
    if inputs.matched < cfg.full_confidence_min_matched {
        score *= inputs.matched as f64 / cfg.full_confidence_min_matched as f64;
    }

    score.clamp(cfg.clamp_min, cfg.clamp_max)
}

/// Label band for a confidence value.
pub fn label_for(confidence: f64, cfg: &ConfidenceConfig) -> ConfidenceLabel {
    if confidence >= cfg.label_high_min {
        ConfidenceLabel::High
    } else if confidence >= cfg.label_medium_min {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

/// Report tier implied by a confidence label.
pub fn tier_for(label: ConfidenceLabel) -> CertaintyTier {
    match label {
        ConfidenceLabel::High => CertaintyTier::C,
        ConfidenceLabel::Medium => CertaintyTier::B,
        ConfidenceLabel::Low => CertaintyTier::A,
    }
}
