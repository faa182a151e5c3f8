//! Per-run metadata and vehicle parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::stats::{json_f64, json_string, parse_timestamp_utc};

/// Raised when the top-level metadata input is not a record shape or lacks
/// a run identifier. Individual bad fields never raise — they degrade to
/// `None` instead.
#[derive(Debug, Error)]
#[error("invalid run metadata: {reason}")]
pub struct InvalidMetadataError {
    pub reason: String,
}

/// Report label language. Affects label text only; all numeric outputs are
/// language-agnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Nl,
}

/// Immutable per-run context.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunMetadata {
    pub run_id: String,
    pub start_time_utc: Option<DateTime<Utc>>,
    /// End of the run; report time falls back to the current wall clock
    /// when absent
    pub end_time_utc: Option<DateTime<Utc>>,
    pub raw_sample_rate_hz: Option<f64>,
    /// Rolling circumference (m); derived from the tire spec triple when not
    /// given directly
    pub tire_circumference_m: Option<f64>,
    pub final_drive_ratio: Option<f64>,
    pub current_gear_ratio: Option<f64>,
    /// Sensor hardware model; determines the full-scale saturation threshold
    pub sensor_model: String,
    pub language: Language,
}

/// Full-scale range (±g) for the known accelerometer models.
fn full_scale_for_model(model: &str) -> Option<f64> {
    match model.trim().to_ascii_uppercase().as_str() {
        "ADXL345" => Some(16.0),
        _ => None,
    }
}

/// Derive rolling circumference (m) from a `width/aspect R rim` tire spec.
///
/// `diameter = rim·25.4 + 2·width·aspect/100` (mm), circumference = π·d.
/// Returns `None` unless all three values are finite and positive.
pub fn tire_circumference_m_from_spec(
    tire_width_mm: f64,
    tire_aspect_pct: f64,
    rim_in: f64,
) -> Option<f64> {
    if !(tire_width_mm.is_finite() && tire_aspect_pct.is_finite() && rim_in.is_finite()) {
        return None;
    }
    if tire_width_mm <= 0.0 || tire_aspect_pct <= 0.0 || rim_in <= 0.0 {
        return None;
    }
    let diameter_mm = rim_in * 25.4 + 2.0 * tire_width_mm * tire_aspect_pct / 100.0;
    Some(std::f64::consts::PI * diameter_mm / 1000.0)
}

impl RunMetadata {
    /// Build metadata from a JSON record.
    ///
    /// Fails only when `value` is not an object or `run_id` is missing/blank;
    /// every other field degrades to `None` on bad input.
    pub fn from_value(value: &Value) -> Result<Self, InvalidMetadataError> {
        let obj = value.as_object().ok_or_else(|| InvalidMetadataError {
            reason: "metadata is not a record".to_string(),
        })?;

        let run_id = json_string(obj.get("run_id")).unwrap_or_default();
        if run_id.trim().is_empty() {
            return Err(InvalidMetadataError {
                reason: "metadata is missing run_id".to_string(),
            });
        }

        let tire_circumference_m = json_f64(obj.get("tire_circumference_m")).or_else(|| {
            let width = json_f64(obj.get("tire_width_mm"))?;
            let aspect = json_f64(obj.get("tire_aspect_pct"))?;
            let rim = json_f64(obj.get("rim_in"))?;
            tire_circumference_m_from_spec(width, aspect, rim)
        });

        let language = match json_string(obj.get("language")).as_deref() {
            Some("nl") | Some("NL") => Language::Nl,
            _ => Language::En,
        };

        Ok(Self {
            run_id,
            start_time_utc: obj.get("start_time_utc").and_then(parse_timestamp_utc),
            end_time_utc: obj.get("end_time_utc").and_then(parse_timestamp_utc),
            raw_sample_rate_hz: json_f64(obj.get("raw_sample_rate_hz")),
            tire_circumference_m,
            final_drive_ratio: json_f64(obj.get("final_drive_ratio")),
            current_gear_ratio: json_f64(obj.get("current_gear_ratio")),
            sensor_model: json_string(obj.get("sensor_model")).unwrap_or_default(),
            language,
        })
    }

    /// Full-scale accelerometer range (±g) for the configured sensor model,
    /// or `None` for unknown hardware (saturation checks are skipped).
    pub fn sensor_full_scale_g(&self) -> Option<f64> {
        full_scale_for_model(&self.sensor_model)
    }
}
