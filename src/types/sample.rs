//! Canonical per-sample sensor records
//!
//! One `SampleRecord` per sensor per feature-interval tick (~2 Hz typical).
//! Records enter the pipeline through the normalizer, which enforces the
//! invariants documented on each field; after construction they are
//! immutable value types.

use serde::{Deserialize, Serialize};

use super::SensorLocation;

/// Maximum number of spectral peaks carried per sample.
pub const MAX_TOP_PEAKS: usize = 10;

/// A single spectral peak from the signal processor.
///
/// Invariant (enforced by the normalizer): `hz` is finite and at or above
/// the minimum analysis frequency; `amp` is finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Peak frequency (Hz)
    pub hz: f64,
    /// Peak amplitude (g)
    pub amp: f64,
}

/// Provenance of the per-sample speed value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpeedSource {
    Gps,
    Manual,
    Override,
    #[default]
    Missing,
}

/// Canonical per-sensor sample, one per feature-interval tick.
///
/// All numeric options are `None` only for genuine absence — NaN and ±∞ are
/// mapped to `None` on construction, while a literal `0.0` in
/// `vibration_strength_db` / `strength_floor_amp_g` is a valid measurement
/// and is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SampleRecord {
    /// Seconds since run start; absent when the sensor clock was not aligned
    pub t_s: Option<f64>,
    /// Stable sensor identifier (statistics are keyed by this, not by name)
    pub client_id: String,
    /// Human-readable sensor label
    pub client_name: String,
    /// Canonicalized mounting location
    pub location: SensorLocation,
    /// Vehicle speed (km/h)
    pub speed_kmh: Option<f64>,
    /// Where the speed value came from
    pub speed_source: SpeedSource,
    /// Instantaneous acceleration, X axis (g)
    pub accel_x_g: Option<f64>,
    /// Instantaneous acceleration, Y axis (g)
    pub accel_y_g: Option<f64>,
    /// Instantaneous acceleration, Z axis (g)
    pub accel_z_g: Option<f64>,
    /// Per-sample strength in dB above the noise floor; 0.0 is a measurement
    pub vibration_strength_db: Option<f64>,
    /// Per-sample noise-floor amplitude (g); 0.0 is a measurement
    pub strength_floor_amp_g: Option<f64>,
    /// Up to [`MAX_TOP_PEAKS`] peaks, pre-sorted by amplitude descending
    pub top_peaks: Vec<Peak>,
    /// Monotonic dropped-frame counter for this sensor
    pub frames_dropped_total: Option<i64>,
    /// Monotonic queue-overflow counter for this sensor
    pub queue_overflow_drops: Option<i64>,
}

impl SampleRecord {
    /// True when all three accel axes carry a value (vector magnitude is
    /// only defined for complete triples).
    pub fn has_full_accel(&self) -> bool {
        self.accel_x_g.is_some() && self.accel_y_g.is_some() && self.accel_z_g.is_some()
    }

    /// Acceleration vector magnitude (g), or `None` when any axis is absent.
    pub fn accel_magnitude_g(&self) -> Option<f64> {
        match (self.accel_x_g, self.accel_y_g, self.accel_z_g) {
            (Some(x), Some(y), Some(z)) => Some((x * x + y * y + z * z).sqrt()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accel_magnitude_requires_all_axes() {
        let mut s = SampleRecord {
            accel_x_g: Some(3.0),
            accel_y_g: Some(4.0),
            accel_z_g: Some(0.0),
            ..SampleRecord::default()
        };
        assert_eq!(s.accel_magnitude_g(), Some(5.0));
        s.accel_z_g = None;
        assert!(s.accel_magnitude_g().is_none());
        assert!(!s.has_full_accel());
    }

    #[test]
    fn zero_strength_is_a_value_not_missing() {
        let s = SampleRecord {
            vibration_strength_db: Some(0.0),
            strength_floor_amp_g: Some(0.0),
            ..SampleRecord::default()
        };
        assert_eq!(s.vibration_strength_db, Some(0.0));
        assert_eq!(s.strength_floor_amp_g, Some(0.0));
    }
}
