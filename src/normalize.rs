//! Sample normalization
//!
//! Every incoming record passes through here, even records that already look
//! canonical — legacy producers emit aliases and sentinel values. Individual
//! bad fields degrade to `None`; only a non-record top-level shape is an
//! error.

use serde_json::Value;

use crate::config::AnalysisConfig;
use crate::stats::{json_f64, json_i64, json_string};
use crate::types::{
    InvalidMetadataError, Peak, SampleRecord, SensorLocation, SpeedSource, MAX_TOP_PEAKS,
};

/// Coerce one raw record into a canonical [`SampleRecord`].
///
/// Invariants enforced:
/// - NaN / ±∞ / empty-string numerics become `None`
/// - peaks below the minimum analysis frequency, with non-finite or
///   non-positive fields, or of non-object shape are dropped; the first 10
///   survivors are kept in input order
/// - `vibration_strength_db = 0.0` and `strength_floor_amp_g = 0.0` are
///   preserved as measurements
/// - the location label is canonicalized via the alias table, falling back
///   to the client name when no location is given
pub fn normalize_sample(
    raw: &Value,
    cfg: &AnalysisConfig,
) -> Result<SampleRecord, InvalidMetadataError> {
    let obj = raw.as_object().ok_or_else(|| InvalidMetadataError {
        reason: "sample is not a record".to_string(),
    })?;

    let client_name = json_string(obj.get("client_name")).unwrap_or_default();
    let location_label = json_string(obj.get("location")).unwrap_or_else(|| client_name.clone());

    let speed_kmh = json_f64(obj.get("speed_kmh"));
    let speed_source = match json_string(obj.get("speed_source")).as_deref() {
        Some(s) if s.eq_ignore_ascii_case("gps") => SpeedSource::Gps,
        Some(s) if s.eq_ignore_ascii_case("manual") => SpeedSource::Manual,
        Some(s) if s.eq_ignore_ascii_case("override") => SpeedSource::Override,
        _ if speed_kmh.is_some() => SpeedSource::Gps,
        _ => SpeedSource::Missing,
    };

    Ok(SampleRecord {
        t_s: json_f64(obj.get("t_s")),
        client_id: json_string(obj.get("client_id")).unwrap_or_default(),
        client_name,
        location: SensorLocation::canonicalize(&location_label),
        speed_kmh,
        speed_source,
        accel_x_g: json_f64(obj.get("accel_x_g")),
        accel_y_g: json_f64(obj.get("accel_y_g")),
        accel_z_g: json_f64(obj.get("accel_z_g")),
        vibration_strength_db: json_f64(obj.get("vibration_strength_db")),
        strength_floor_amp_g: json_f64(obj.get("strength_floor_amp_g")),
        top_peaks: normalize_peaks(obj.get("top_peaks"), cfg.frequency.min_hz),
        frames_dropped_total: json_i64(obj.get("frames_dropped_total")),
        queue_overflow_drops: json_i64(obj.get("queue_overflow_drops")),
    })
}

/// Filter and cap a raw peak list.
fn normalize_peaks(raw: Option<&Value>, min_hz: f64) -> Vec<Peak> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let hz = json_f64(obj.get("hz"))?;
            let amp = json_f64(obj.get("amp"))?;
            if hz <= 0.0 || hz < min_hz || amp <= 0.0 {
                return None;
            }
            Some(Peak { hz, amp })
        })
        .take(MAX_TOP_PEAKS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn nan_and_infinity_fields_become_none() {
        let rec = normalize_sample(
            &json!({
                "client_id": "s1",
                "client_name": "front-left",
                "speed_kmh": "NaN",
                "accel_x_g": "inf",
                "accel_y_g": "",
                "accel_z_g": 0.1,
            }),
            &cfg(),
        )
        .expect("record shape");
        assert!(rec.speed_kmh.is_none());
        assert!(rec.accel_x_g.is_none());
        assert!(rec.accel_y_g.is_none());
        assert_eq!(rec.accel_z_g, Some(0.1));
    }

    #[test]
    fn zero_strength_values_are_preserved() {
        let rec = normalize_sample(
            &json!({
                "client_id": "s1",
                "client_name": "trunk",
                "vibration_strength_db": 0.0,
                "strength_floor_amp_g": 0.0,
            }),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.vibration_strength_db, Some(0.0));
        assert_eq!(rec.strength_floor_amp_g, Some(0.0));
    }

    #[test]
    fn peaks_are_filtered_and_capped_at_ten() {
        let mut peaks: Vec<Value> = vec![
            json!({"hz": 4.9, "amp": 0.05}),   // below minimum frequency
            json!({"hz": -10.0, "amp": 0.05}), // non-positive hz
            json!({"hz": 25.0, "amp": 0.0}),   // non-positive amp
            json!({"hz": 25.0, "amp": "NaN"}), // non-finite amp
            json!("not-an-object"),
        ];
        for i in 0..12 {
            peaks.push(json!({"hz": 10.0 + f64::from(i), "amp": 0.01}));
        }
        let rec = normalize_sample(
            &json!({
                "client_id": "s1",
                "client_name": "front-left",
                "top_peaks": peaks,
            }),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.top_peaks.len(), 10);
        assert!((rec.top_peaks[0].hz - 10.0).abs() < 1e-12);
        assert!(rec.top_peaks.iter().all(|p| p.hz >= 5.0 && p.amp > 0.0));
    }

    #[test]
    fn location_aliases_and_client_name_fallback() {
        let rec = normalize_sample(
            &json!({"client_id": "s1", "client_name": "x", "location": "FL"}),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.location, SensorLocation::FrontLeftWheel);

        let rec = normalize_sample(
            &json!({"client_id": "s2", "client_name": "rear_right"}),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.location, SensorLocation::RearRightWheel);
    }

    #[test]
    fn speed_source_parsing() {
        let rec = normalize_sample(
            &json!({"client_id": "s", "client_name": "trunk", "speed_kmh": 50.0, "speed_source": "manual"}),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.speed_source, SpeedSource::Manual);

        let rec = normalize_sample(
            &json!({"client_id": "s", "client_name": "trunk", "speed_kmh": 50.0}),
            &cfg(),
        )
        .expect("record shape");
        assert_eq!(rec.speed_source, SpeedSource::Gps);

        let rec = normalize_sample(&json!({"client_id": "s", "client_name": "trunk"}), &cfg())
            .expect("record shape");
        assert_eq!(rec.speed_source, SpeedSource::Missing);
    }

    #[test]
    fn normalizing_a_canonical_record_is_the_identity() {
        let canonical = SampleRecord {
            t_s: Some(12.5),
            client_id: "sensor-1".to_string(),
            client_name: "front-left".to_string(),
            location: SensorLocation::FrontLeftWheel,
            speed_kmh: Some(80.0),
            speed_source: SpeedSource::Gps,
            accel_x_g: Some(0.02),
            accel_y_g: Some(0.02),
            accel_z_g: Some(0.10),
            vibration_strength_db: Some(0.0),
            strength_floor_amp_g: Some(0.003),
            top_peaks: vec![Peak { hz: 10.9, amp: 0.07 }],
            frames_dropped_total: Some(0),
            queue_overflow_drops: Some(0),
        };
        let value = serde_json::to_value(&canonical).expect("serializes");
        let roundtrip = normalize_sample(&value, &cfg()).expect("record shape");
        assert_eq!(roundtrip, canonical);
    }

    #[test]
    fn non_record_input_is_an_error() {
        assert!(normalize_sample(&json!([1, 2, 3]), &cfg()).is_err());
        assert!(normalize_sample(&json!("sample"), &cfg()).is_err());
    }
}
