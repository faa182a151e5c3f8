//! Canonical 10-km/h speed bins and band labels

/// Width of a canonical speed band (km/h).
pub const BAND_WIDTH_KMH: f64 = 10.0;

/// Lower edge of the band containing `speed_kmh`.
pub fn band_start(speed_kmh: f64) -> f64 {
    (speed_kmh / BAND_WIDTH_KMH).floor() * BAND_WIDTH_KMH
}

/// Canonical range label, e.g. `"80-90 km/h"`.
pub fn band_label(band_start_kmh: f64) -> String {
    format!(
        "{}-{} km/h",
        band_start_kmh.round() as i64,
        (band_start_kmh + BAND_WIDTH_KMH).round() as i64
    )
}

/// Single-value label for uniform-speed runs, e.g. `"50 km/h"`.
pub fn uniform_label(speed_kmh: f64) -> String {
    format!("{} km/h", speed_kmh.round() as i64)
}

/// Band label for a set of speeds: the single-value form when every speed
/// falls into one band, otherwise the range label of `band_start_kmh`.
pub fn label_for_band(band_start_kmh: f64, all_speeds_uniform: bool, mean_speed: f64) -> String {
    if all_speeds_uniform {
        uniform_label(mean_speed)
    } else {
        band_label(band_start_kmh)
    }
}

/// True when every speed lands in the same canonical band.
pub fn speeds_are_uniform(speeds: &[f64]) -> bool {
    let mut bands = speeds
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| band_start(v));
    match bands.next() {
        None => true,
        Some(first) => bands.all(|b| (b - first).abs() < 1e-9),
    }
}
