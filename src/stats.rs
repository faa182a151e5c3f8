//! Numeric helpers: NaN-safe JSON coercions, percentiles, correlation,
//! stable hashing
//!
//! Every routine here is total: bad input degrades to `None` / `Undefined`
//! rather than propagating NaN into downstream scores.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use statrs::statistics::Statistics;

/// Division guard for amplitude denominators (g).
pub const EPS_AMP_G: f64 = 1e-9;

/// Division guard for frequency-bin denominators (Hz).
pub const EPS_FREQ_HZ: f64 = 0.01;

// ============================================================================
// JSON coercions
// ============================================================================

/// Coerce a JSON value to a finite f64.
///
/// Accepts numbers and numeric strings; NaN, ±∞, empty strings, and missing
/// values all map to `None`.
pub fn json_f64(value: Option<&Value>) -> Option<f64> {
    let v = value?;
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

/// Coerce a JSON value to an integer, rounding half away from zero.
pub fn json_i64(value: Option<&Value>) -> Option<i64> {
    let v = json_f64(value)?;
    let rounded = v.round();
    if rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Coerce a JSON value to a non-empty string.
pub fn json_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an ISO-8601 timestamp (or epoch seconds) into UTC.
///
/// Naive timestamps are treated as UTC; timestamps with offsets preserve
/// their instant.
pub fn parse_timestamp_utc(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                    return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
                }
            }
            None
        }
        Value::Number(_) => {
            let secs = json_f64(Some(value))?;
            DateTime::from_timestamp(secs.trunc() as i64, 0)
        }
        _ => None,
    }
}

// ============================================================================
// Percentiles
// ============================================================================

/// Percentile (0–100) by linear interpolation between closest ranks.
///
/// Non-finite entries are dropped first; returns `None` on an empty input.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.is_empty() {
        return None;
    }
    clean.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p = pct.clamp(0.0, 100.0) / 100.0;
    let rank = p * (clean.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let lo_v = clean[lo.min(clean.len() - 1)];
    let hi_v = clean[hi.min(clean.len() - 1)];
    Some(lo_v + (hi_v - lo_v) * (rank - lo as f64))
}

/// Weighted percentile: the smallest value whose cumulative weight reaches
/// `pct`% of the total. Zero/negative weights are dropped.
pub fn weighted_percentile(pairs: &[(f64, f64)], pct: f64) -> Option<f64> {
    let mut clean: Vec<(f64, f64)> = pairs
        .iter()
        .copied()
        .filter(|(v, w)| v.is_finite() && w.is_finite() && *w > 0.0)
        .collect();
    if clean.is_empty() {
        return None;
    }
    clean.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let total: f64 = clean.iter().map(|(_, w)| w).sum();
    let target = pct.clamp(0.0, 100.0) / 100.0 * total;
    let mut cum = 0.0;
    for (v, w) in &clean {
        cum += w;
        if cum >= target {
            return Some(*v);
        }
    }
    clean.last().map(|(v, _)| *v)
}

/// Mean of the finite entries, or `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.is_empty() {
        return None;
    }
    Some((&clean).mean())
}

/// Sample standard deviation of the finite entries (n ≥ 2), else `None`.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let clean: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.len() < 2 {
        return None;
    }
    Some((&clean).std_dev())
}

// ============================================================================
// Correlation
// ============================================================================

/// Pearson correlation result. `Undefined` when either series has zero
/// variance (the scorer treats that as 0.0 with the weight redistributed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Defined(f64),
    Undefined,
}

impl Correlation {
    /// The coefficient, or `None` when undefined.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined => None,
        }
    }
}

/// Pearson correlation of two equal-length series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Correlation::Undefined;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];
    let mx = xs.mean();
    let my = ys.mean();
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x < 1e-12 || var_y < 1e-12 {
        return Correlation::Undefined;
    }
    Correlation::Defined(cov / (var_x.sqrt() * var_y.sqrt()))
}

// ============================================================================
// Stable hashing
// ============================================================================

/// Stable hex digest of the joined parts (deterministic across processes,
/// unlike the default hasher).
pub fn stable_hash_hex(parts: &[&str]) -> String {
    let joined = parts.join("|");
    format!("{:x}", md5::compute(joined.as_bytes()))
}

/// Stable small integer in `[0, modulus)` derived from `key`.
pub fn stable_hash_mod(key: &str, modulus: u64) -> u64 {
    let digest = md5::compute(key.as_bytes());
    let mut acc: u64 = 0;
    for byte in &digest.0[..8] {
        acc = (acc << 8) | u64::from(*byte);
    }
    if modulus == 0 {
        0
    } else {
        acc % modulus
    }
}
