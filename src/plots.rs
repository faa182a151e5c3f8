//! Renderer-facing plot series
//!
//! Pre-digested series for the report renderer: persistence-weighted and
//! raw spectra, spectrograms with diffuse-broadband suppression in the
//! diagnostic view, the ranked peaks table, matched amplitude vs speed,
//! and the vibration-magnitude trace.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::orders::OrderMatch;
use crate::peaks::BinStats;
use crate::speedbins;
use crate::types::{
    MatchedAmpSeries, PeakTableRow, PlotData, SampleRecord, SpectrogramCell, SpectrumPoint,
    SpeedAmpPoint, VibMagnitudePoint,
};

/// Maximum rows in the peaks table.
const PEAKS_TABLE_MAX_ROWS: usize = 20;

/// Build all plot series.
pub fn build_plots(
    samples: &[SampleRecord],
    bin_stats: &[BinStats],
    order_matches: &[OrderMatch],
    run_noise_baseline_g: f64,
    cfg: &AnalysisConfig,
) -> PlotData {
    PlotData {
        fft_spectrum: spectrum(bin_stats, cfg, SpectrumMode::PersistenceWeighted),
        fft_spectrum_raw: spectrum(bin_stats, cfg, SpectrumMode::Raw),
        peaks_spectrogram: spectrogram(samples, run_noise_baseline_g, cfg, true),
        peaks_spectrogram_raw: spectrogram(samples, run_noise_baseline_g, cfg, false),
        peaks_table: peaks_table(bin_stats),
        matched_amp_vs_speed: matched_amp_vs_speed(order_matches),
        vib_magnitude: vib_magnitude(samples),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SpectrumMode {
    /// Down-weights transient bursts so persistent signals rank on top
    PersistenceWeighted,
    /// Max amplitude per bin (debug view)
    Raw,
}

fn spectrum(bin_stats: &[BinStats], cfg: &AnalysisConfig, mode: SpectrumMode) -> Vec<SpectrumPoint> {
    let width = cfg.plots.spectrum_bin_width_hz.max(0.5);
    let mut bins: BTreeMap<i64, f64> = BTreeMap::new();
    for b in bin_stats {
        let key = (b.center_hz() / width).floor() as i64;
        let amp = match mode {
            SpectrumMode::PersistenceWeighted => b.persistence_score,
            SpectrumMode::Raw => b.max_amp_g,
        };
        let entry = bins.entry(key).or_insert(0.0);
        if amp > *entry {
            *entry = amp;
        }
    }
    bins.into_iter()
        .map(|(key, amp)| SpectrumPoint {
            freq_hz: key as f64 * width,
            amp,
        })
        .collect()
}

/// Time x frequency cells. The diagnostic view drops ticks that look like
/// diffuse broadband noise near the floor: many small peaks spread over a
/// wide frequency range in one tick.
fn spectrogram(
    samples: &[SampleRecord],
    run_noise_baseline_g: f64,
    cfg: &AnalysisConfig,
    suppress_diffuse: bool,
) -> Vec<SpectrogramCell> {
    let width = cfg.plots.spectrum_bin_width_hz.max(0.5);
    let floor_amp = run_noise_baseline_g * cfg.plots.diffuse_amp_mult;
    let mut cells: BTreeMap<(i64, i64), f64> = BTreeMap::new();

    for sample in samples {
        let Some(t_s) = sample.t_s.filter(|t| t.is_finite()) else {
            continue;
        };
        if sample.top_peaks.is_empty() {
            continue;
        }
        if suppress_diffuse && is_diffuse_broadband(sample, floor_amp, cfg) {
            continue;
        }
        let t_key = (t_s * 10.0).round() as i64;
        for peak in &sample.top_peaks {
            if peak.hz < cfg.frequency.min_hz || peak.hz >= cfg.frequency.max_hz {
                continue;
            }
            let f_key = (peak.hz / width).floor() as i64;
            let entry = cells.entry((t_key, f_key)).or_insert(0.0);
            if peak.amp > *entry {
                *entry = peak.amp;
            }
        }
    }

    cells
        .into_iter()
        .map(|((t_key, f_key), amp)| SpectrogramCell {
            t_s: t_key as f64 / 10.0,
            freq_hz: f_key as f64 * width,
            amp,
        })
        .collect()
}

/// Many floor-level peaks spread wide in one tick: road texture, not a
/// fault.
fn is_diffuse_broadband(sample: &SampleRecord, floor_amp: f64, cfg: &AnalysisConfig) -> bool {
    if sample.top_peaks.len() < cfg.plots.diffuse_min_peaks {
        return false;
    }
    let mut min_hz = f64::INFINITY;
    let mut max_hz = f64::NEG_INFINITY;
    for p in &sample.top_peaks {
        if p.amp >= floor_amp {
            return false;
        }
        min_hz = min_hz.min(p.hz);
        max_hz = max_hz.max(p.hz);
    }
    max_hz - min_hz >= cfg.plots.diffuse_spread_hz
}

fn peaks_table(bin_stats: &[BinStats]) -> Vec<PeakTableRow> {
    let mut ranked: Vec<&BinStats> = bin_stats.iter().collect();
    ranked.sort_by(|a, b| {
        b.persistence_score
            .partial_cmp(&a.persistence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.bin_hz
                    .partial_cmp(&b.bin_hz)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    ranked
        .into_iter()
        .take(PEAKS_TABLE_MAX_ROWS)
        .enumerate()
        .map(|(i, b)| PeakTableRow {
            rank: i + 1,
            frequency_hz: b.center_hz(),
            max_amp_g: b.max_amp_g,
            p95_amp_g: b.p95_amp_g,
            presence_ratio: b.presence_ratio,
            burstiness: b.burstiness,
            persistence_score: b.persistence_score,
            peak_classification: b.classification,
            typical_speed_band: b.amplitude_weighted_band(),
        })
        .collect()
}

fn matched_amp_vs_speed(order_matches: &[OrderMatch]) -> Vec<MatchedAmpSeries> {
    order_matches
        .iter()
        .filter(|om| !om.matches.is_empty())
        .map(|om| {
            let mut bands: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
            for m in &om.matches {
                let band = speedbins::band_start(m.speed_kmh) as i64;
                let entry = bands.entry(band).or_insert((0.0, 0));
                entry.0 += m.amp_g;
                entry.1 += 1;
            }
            MatchedAmpSeries {
                reference_key: om.reference.key.clone(),
                points: bands
                    .into_iter()
                    .map(|(band, (sum, n))| SpeedAmpPoint {
                        band_start_kmh: band as f64,
                        speed_range: speedbins::band_label(band as f64),
                        mean_amp_g: sum / n.max(1) as f64,
                        count: n,
                    })
                    .collect(),
            }
        })
        .collect()
}

fn vib_magnitude(samples: &[SampleRecord]) -> Vec<VibMagnitudePoint> {
    let mut points: Vec<VibMagnitudePoint> = samples
        .iter()
        .filter_map(|s| {
            let t_s = s.t_s.filter(|t| t.is_finite())?;
            let magnitude_g = s.accel_magnitude_g()?;
            Some(VibMagnitudePoint { t_s, magnitude_g })
        })
        .collect();
    points.sort_by(|a, b| {
        a.t_s
            .partial_cmp(&b.t_s)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    points
}
