//! Driving-phase segmentation
//!
//! Partitions the run into idle / acceleration / cruise / deceleration
//! segments from the speed trace. Sensors report in parallel, so samples
//! are first collapsed onto ticks (unique timestamps); classification
//! happens on the tick axis and is then mapped back per sample.

use tracing::debug;

use crate::config::PhaseConfig;
use crate::types::{DrivePhase, PhaseSegment, SampleRecord};

/// Result of phase segmentation.
#[derive(Debug, Clone, Default)]
pub struct PhaseAnalysis {
    /// Phase per input sample (parallel to the input slice)
    pub per_sample_phases: Vec<DrivePhase>,
    /// Merged segments over the tick axis, sorted by start time
    pub segments: Vec<PhaseSegment>,
}

impl PhaseAnalysis {
    /// Fraction of classified ticks spent in cruise.
    pub fn cruise_fraction(&self) -> f64 {
        let mut cruise = 0usize;
        let mut total = 0usize;
        for seg in &self.segments {
            let len = seg.end_idx - seg.start_idx + 1;
            if seg.phase != DrivePhase::SpeedUnknown {
                total += len;
                if seg.phase == DrivePhase::Cruise {
                    cruise += len;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            cruise as f64 / total as f64
        }
    }
}

/// One collapsed time tick: all samples sharing a timestamp.
struct Tick {
    /// Real timestamp when any sample carried one
    t_s: Option<f64>,
    /// Timestamp used for reporting (last-known or index fallback)
    display_t_s: f64,
    /// Mean speed over samples with speed at this tick
    speed_kmh: Option<f64>,
}

/// Partition `samples` into driving phases.
pub fn segment_phases(samples: &[SampleRecord], cfg: &PhaseConfig) -> PhaseAnalysis {
    if samples.is_empty() {
        return PhaseAnalysis::default();
    }

    let (ticks, tick_of_sample) = collapse_ticks(samples);
    let mut phases = classify_ticks(&ticks, cfg);
    let mut segments = build_segments(&ticks, &phases);
    merge_short_segments(&mut segments, cfg.min_segment_ticks);
    relabel_coast_down(&mut segments);

    // Re-derive tick phases from the merged segments so per-sample phases
    // agree with the timeline.
    for seg in &segments {
        for phase in phases
            .iter_mut()
            .take(seg.end_idx + 1)
            .skip(seg.start_idx)
        {
            *phase = seg.phase;
        }
    }

    let per_sample_phases = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.speed_kmh.is_none() {
                DrivePhase::SpeedUnknown
            } else {
                phases[tick_of_sample[i]]
            }
        })
        .collect();

    debug!(
        ticks = ticks.len(),
        segments = segments.len(),
        "phase segmentation complete"
    );

    PhaseAnalysis {
        per_sample_phases,
        segments,
    }
}

/// Collapse samples onto unique-timestamp ticks, in time order. Samples
/// without a timestamp join the tick of the preceding sample.
fn collapse_ticks(samples: &[SampleRecord]) -> (Vec<Tick>, Vec<usize>) {
    let mut times: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.t_s)
        .filter(|t| t.is_finite())
        .collect();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    times.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut tick_of_sample = vec![0usize; samples.len()];
    let mut speed_sum = vec![0.0f64; times.len().max(1)];
    let mut speed_n = vec![0usize; times.len().max(1)];
    let has_time = !times.is_empty();

    if has_time {
        let mut last_tick = 0usize;
        for (i, s) in samples.iter().enumerate() {
            let tick = match s.t_s {
                Some(t) if t.is_finite() => times
                    .binary_search_by(|probe| {
                        probe.partial_cmp(&t).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or_else(|pos| pos.min(times.len() - 1)),
                _ => last_tick,
            };
            last_tick = tick;
            tick_of_sample[i] = tick;
            if let Some(v) = s.speed_kmh {
                speed_sum[tick] += v;
                speed_n[tick] += 1;
            }
        }
    } else {
        // No timestamps anywhere: each sample is its own tick in input order.
        speed_sum = vec![0.0; samples.len()];
        speed_n = vec![0; samples.len()];
        for (i, s) in samples.iter().enumerate() {
            tick_of_sample[i] = i;
            if let Some(v) = s.speed_kmh {
                speed_sum[i] += v;
                speed_n[i] += 1;
            }
        }
    }

    let n_ticks = if has_time { times.len() } else { samples.len() };
    let mut ticks = Vec::with_capacity(n_ticks);
    let mut last_known = None;
    for i in 0..n_ticks {
        let t_s = if has_time { Some(times[i]) } else { None };
        if t_s.is_some() {
            last_known = t_s;
        }
        let display_t_s = t_s.or(last_known).unwrap_or(i as f64);
        let speed_kmh = if speed_n[i] > 0 {
            Some(speed_sum[i] / speed_n[i] as f64)
        } else {
            None
        };
        ticks.push(Tick {
            t_s,
            display_t_s,
            speed_kmh,
        });
    }
    (ticks, tick_of_sample)
}

/// Classify each tick from the smoothed speed derivative.
fn classify_ticks(ticks: &[Tick], cfg: &PhaseConfig) -> Vec<DrivePhase> {
    let smoothed = smooth_speeds(ticks, cfg.smooth_window);
    ticks
        .iter()
        .enumerate()
        .map(|(i, tick)| {
            let Some(speed) = tick.speed_kmh else {
                return DrivePhase::SpeedUnknown;
            };
            if speed <= cfg.idle_speed_kmh {
                return DrivePhase::Idle;
            }
            match slope_at(ticks, &smoothed, i) {
                Some(slope) if slope > cfg.slope_kmh_per_s => DrivePhase::Acceleration,
                Some(slope) if slope < -cfg.slope_kmh_per_s => DrivePhase::Deceleration,
                _ => DrivePhase::Cruise,
            }
        })
        .collect()
}

/// Centered moving average of the tick speeds (window at least 5 ticks).
fn smooth_speeds(ticks: &[Tick], window: usize) -> Vec<Option<f64>> {
    let half = window.max(5) / 2;
    (0..ticks.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(ticks.len() - 1);
            let mut sum = 0.0;
            let mut n = 0usize;
            for tick in &ticks[lo..=hi] {
                if let Some(v) = tick.speed_kmh {
                    sum += v;
                    n += 1;
                }
            }
            if n == 0 {
                None
            } else {
                Some(sum / n as f64)
            }
        })
        .collect()
}

/// Smoothed central-difference slope (km/h per second) at tick `i`.
fn slope_at(ticks: &[Tick], smoothed: &[Option<f64>], i: usize) -> Option<f64> {
    let lo = i.saturating_sub(1);
    let hi = (i + 1).min(ticks.len() - 1);
    if lo == hi {
        return Some(0.0);
    }
    let v_lo = smoothed[lo]?;
    let v_hi = smoothed[hi]?;
    let dt = ticks[hi].display_t_s - ticks[lo].display_t_s;
    if dt <= 1e-9 {
        return Some(0.0);
    }
    Some((v_hi - v_lo) / dt)
}

/// Group consecutive equal-phase ticks into segments.
fn build_segments(ticks: &[Tick], phases: &[DrivePhase]) -> Vec<PhaseSegment> {
    let mut segments: Vec<PhaseSegment> = Vec::new();
    for (i, (&phase, tick)) in phases.iter().zip(ticks.iter()).enumerate() {
        match segments.last_mut() {
            Some(seg) if seg.phase == phase => {
                seg.end_idx = i;
                seg.end_t_s = tick.display_t_s;
                if let Some(v) = tick.speed_kmh {
                    seg.speed_min_kmh = Some(seg.speed_min_kmh.map_or(v, |m| m.min(v)));
                    seg.speed_max_kmh = Some(seg.speed_max_kmh.map_or(v, |m| m.max(v)));
                }
            }
            _ => segments.push(PhaseSegment {
                phase,
                start_idx: i,
                end_idx: i,
                start_t_s: tick.display_t_s,
                end_t_s: tick.display_t_s,
                speed_min_kmh: tick.speed_kmh,
                speed_max_kmh: tick.speed_kmh,
            }),
        }
    }
    segments
}

/// Merge segments shorter than `min_ticks` into the adjacent dominant
/// (longer) neighbor, repeating until stable.
fn merge_short_segments(segments: &mut Vec<PhaseSegment>, min_ticks: usize) {
    loop {
        if segments.len() < 2 {
            return;
        }
        let Some(pos) = segments
            .iter()
            .position(|s| s.end_idx - s.start_idx + 1 < min_ticks)
        else {
            return;
        };
        let prev_len = pos
            .checked_sub(1)
            .map(|p| segments[p].end_idx - segments[p].start_idx + 1);
        let next_len = segments
            .get(pos + 1)
            .map(|s| s.end_idx - s.start_idx + 1);
        let into_prev = match (prev_len, next_len) {
            (Some(p), Some(n)) => p >= n,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return,
        };
        let short = segments.remove(pos);
        if into_prev {
            let target = &mut segments[pos - 1];
            target.end_idx = short.end_idx;
            target.end_t_s = short.end_t_s;
            merge_speed_range(target, &short);
        } else {
            let target = &mut segments[pos];
            target.start_idx = short.start_idx;
            target.start_t_s = short.start_t_s;
            merge_speed_range(target, &short);
        }
        // Adjacent segments may now share a phase; coalesce before looping.
        coalesce_equal_neighbors(segments);
    }
}

fn merge_speed_range(target: &mut PhaseSegment, other: &PhaseSegment) {
    if let Some(v) = other.speed_min_kmh {
        target.speed_min_kmh = Some(target.speed_min_kmh.map_or(v, |m| m.min(v)));
    }
    if let Some(v) = other.speed_max_kmh {
        target.speed_max_kmh = Some(target.speed_max_kmh.map_or(v, |m| m.max(v)));
    }
}

fn coalesce_equal_neighbors(segments: &mut Vec<PhaseSegment>) {
    let mut i = 0;
    while i + 1 < segments.len() {
        if segments[i].phase == segments[i + 1].phase {
            let next = segments.remove(i + 1);
            let cur = &mut segments[i];
            cur.end_idx = next.end_idx;
            cur.end_t_s = next.end_t_s;
            merge_speed_range(cur, &next);
        } else {
            i += 1;
        }
    }
}

/// A deceleration segment that runs into standstill is a coast-down.
fn relabel_coast_down(segments: &mut [PhaseSegment]) {
    for i in 0..segments.len() {
        if segments[i].phase != DrivePhase::Deceleration {
            continue;
        }
        let ends_at_idle = segments
            .get(i + 1)
            .is_some_and(|next| next.phase == DrivePhase::Idle);
        if ends_at_idle {
            segments[i].phase = DrivePhase::CoastDown;
        }
    }
}
