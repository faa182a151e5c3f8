//! Driving-phase classification types

use serde::{Deserialize, Serialize};

/// Driving phase of a sample, classified from the speed trace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrivePhase {
    Idle,
    Acceleration,
    Cruise,
    Deceleration,
    /// Deceleration segment that ends at standstill
    CoastDown,
    #[default]
    SpeedUnknown,
}

impl std::fmt::Display for DrivePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DrivePhase::Idle => "idle",
            DrivePhase::Acceleration => "acceleration",
            DrivePhase::Cruise => "cruise",
            DrivePhase::Deceleration => "deceleration",
            DrivePhase::CoastDown => "coast_down",
            DrivePhase::SpeedUnknown => "speed_unknown",
        };
        f.write_str(s)
    }
}

/// A maximal run of consecutive ticks sharing one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseSegment {
    pub phase: DrivePhase,
    /// First tick index (inclusive)
    pub start_idx: usize,
    /// Last tick index (inclusive)
    pub end_idx: usize,
    pub start_t_s: f64,
    pub end_t_s: f64,
    pub speed_min_kmh: Option<f64>,
    pub speed_max_kmh: Option<f64>,
}
