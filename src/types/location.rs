//! Canonical sensor mounting locations and alias handling
//!
//! Incoming records label sensors with free-form text ("FL", "front_left",
//! "Front Left Wheel"). Everything downstream works on the canonical enum so
//! localization and ordering stay deterministic.

use serde::{Deserialize, Serialize};

/// Canonical sensor mounting location.
///
/// The declaration order is the canonical tie-break order used when sorting
/// rows with equal sort keys.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub enum SensorLocation {
    #[serde(rename = "front-left wheel")]
    FrontLeftWheel,
    #[serde(rename = "front-right wheel")]
    FrontRightWheel,
    #[serde(rename = "rear-left wheel")]
    RearLeftWheel,
    #[serde(rename = "rear-right wheel")]
    RearRightWheel,
    #[serde(rename = "engine-bay")]
    EngineBay,
    #[serde(rename = "driveshaft-tunnel")]
    DriveshaftTunnel,
    #[serde(rename = "transmission")]
    Transmission,
    #[serde(rename = "trunk")]
    Trunk,
    #[serde(rename = "driver-seat")]
    DriverSeat,
    #[serde(rename = "front-passenger-seat")]
    FrontPassengerSeat,
    #[serde(rename = "dashboard")]
    Dashboard,
    #[serde(rename = "front-subframe")]
    FrontSubframe,
    #[serde(rename = "rear-subframe")]
    RearSubframe,
    #[serde(rename = "other")]
    #[default]
    Other,
}

/// The four wheel corners, in canonical order.
pub const WHEEL_LOCATIONS: [SensorLocation; 4] = [
    SensorLocation::FrontLeftWheel,
    SensorLocation::FrontRightWheel,
    SensorLocation::RearLeftWheel,
    SensorLocation::RearRightWheel,
];

impl SensorLocation {
    /// Canonicalize a free-form label via the case-insensitive alias table.
    ///
    /// Separators (`-`, `_`, whitespace) are interchangeable; a trailing
    /// "wheel"/"sensor" token is ignored for the wheel corners. Unknown
    /// labels map to `Other`.
    pub fn canonicalize(label: &str) -> Self {
        let key = normalize_label(label);
        match key.as_str() {
            "fl" | "front left" | "front left wheel" | "fl wheel" | "left front" => {
                Self::FrontLeftWheel
            }
            "fr" | "front right" | "front right wheel" | "fr wheel" | "right front" => {
                Self::FrontRightWheel
            }
            "rl" | "rear left" | "rear left wheel" | "rl wheel" | "left rear" => {
                Self::RearLeftWheel
            }
            "rr" | "rear right" | "rear right wheel" | "rr wheel" | "right rear" => {
                Self::RearRightWheel
            }
            "engine" | "engine bay" => Self::EngineBay,
            "driveshaft" | "driveshaft tunnel" => Self::DriveshaftTunnel,
            "transmission" | "gearbox" => Self::Transmission,
            "trunk" | "boot" => Self::Trunk,
            "driver seat" | "driver" => Self::DriverSeat,
            "front passenger seat" | "passenger seat" | "front passenger" => {
                Self::FrontPassengerSeat
            }
            "dashboard" | "dash" => Self::Dashboard,
            "front subframe" => Self::FrontSubframe,
            "rear subframe" => Self::RearSubframe,
            _ => Self::Other,
        }
    }

    /// True for the four wheel corners.
    pub fn is_wheel(self) -> bool {
        matches!(
            self,
            Self::FrontLeftWheel | Self::FrontRightWheel | Self::RearLeftWheel | Self::RearRightWheel
        )
    }

    /// Canonical display label (matches the serialized form).
    pub fn label(self) -> &'static str {
        match self {
            Self::FrontLeftWheel => "front-left wheel",
            Self::FrontRightWheel => "front-right wheel",
            Self::RearLeftWheel => "rear-left wheel",
            Self::RearRightWheel => "rear-right wheel",
            Self::EngineBay => "engine-bay",
            Self::DriveshaftTunnel => "driveshaft-tunnel",
            Self::Transmission => "transmission",
            Self::Trunk => "trunk",
            Self::DriverSeat => "driver-seat",
            Self::FrontPassengerSeat => "front-passenger-seat",
            Self::Dashboard => "dashboard",
            Self::FrontSubframe => "front-subframe",
            Self::RearSubframe => "rear-subframe",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for SensorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercase and collapse `-`/`_`/whitespace runs into single spaces.
fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_was_space = true;
    for ch in label.chars() {
        let mapped = match ch {
            '-' | '_' => ' ',
            c => c.to_ascii_lowercase(),
        };
        if mapped == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(mapped);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_aliases_canonicalize() {
        for label in ["FL", "front_left", "front-left wheel", "Front Left", "FL Wheel"] {
            assert_eq!(
                SensorLocation::canonicalize(label),
                SensorLocation::FrontLeftWheel,
                "alias {label:?}"
            );
        }
        assert_eq!(
            SensorLocation::canonicalize("rear_right"),
            SensorLocation::RearRightWheel
        );
    }

    #[test]
    fn non_wheel_labels_keep_canonical_non_wheel_form() {
        assert_eq!(
            SensorLocation::canonicalize("Engine Bay"),
            SensorLocation::EngineBay
        );
        assert_eq!(
            SensorLocation::canonicalize("driveshaft_tunnel"),
            SensorLocation::DriveshaftTunnel
        );
        assert_eq!(
            SensorLocation::canonicalize("Driver Seat"),
            SensorLocation::DriverSeat
        );
        assert!(!SensorLocation::canonicalize("trunk").is_wheel());
    }

    #[test]
    fn unknown_and_empty_labels_map_to_other() {
        assert_eq!(SensorLocation::canonicalize(""), SensorLocation::Other);
        assert_eq!(SensorLocation::canonicalize("   "), SensorLocation::Other);
        assert_eq!(
            SensorLocation::canonicalize("rear-center-seat"),
            SensorLocation::Other
        );
    }

    #[test]
    fn wheel_location_set_is_complete() {
        assert_eq!(WHEEL_LOCATIONS.len(), 4);
        for loc in WHEEL_LOCATIONS {
            assert!(loc.is_wheel());
        }
        assert!(!SensorLocation::EngineBay.is_wheel());
    }

    #[test]
    fn canonical_order_puts_wheels_first() {
        assert!(SensorLocation::FrontLeftWheel < SensorLocation::EngineBay);
        assert!(SensorLocation::RearRightWheel < SensorLocation::Trunk);
        assert!(SensorLocation::Dashboard < SensorLocation::Other);
    }
}
