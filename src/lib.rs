//! VibeDiag: Vehicle Vibration Diagnostics Core
//!
//! Offline analysis pipeline that turns a run's metadata plus per-sample
//! spectral feature records into a ranked mechanical-fault diagnosis.
//!
//! ## Architecture
//!
//! - **Normalizer**: coerces heterogeneous records into canonical samples
//! - **Phase Segmenter**: idle / acceleration / cruise / deceleration from
//!   the speed trace
//! - **Peak Statistics**: per-frequency-bin presence, burstiness, SNR,
//!   classification
//! - **Order Matcher**: speed-scaled wheel / driveshaft / engine order
//!   tracking
//! - **Localizer**: source-aware hotspot selection and diffuse-excitation
//!   detection
//! - **Confidence Scorer**: weighted signal combination, clamped
//! - **Findings & Report**: suppression, ranking, suitability checks,
//!   plots, summary

pub mod baseline;
pub mod confidence;
pub mod config;
pub mod findings;
pub mod localization;
pub mod normalize;
pub mod orders;
pub mod peaks;
pub mod phases;
pub mod plots;
pub mod report;
pub mod speedbins;
pub mod stats;
pub mod types;

// Re-export the pipeline entry points
pub use report::{summarize_run, summarize_run_json};

// Re-export configuration
pub use config::AnalysisConfig;

// Re-export commonly used types
pub use types::{
    AnalysisSummary, CertaintyTier, ConfidenceLabel, DrivePhase, Finding, FindingType,
    InvalidMetadataError, Language, Peak, PeakClassification, RunMetadata, SampleRecord,
    SensorLocation, SpeedSource, SuspectedSource, TopCause,
};
