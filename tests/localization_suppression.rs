//! Localization and alias-suppression behavior through the full pipeline
//!
//! Wheel diagnoses must land on wheel sensors even when cabin sensors ride
//! the transfer path louder; engine/driveline aliases yield to a dominant
//! wheel finding; idle-only runs never produce wheel diagnoses.

mod common;

use common::*;
use vibediag::types::Peak;
use vibediag::{summarize_run, AnalysisConfig, SuspectedSource};

/// A cabin sensor carrying a louder transfer-path copy of the wheel-order
/// signal must not claim a wheel/tire diagnosis.
#[test]
fn wheel_diagnosis_prefers_wheel_sensor_over_louder_cabin() {
    let sensors = [
        SENSOR_FL,
        SENSOR_FR,
        SENSOR_RL,
        SENSOR_RR,
        SENSOR_DRIVER_SEAT,
    ];
    let whz = wheel_hz(80.0);
    let mut samples = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        for sensor in sensors {
            let peaks = if sensor == SENSOR_DRIVER_SEAT {
                // Transfer path amplifies the cabin reading.
                vec![Peak { hz: whz, amp: 0.08 }]
            } else if sensor == SENSOR_FL {
                vec![Peak { hz: whz, amp: 0.06 }]
            } else {
                vec![Peak { hz: 142.5, amp: 0.004 }]
            };
            let vib = if sensor == SENSOR_DRIVER_SEAT || sensor == SENSOR_FL {
                26.0
            } else {
                8.0
            };
            samples.push(make_sample(t, 80.0, sensor, peaks, vib, 0.004));
        }
    }

    let summary = run_analysis(&samples);
    let wheel = summary
        .findings
        .iter()
        .find(|f| f.suspected_source == SuspectedSource::WheelTire)
        .expect("wheel finding");
    assert!(
        wheel.strongest_location.contains("front-left wheel"),
        "wheel diagnosis assigned to {}",
        wheel.strongest_location
    );
}

/// Without any wheel sensor in the run, the strongest available location
/// wins the fallback.
#[test]
fn no_wheel_sensors_falls_back_to_strongest_location() {
    let whz = wheel_hz(80.0);
    let mut samples = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        samples.push(make_sample(
            t,
            80.0,
            SENSOR_DRIVER_SEAT,
            vec![Peak { hz: whz, amp: 0.07 }],
            24.0,
            0.004,
        ));
        samples.push(make_sample(
            t,
            80.0,
            SENSOR_TRUNK,
            vec![Peak { hz: 142.5, amp: 0.004 }],
            8.0,
            0.004,
        ));
    }

    let summary = run_analysis(&samples);
    let wheel = summary
        .findings
        .iter()
        .find(|f| f.suspected_source == SuspectedSource::WheelTire)
        .expect("wheel finding");
    assert_eq!(wheel.strongest_location, "driver-seat");
}

/// An idle-only run has no valid-speed samples, so no wheel-order
/// diagnosis can exist.
#[test]
fn idle_only_run_has_no_wheel_diagnosis() {
    let samples = idle_samples(&ALL_WHEEL_SENSORS, 30, 0.0);
    let summary = run_analysis(&samples);
    assert_no_wheel_fault(&summary);
    assert!(summary
        .findings
        .iter()
        .all(|f| f.suspected_source != SuspectedSource::WheelTire));
}

/// Engine/driveline findings riding the same physical signal as a
/// medium-confidence wheel finding end up strictly below it.
#[test]
fn engine_alias_is_suppressed_below_wheel_finding() {
    let whz = wheel_hz(80.0);
    // Engine-1x for this drivetrain sits at wheel_1x * 3.73 * 0.64.
    let ehz = whz * 3.73 * 0.64;
    let mut samples = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        for sensor in ALL_WHEEL_SENSORS {
            let peaks = if sensor == SENSOR_FL {
                vec![
                    Peak { hz: whz, amp: 0.07 },
                    Peak { hz: ehz, amp: 0.012 },
                ]
            } else {
                vec![Peak { hz: 142.5, amp: 0.004 }]
            };
            let vib = if sensor == SENSOR_FL { 26.0 } else { 8.0 };
            samples.push(make_sample(t, 80.0, sensor, peaks, vib, 0.004));
        }
    }

    let summary = run_analysis(&samples);
    let wheel_conf = summary
        .findings
        .iter()
        .find(|f| f.finding_key == "wheel_1x")
        .and_then(|f| f.confidence_0_to_1)
        .expect("wheel_1x finding");
    assert!(wheel_conf >= 0.40, "wheel confidence {wheel_conf}");

    let engine = summary
        .findings
        .iter()
        .find(|f| f.finding_key == "engine_1x")
        .expect("engine_1x finding");
    let engine_conf = engine.confidence_0_to_1.unwrap_or(1.0);
    assert!(
        engine_conf < wheel_conf,
        "engine {engine_conf} not below wheel {wheel_conf}"
    );
    // The wheel finding leads the ranking.
    let top = extract_top(&summary).expect("top cause");
    assert_eq!(top.suspected_source, SuspectedSource::WheelTire);
}

/// A single connected sensor still yields a finding, scaled down for the
/// missing corroboration.
#[test]
fn single_sensor_run_produces_scaled_down_finding() {
    let whz = wheel_hz(80.0);
    let samples: Vec<_> = (0..30)
        .map(|i| {
            make_sample(
                i as f64,
                80.0,
                SENSOR_FL,
                vec![Peak { hz: whz, amp: 0.07 }],
                26.0,
                0.004,
            )
        })
        .collect();
    let single = run_analysis(&samples);
    let single_conf = top_confidence(&single);
    assert!(single_conf > 0.0, "no finding for single-sensor run");

    // The same fault seen by four sensors scores higher.
    let four = run_analysis(&fault_samples(
        SENSOR_FL,
        &ALL_WHEEL_SENSORS,
        80.0,
        30,
        0.07,
        0.0,
        0.0,
    ));
    assert!(
        top_confidence(&four) > single_conf,
        "four-sensor {} vs single-sensor {single_conf}",
        top_confidence(&four)
    );
}

/// The most-likely-origin block mirrors the top cause and exposes
/// alternatives under weak separation.
#[test]
fn most_likely_origin_mirrors_top_cause() {
    let samples = fault_samples(SENSOR_RR, &ALL_WHEEL_SENSORS, 100.0, 30, 0.07, 0.0, 0.0);
    let summary = run_analysis(&samples);
    let origin = summary.most_likely_origin.as_ref().expect("origin");
    let top = extract_top(&summary).expect("top cause");
    assert_eq!(origin.location, top.strongest_location);
    assert_eq!(origin.speed_band, top.strongest_speed_band);
    assert_eq!(origin.confidence, Some(top.confidence));
}

/// Transfer-path leakage onto the other corners weakens separation but
/// keeps the fault on the loudest wheel.
#[test]
fn transfer_leakage_weakens_separation_but_keeps_corner() {
    let samples = fault_samples(
        SENSOR_FL,
        &ALL_WHEEL_SENSORS,
        80.0,
        30,
        0.06,
        0.05,
        0.0,
    );
    let summary = run_analysis(&samples);
    let wheel = summary
        .findings
        .iter()
        .find(|f| f.finding_key == "wheel_1x")
        .expect("wheel_1x finding");
    assert!(
        wheel.strongest_location.contains("front-left wheel"),
        "location: {}",
        wheel.strongest_location
    );
    assert!(wheel.weak_spatial_separation || wheel.ambiguous_location);
}

/// Missing drivetrain ratios drop engine references and surface REF_ENGINE.
#[test]
fn missing_gear_ratio_emits_reference_finding_not_engine_orders() {
    let mut meta = standard_metadata();
    meta.current_gear_ratio = None;
    let samples = fault_samples(SENSOR_FL, &ALL_WHEEL_SENSORS, 80.0, 30, 0.07, 0.0, 0.0);
    let summary = summarize_run(&meta, &samples, &AnalysisConfig::default());

    assert!(summary
        .findings
        .iter()
        .all(|f| !f.finding_key.starts_with("engine_")));
    assert!(summary
        .findings
        .iter()
        .any(|f| f.finding_key == "REF_ENGINE"));
    // Reference findings carry quick checks and sort after scored findings.
    let last = summary.findings.last().expect("findings present");
    assert!(last.finding_key.starts_with("REF_"));
}
