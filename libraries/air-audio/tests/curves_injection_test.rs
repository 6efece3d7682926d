//! Tuning data injection tests
//!
//! The processor must run on whatever `AirCurves` it is handed. These tests
//! load synthetic tables from JSON and check the chain honours them.

use std::sync::Arc;

use air_audio::air::{AirCurves, AirParameters, FreshAir, MidLane};
use air_audio::effects::StereoProcessor;
use air_audio::AirError;

/// Silent filters and a 0.5 pad: the chain reduces to `dry * 0.5`
const SILENT_LANES: &str = r#"{
    "mid_drive": [[0.0, 1.0], [1.0, 2.0]],
    "limiter_threshold": [[0.0, 0.5], [1.0, 0.25]],
    "limiter_slope": [[0.0, 0.5], [1.0, 1.0]],
    "mid_filter": { "g": 0.5, "damping": 0.7, "high_mix": 0.0, "band_mix": 0.0, "low_mix": 0.0 },
    "high_filter": { "g": 0.9, "damping": 0.7, "high_mix": 0.0, "band_mix": 0.0, "low_mix": 0.0 },
    "drive_offset": 0.0,
    "boost_scale": 1.0,
    "boost_exponent": 1.0,
    "static_pad": 0.5,
    "max_limiter_ratio": 10.0,
    "expander_threshold": 0.0316,
    "expander_ratio": 2.0
}"#;

fn silent_lanes() -> AirCurves {
    serde_json::from_str(SILENT_LANES).unwrap()
}

#[test]
fn synthetic_curves_drive_the_chain() {
    let curves = Arc::new(silent_lanes());
    assert!(curves.validate().is_ok());

    let mut air = FreshAir::with_curves(48000, 64, Arc::clone(&curves)).unwrap();
    let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin() * 0.8).collect();
    let mut left = input.clone();
    let mut right: Vec<f32> = input.iter().map(|s| -s).collect();
    air.process(&mut left, &mut right).unwrap();

    for (i, (&out, &dry)) in left.iter().zip(input.iter()).enumerate() {
        assert_eq!(out, dry * 0.5, "sample {}", i);
    }
    assert_eq!(right[10], -input[10] * 0.5);
}

#[test]
fn synthetic_curves_map_knobs() {
    let curves = silent_lanes();

    assert_eq!(curves.mid_drive(0.5), 1.5);
    assert_eq!(curves.high_boost(0.5), 1.5);

    let (threshold, ratio) = curves.limiter_settings(0.5);
    assert_eq!(threshold, 0.375);
    assert_eq!(ratio, 1.0 / (1.0 - 0.75));

    // Slope reaches 1 at the top: ratio clamps to the ceiling
    assert_eq!(curves.limiter_settings(1.0).1, 10.0);
}

#[test]
fn drive_offset_is_overridable() {
    let mut curves = silent_lanes();
    curves.drive_offset = 0.25;

    let lane = MidLane::new(44100, &curves).unwrap();
    assert_eq!(lane.drive(), 0.75);
}

#[test]
fn unsorted_curve_is_rejected_on_load() {
    let json = SILENT_LANES.replace(
        "[[0.0, 1.0], [1.0, 2.0]]",
        "[[1.0, 1.0], [0.0, 2.0]]",
    );
    let err = serde_json::from_str::<AirCurves>(&json).unwrap_err();
    assert!(err.to_string().contains("strictly increasing"), "{}", err);
}

#[test]
fn empty_curve_is_rejected_on_load() {
    let json = SILENT_LANES.replace("[[0.0, 0.5], [1.0, 0.25]]", "[]");
    assert!(serde_json::from_str::<AirCurves>(&json).is_err());
}

#[test]
fn unusable_tuning_is_rejected_at_construction() {
    let mut curves = silent_lanes();
    curves.limiter_threshold = air_core::CurveTable::new(vec![(0.0, 0.5), (1.0, -0.1)]).unwrap();

    let result = FreshAir::with_curves(44100, 64, Arc::new(curves));
    assert!(matches!(result, Err(AirError::InvalidCurve(_))));

    let mut curves = silent_lanes();
    curves.expander_ratio = 0.0;
    assert!(matches!(
        FreshAir::with_curves(44100, 64, Arc::new(curves)),
        Err(AirError::InvalidRatio(_))
    ));
}

#[test]
fn factory_curves_survive_json_round_trip() {
    let json = serde_json::to_string_pretty(AirCurves::factory().as_ref()).unwrap();
    let loaded: AirCurves = serde_json::from_str(&json).unwrap();

    let mut air = FreshAir::with_curves(44100, 32, Arc::new(loaded)).unwrap();
    air.set_parameters(AirParameters {
        mid_air: 0.5,
        high_air: 0.5,
        trim_db: 0.0,
    })
    .unwrap();
}
