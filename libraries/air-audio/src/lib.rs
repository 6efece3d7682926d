//! Harmonic Air Audio
//!
//! Real-time processing core of the Fresh Air enhancer: a parallel
//! mid/high "air" lane structure summed back onto the dry signal.
//!
//! This crate provides:
//! - Reusable stereo kernels: dynamics unit, ramped gain stage, zero-delay-feedback filter
//! - The two air lanes built from those kernels
//! - The `FreshAir` composite with knob handling, metering and state snapshots
//!
//! Samples are planar `f32` slices processed in place.
//!
//! # Example
//!
//! ```rust
//! use air_audio::air::{AirParameters, FreshAir};
//! use air_audio::effects::StereoProcessor;
//!
//! let mut air = FreshAir::new(48000, 256).unwrap();
//! air.set_parameters(AirParameters {
//!     mid_air: 0.25,
//!     high_air: 0.6,
//!     trim_db: 0.0,
//! })
//! .unwrap();
//!
//! let mut left: Vec<f32> = (0..256).map(|i| (i as f32 * 0.3).sin() * 0.2).collect();
//! let mut right = left.clone();
//! air.process(&mut left, &mut right).unwrap();
//!
//! let meters = air.meters();
//! println!("pad meter: {:?}", meters.pad);
//! ```

#![forbid(unsafe_code)]

pub mod air;
pub mod effects;

pub use air::{AirCurves, AirParameters, FreshAir};
pub use air_core::{AirError, CurveTable, Result};
pub use effects::StereoProcessor;
