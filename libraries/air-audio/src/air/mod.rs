//! Fresh Air enhancer
//!
//! - `curves`: injected tuning data (knob curves, filter coefficients, constants)
//! - `lanes`: the mid and high processing lanes
//! - `processor`: the composite that sums dry and lanes, then trims and pads

mod curves;
mod lanes;
mod processor;

pub use curves::{AirCurves, MAX_LIMITER_RATIO, STATIC_PAD};
pub use lanes::{HighLane, HighLaneState, MidLane, MidLaneState};
pub use processor::{AirMeters, AirParameters, AirSnapshot, FreshAir};
