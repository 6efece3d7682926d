//! Signal processing kernels
//!
//! The three building blocks of the air chain. Each one owns its persistent
//! state outright and exposes it read-only through `state()`; nothing is
//! shared between instances, so independent streams need independent
//! instances.
//!
//! Available kernels:
//! - **DynamicsUnit**: envelope follower, gain computer and gain ballistics
//! - **RampedGainStage**: de-zippered gain with per-channel energy metering
//! - **ZdfFilter**: two-pole zero-delay-feedback state-variable filter

mod dynamics;
mod processor;
mod ramp;
mod zdf;

pub use dynamics::{
    one_pole_coeff, target_gain, DetectorMode, DynamicsConfig, DynamicsState, DynamicsUnit,
    DEFAULT_ATTACK_SECS, DEFAULT_RELEASE_SECS, EXPANDER_RATIO, EXPANDER_THRESHOLD,
};
pub use processor::StereoProcessor;
pub use ramp::{GainTarget, MeterCoefficients, RampState, RampedGainStage};
pub use zdf::{FilterState, ZdfCoefficients, ZdfDesign, ZdfFilter};
