/// De-zippered gain stage with energy metering
///
/// Applies a linear gain to a stereo block. When the target changes between
/// calls the gain is interpolated linearly across the next block, so an
/// abrupt knob move never produces a step in the output. Each channel also
/// drives a one-pole power meter for display.
use air_core::{check_stereo_block, linear_to_db, AirError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::processor::StereoProcessor;

/// Smallest target change that starts a ramp
const RAMP_TOLERANCE: f32 = 1e-15;

/// How the caller's value maps to the linear target gain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GainTarget {
    /// Use the value as-is
    Normal(f32),
    /// Double the value
    Boost(f32),
}

impl GainTarget {
    /// Linear gain this target resolves to
    #[inline]
    pub fn resolve(self) -> f32 {
        match self {
            Self::Normal(value) => value,
            Self::Boost(value) => value * 2.0,
        }
    }
}

impl Default for GainTarget {
    fn default() -> Self {
        Self::Normal(1.0)
    }
}

/// Per-channel meter smoothing factors, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterCoefficients {
    pub left: f32,
    pub right: f32,
}

impl MeterCoefficients {
    /// Same smoothing factor on both channels
    pub fn linked(coeff: f32) -> Self {
        Self {
            left: coeff,
            right: coeff,
        }
    }

    fn validate(&self) -> Result<()> {
        for value in [self.left, self.right] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AirError::invalid_parameter("meter coefficient", value));
            }
        }
        Ok(())
    }
}

impl Default for MeterCoefficients {
    fn default() -> Self {
        Self::linked(0.1)
    }
}

/// Persistent ramp and meter state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RampState {
    /// False until the first non-empty block
    pub initialized: bool,
    /// Target of the previous block, compared against the next target
    pub stored_target_gain: f32,
    /// Ramp origin for the current block
    pub start_gain: f32,
    /// Per-sample increment of the interpolation factor (0 = no ramp)
    pub ramp_step: f32,
    /// Gain applied to the most recent sample
    pub current_gain: f32,
    /// Smoothed output power, left then right
    pub meter_energy: [f32; 2],
}

/// Linearly interpolated gain with metering
pub struct RampedGainStage {
    target: GainTarget,
    meter: MeterCoefficients,
    state: RampState,
}

impl RampedGainStage {
    /// Create a stage with default meter smoothing
    pub fn new(target: GainTarget) -> Result<Self> {
        Self::with_meter(target, MeterCoefficients::default())
    }

    /// Create a stage with explicit meter smoothing
    pub fn with_meter(target: GainTarget, meter: MeterCoefficients) -> Result<Self> {
        meter.validate()?;
        let mut stage = Self {
            target: GainTarget::default(),
            meter,
            state: RampState::default(),
        };
        stage.set_target(target)?;
        Ok(stage)
    }

    /// Set the gain target for the next block
    ///
    /// Takes effect on the next `process()` call, ramping from the previous
    /// block's target across that block.
    pub fn set_target(&mut self, target: GainTarget) -> Result<()> {
        let gain = target.resolve();
        if !gain.is_finite() {
            return Err(AirError::invalid_parameter("gain target", gain));
        }
        self.target = target;
        Ok(())
    }

    /// Target that the next block will ramp toward
    pub fn target(&self) -> GainTarget {
        self.target
    }

    /// Snapshot of the persistent state
    pub fn state(&self) -> RampState {
        self.state
    }

    /// Gain applied to the most recent sample
    pub fn current_gain(&self) -> f32 {
        self.state.current_gain
    }

    /// Smoothed output power `(left, right)`
    pub fn meter_energy(&self) -> (f32, f32) {
        (self.state.meter_energy[0], self.state.meter_energy[1])
    }

    /// Smoothed output level in dBFS `(left, right)`
    pub fn meter_db(&self) -> (f32, f32) {
        let (left, right) = self.meter_energy();
        (linear_to_db(left.sqrt()), linear_to_db(right.sqrt()))
    }

    /// Decide start gain and step for a block of `len` samples
    fn setup_ramp(&mut self, target: f32, len: usize) {
        let state = &mut self.state;

        if !state.initialized {
            state.initialized = true;
            state.start_gain = target;
            state.current_gain = target;
            state.ramp_step = 0.0;
        } else if (target - state.stored_target_gain).abs() >= RAMP_TOLERANCE {
            state.ramp_step = 1.0 / len as f32;
            state.start_gain = state.stored_target_gain;
            trace!(
                from = state.start_gain,
                to = target,
                samples = len,
                "gain ramp started"
            );
        } else {
            state.ramp_step = 0.0;
            state.start_gain = target;
        }

        state.stored_target_gain = target;
    }
}

impl StereoProcessor for RampedGainStage {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        let len = check_stereo_block(left, right)?;
        if len == 0 {
            return Ok(());
        }

        let target = self.target.resolve();
        self.setup_ramp(target, len);

        let RampState {
            start_gain,
            ramp_step,
            ..
        } = self.state;
        let (coeff_l, coeff_r) = (self.meter.left, self.meter.right);
        let mut energy = self.state.meter_energy;
        let mut gain = self.state.current_gain;
        let mut counter = 0.0f32;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            counter += 1.0;
            gain = if ramp_step > 0.0 {
                let t = counter * ramp_step;
                (1.0 - t) * start_gain + t * target
            } else {
                target
            };

            // Both channels share the sample's gain
            *l *= gain;
            *r *= gain;

            energy[0] += (*l * *l - energy[0]) * coeff_l;
            energy[1] += (*r * *r - energy[1]) * coeff_r;
        }

        self.state.current_gain = gain;
        self.state.meter_energy = energy;
        Ok(())
    }

    fn name(&self) -> &str {
        "Ramped Gain"
    }
}
