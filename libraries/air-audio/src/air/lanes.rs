//! Mid and high processing lanes
//!
//! Each lane filters its own copy of the dry block and shapes it
//! dynamically. The lanes share no state with each other.

use air_core::{check_stereo_block, AirError, Result};

use super::curves::AirCurves;
use crate::effects::{
    DynamicsConfig, DynamicsState, DynamicsUnit, FilterState, GainTarget, RampState,
    RampedGainStage, StereoProcessor, ZdfFilter,
};

/// Persistent state of a mid lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidLaneState {
    pub filter: FilterState,
    pub expander: DynamicsState,
}

/// Filter, drive, RMS expander
pub struct MidLane {
    filter: ZdfFilter,
    drive: f32,
    expander: DynamicsUnit,
}

impl MidLane {
    /// Create a mid lane from the tuning data
    pub fn new(sample_rate: u32, curves: &AirCurves) -> Result<Self> {
        let expander = DynamicsUnit::new(DynamicsConfig {
            threshold: curves.expander_threshold,
            ratio: curves.expander_ratio,
            ..DynamicsConfig::expander(sample_rate)
        })?;

        Ok(Self {
            filter: ZdfFilter::new(curves.mid_filter)?,
            drive: curves.mid_drive(0.0),
            expander,
        })
    }

    /// Set the static gain applied between filter and expander
    pub fn set_drive(&mut self, drive: f32) -> Result<()> {
        if !drive.is_finite() {
            return Err(AirError::invalid_parameter("mid drive", drive));
        }
        self.drive = drive;
        Ok(())
    }

    /// Current drive
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Gain the expander applied to the most recent sample
    pub fn expander_gain(&self) -> f32 {
        self.expander.current_gain()
    }

    /// Snapshot of the persistent state
    pub fn state(&self) -> MidLaneState {
        MidLaneState {
            filter: self.filter.state(),
            expander: self.expander.state(),
        }
    }
}

impl StereoProcessor for MidLane {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        check_stereo_block(left, right)?;

        self.filter.process(left, right)?;

        let drive = self.drive;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l *= drive;
            *r *= drive;
        }

        self.expander.process(left, right)
    }

    fn name(&self) -> &str {
        "Mid Air Lane"
    }
}

/// Persistent state of a high lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighLaneState {
    pub filter: FilterState,
    pub gate: DynamicsState,
    pub boost: RampState,
    pub limiter: DynamicsState,
}

/// Filter, pass-through gate, ramped boost, peak limiter
pub struct HighLane {
    filter: ZdfFilter,
    gate: DynamicsUnit,
    boost: RampedGainStage,
    limiter: DynamicsUnit,
}

impl HighLane {
    /// Create a high lane from the tuning data, knob at zero
    pub fn new(sample_rate: u32, curves: &AirCurves) -> Result<Self> {
        let (threshold, ratio) = curves.limiter_settings(0.0);

        Ok(Self {
            filter: ZdfFilter::new(curves.high_filter)?,
            gate: DynamicsUnit::new(DynamicsConfig::pass_through_gate(sample_rate))?,
            boost: RampedGainStage::new(GainTarget::Normal(curves.high_boost(0.0)))?,
            limiter: DynamicsUnit::new(DynamicsConfig::limiter(sample_rate, threshold, ratio))?,
        })
    }

    /// Set the boost target; the change ramps across the next block
    pub fn set_boost(&mut self, boost: f32) -> Result<()> {
        self.boost.set_target(GainTarget::Normal(boost))
    }

    /// Boost gain the next block ramps toward
    pub fn boost_target(&self) -> f32 {
        self.boost.target().resolve()
    }

    /// Set limiter threshold and ratio together
    pub fn set_limiter(&mut self, threshold: f32, ratio: f32) -> Result<()> {
        let config = DynamicsConfig {
            threshold,
            ratio,
            ..self.limiter.config()
        };
        self.limiter.set_config(config)
    }

    /// Limiter configuration in effect
    pub fn limiter_config(&self) -> DynamicsConfig {
        self.limiter.config()
    }

    /// Gain the limiter applied to the most recent sample
    pub fn limiter_gain(&self) -> f32 {
        self.limiter.current_gain()
    }

    /// Boost stage meter `(left, right)` energy
    pub fn boost_meter(&self) -> (f32, f32) {
        self.boost.meter_energy()
    }

    /// Snapshot of the persistent state
    pub fn state(&self) -> HighLaneState {
        HighLaneState {
            filter: self.filter.state(),
            gate: self.gate.state(),
            boost: self.boost.state(),
            limiter: self.limiter.state(),
        }
    }
}

impl StereoProcessor for HighLane {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        check_stereo_block(left, right)?;

        self.filter.process(left, right)?;
        self.gate.process(left, right)?;
        self.boost.process(left, right)?;
        self.limiter.process(left, right)
    }

    fn name(&self) -> &str {
        "High Air Lane"
    }
}
