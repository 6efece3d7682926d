//! Fresh Air composite processor
//!
//! Splits every block into a dry copy and two lane copies, runs the mid and
//! high lanes, sums the three back together and applies output trim followed
//! by the static pad:
//!
//! ```text
//! dry ─────────────────────────┐
//! dry → MidLane ───────────────┼─(+)→ trim → pad → out
//! dry → HighLane ──────────────┘
//! ```

use std::sync::Arc;

use air_core::{check_stereo_block, db_to_linear, AirError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::curves::AirCurves;
use super::lanes::{HighLane, HighLaneState, MidLane, MidLaneState};
use crate::effects::{GainTarget, RampState, RampedGainStage, StereoProcessor};

/// User-facing knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirParameters {
    /// Mid air amount, 0 to 1
    pub mid_air: f32,

    /// High air amount, 0 to 1
    pub high_air: f32,

    /// Output trim in dB
    pub trim_db: f32,
}

impl Default for AirParameters {
    fn default() -> Self {
        Self {
            mid_air: 0.0,
            high_air: 0.0,
            trim_db: 0.0,
        }
    }
}

impl AirParameters {
    /// Reject knobs outside [0, 1] and non-finite trim
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("mid air", self.mid_air), ("high air", self.high_air)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AirError::invalid_parameter(name, value));
            }
        }
        if !self.trim_db.is_finite() {
            return Err(AirError::invalid_parameter("trim", self.trim_db));
        }
        Ok(())
    }
}

/// Meter energy `(left, right)` of each ramped stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirMeters {
    pub boost: (f32, f32),
    pub trim: (f32, f32),
    pub pad: (f32, f32),
}

/// Every piece of persistent state in the chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirSnapshot {
    pub mid: MidLaneState,
    pub high: HighLaneState,
    pub trim: RampState,
    pub pad: RampState,
}

/// Per-lane copies of the input block
struct LaneScratch {
    mid_left: Vec<f32>,
    mid_right: Vec<f32>,
    high_left: Vec<f32>,
    high_right: Vec<f32>,
}

impl LaneScratch {
    fn new(block_size: usize) -> Self {
        Self {
            mid_left: vec![0.0; block_size],
            mid_right: vec![0.0; block_size],
            high_left: vec![0.0; block_size],
            high_right: vec![0.0; block_size],
        }
    }

    fn capacity(&self) -> usize {
        self.mid_left.len()
    }

    fn ensure(&mut self, block_size: usize) {
        if block_size <= self.capacity() {
            return;
        }
        debug!(
            from = self.capacity(),
            to = block_size,
            "growing lane scratch buffers"
        );
        for buffer in [
            &mut self.mid_left,
            &mut self.mid_right,
            &mut self.high_left,
            &mut self.high_right,
        ] {
            buffer.resize(block_size, 0.0);
        }
    }
}

/// Parallel mid/high air enhancer
///
/// # Real-Time Constraints
///
/// `process()` does not allocate as long as blocks stay within the size given
/// at construction. A larger block grows the scratch buffers once.
///
/// # Example
///
/// ```rust
/// use air_audio::air::{AirParameters, FreshAir};
/// use air_audio::effects::StereoProcessor;
///
/// let mut air = FreshAir::new(44100, 512).unwrap();
/// air.set_parameters(AirParameters {
///     mid_air: 0.3,
///     high_air: 0.5,
///     trim_db: -1.0,
/// })
/// .unwrap();
///
/// let mut left = vec![0.0f32; 512];
/// let mut right = vec![0.0f32; 512];
/// air.process(&mut left, &mut right).unwrap();
/// ```
pub struct FreshAir {
    curves: Arc<AirCurves>,
    parameters: AirParameters,
    mid: MidLane,
    high: HighLane,
    trim: RampedGainStage,
    pad: RampedGainStage,
    scratch: LaneScratch,
}

impl FreshAir {
    /// Create a processor with the factory tuning
    pub fn new(sample_rate: u32, max_block_size: usize) -> Result<Self> {
        Self::with_curves(sample_rate, max_block_size, AirCurves::factory())
    }

    /// Create a processor with caller-supplied tuning
    pub fn with_curves(
        sample_rate: u32,
        max_block_size: usize,
        curves: Arc<AirCurves>,
    ) -> Result<Self> {
        curves.validate()?;

        let mut air = Self {
            mid: MidLane::new(sample_rate, &curves)?,
            high: HighLane::new(sample_rate, &curves)?,
            trim: RampedGainStage::new(GainTarget::Normal(1.0))?,
            pad: RampedGainStage::new(GainTarget::Normal(curves.static_pad))?,
            scratch: LaneScratch::new(max_block_size),
            parameters: AirParameters::default(),
            curves,
        };
        air.set_parameters(AirParameters::default())?;
        Ok(air)
    }

    /// Apply new knob positions
    ///
    /// Only derived scalars change; filter, dynamics and ramp state carry
    /// over so the next block continues seamlessly. Gain changes ramp across
    /// the next block. All derived values are checked before any stage is
    /// touched, so a rejected update leaves the processor as it was.
    pub fn set_parameters(&mut self, parameters: AirParameters) -> Result<()> {
        parameters.validate()?;

        let trim = db_to_linear(parameters.trim_db);
        let drive = self.curves.mid_drive(parameters.mid_air);
        let boost = self.curves.high_boost(parameters.high_air);
        let (threshold, ratio) = self.curves.limiter_settings(parameters.high_air);

        // Nothing below this point may fail
        let gains = [("trim gain", trim), ("mid drive", drive), ("high boost", boost)];
        if let Some((name, value)) = gains.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AirError::invalid_parameter(name, value));
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AirError::InvalidThreshold(threshold));
        }
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(AirError::InvalidRatio(ratio));
        }

        self.trim.set_target(GainTarget::Normal(trim))?;
        self.mid.set_drive(drive)?;
        self.high.set_boost(boost)?;
        self.high.set_limiter(threshold, ratio)?;

        debug!(
            mid_air = parameters.mid_air,
            high_air = parameters.high_air,
            trim_db = parameters.trim_db,
            drive,
            boost,
            limiter_threshold = threshold,
            limiter_ratio = ratio,
            "air parameters updated"
        );

        self.parameters = parameters;
        Ok(())
    }

    /// Knob positions in effect
    pub fn parameters(&self) -> AirParameters {
        self.parameters
    }

    /// Tuning data this processor was built with
    pub fn curves(&self) -> &Arc<AirCurves> {
        &self.curves
    }

    /// Largest block processed without growing the scratch buffers
    pub fn max_block_size(&self) -> usize {
        self.scratch.capacity()
    }

    /// Current meter energies; reading never mutates state
    pub fn meters(&self) -> AirMeters {
        AirMeters {
            boost: self.high.boost_meter(),
            trim: self.trim.meter_energy(),
            pad: self.pad.meter_energy(),
        }
    }

    /// Copy of all persistent state
    pub fn state_snapshot(&self) -> AirSnapshot {
        AirSnapshot {
            mid: self.mid.state(),
            high: self.high.state(),
            trim: self.trim.state(),
            pad: self.pad.state(),
        }
    }
}

impl StereoProcessor for FreshAir {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        let len = check_stereo_block(left, right)?;
        if len == 0 {
            return Ok(());
        }

        self.scratch.ensure(len);
        let LaneScratch {
            mid_left,
            mid_right,
            high_left,
            high_right,
        } = &mut self.scratch;

        let (mid_left, mid_right) = (&mut mid_left[..len], &mut mid_right[..len]);
        let (high_left, high_right) = (&mut high_left[..len], &mut high_right[..len]);
        mid_left.copy_from_slice(left);
        mid_right.copy_from_slice(right);
        high_left.copy_from_slice(left);
        high_right.copy_from_slice(right);

        self.mid.process(mid_left, mid_right)?;
        self.high.process(high_left, high_right)?;

        for (l, (mid, high)) in left
            .iter_mut()
            .zip(mid_left.iter().zip(high_left.iter()))
        {
            *l += *mid + *high;
        }
        for (r, (mid, high)) in right
            .iter_mut()
            .zip(mid_right.iter().zip(high_right.iter()))
        {
            *r += *mid + *high;
        }

        self.trim.process(left, right)?;
        self.pad.process(left, right)
    }

    fn name(&self) -> &str {
        "Fresh Air"
    }
}
