//! Tuning data for the air processor
//!
//! Everything knob-dependent that is not an algorithm lives here: the
//! breakpoint curves, the two filter coefficient sets and the handful of
//! scalar constants. The processor only ever sees an `AirCurves` value, so
//! tests and hosts can inject their own tables.

use std::sync::{Arc, OnceLock};

use air_core::{AirError, CurveTable, Result};
use serde::{Deserialize, Serialize};

use crate::effects::{ZdfCoefficients, EXPANDER_RATIO, EXPANDER_THRESHOLD};

/// Static output pad, about -1.7 dB
pub const STATIC_PAD: f32 = 0.822;

/// Ratio used once the limiter slope reaches 1
pub const MAX_LIMITER_RATIO: f32 = 20.0;

/// Knob-to-parameter tables and constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirCurves {
    /// Mid-air knob to pre-expander drive, before `drive_offset`
    pub mid_drive: CurveTable,

    /// High-air knob to limiter threshold (linear)
    pub limiter_threshold: CurveTable,

    /// High-air knob to limiter slope, `1 - 1/ratio`
    pub limiter_slope: CurveTable,

    /// Mid band filter, loaded as runtime coefficients
    pub mid_filter: ZdfCoefficients,

    /// High band filter, loaded as runtime coefficients
    pub high_filter: ZdfCoefficients,

    /// Subtracted from the mid drive curve
    ///
    /// Empirical, not derived from anything; 0.05 is a best guess and can be
    /// overridden when a better value is known.
    pub drive_offset: f64,

    /// `k` in the high boost `1 + k * knob^exponent`
    pub boost_scale: f64,

    /// Exponent in the high boost
    pub boost_exponent: f64,

    /// Fixed output pad (linear)
    pub static_pad: f32,

    /// Ratio ceiling when the slope curve reaches 1
    pub max_limiter_ratio: f32,

    /// Mid expander threshold (linear)
    pub expander_threshold: f32,

    /// Mid expander ratio
    pub expander_ratio: f32,
}

impl AirCurves {
    /// Shared copy of the factory tuning
    ///
    /// Built on first use; every caller gets the same read-only instance.
    pub fn factory() -> Arc<Self> {
        static FACTORY: OnceLock<Arc<AirCurves>> = OnceLock::new();
        FACTORY.get_or_init(|| Arc::new(Self::build_factory())).clone()
    }

    fn build_factory() -> Self {
        let curve = |points: Vec<(f64, f64)>| {
            CurveTable::new(points).expect("factory curve breakpoints are sorted and finite")
        };

        Self {
            mid_drive: curve(vec![
                (0.00, 0.6595369560821669),
                (0.25, 1.0333940963573542),
                (0.50, 1.3151381002089715),
                (0.75, 1.601907014012165),
                (1.00, 1.9049780366103688),
            ]),
            limiter_threshold: curve(vec![
                (0.00, 0.5010011792182922),
                (0.25, 0.2919630706310272),
                (0.50, 0.21848657727241516),
                (0.75, 0.17235150933265686),
                (1.00, 0.13993535935878754),
            ]),
            limiter_slope: curve(vec![
                (0.00, 0.7390604615211487),
                (0.25, 0.6370992064476013),
                (0.50, 0.582358717918396),
                (0.75, 0.537571907043457),
                (1.00, 0.498229444026947),
            ]),
            mid_filter: ZdfCoefficients::from_array([
                0.21702805830713853,
                0.7929947002337122,
                0.9999999999999999,
                0.0,
                0.0,
            ]),
            high_filter: ZdfCoefficients::from_array([
                0.7463190713881916,
                0.7072135613293842,
                1.0,
                0.0,
                0.0,
            ]),
            drive_offset: 0.05,
            boost_scale: 0.8962,
            boost_exponent: 0.8,
            static_pad: STATIC_PAD,
            max_limiter_ratio: MAX_LIMITER_RATIO,
            expander_threshold: EXPANDER_THRESHOLD,
            expander_ratio: EXPANDER_RATIO,
        }
    }

    /// Check that every knob position yields a usable configuration
    pub fn validate(&self) -> Result<()> {
        let (min_threshold, _) = self.limiter_threshold.value_range();
        if min_threshold <= 0.0 {
            return Err(AirError::invalid_curve(format!(
                "limiter threshold curve reaches {min_threshold}, must stay above 0"
            )));
        }

        let scalars = [
            ("drive offset", self.drive_offset),
            ("boost scale", self.boost_scale),
            ("boost exponent", self.boost_exponent),
            ("static pad", f64::from(self.static_pad)),
        ];
        if let Some((name, value)) = scalars.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AirError::invalid_parameter(name, value));
        }
        // Drive is piecewise linear and boost monotonic, so the extremes bound them
        let (min_drive, max_drive) = self.mid_drive.value_range();
        for drive in [min_drive, max_drive] {
            let drive = (drive - self.drive_offset) as f32;
            if !drive.is_finite() {
                return Err(AirError::invalid_curve(format!("mid drive reaches {drive}")));
            }
        }
        for knob in [0.0, 1.0] {
            let boost = self.high_boost(knob);
            if !boost.is_finite() {
                return Err(AirError::invalid_curve(format!(
                    "high boost reaches {boost} at knob {knob}"
                )));
            }
        }
        if !self.max_limiter_ratio.is_finite() || self.max_limiter_ratio <= 1.0 {
            return Err(AirError::InvalidRatio(self.max_limiter_ratio));
        }
        if !self.expander_threshold.is_finite() || self.expander_threshold <= 0.0 {
            return Err(AirError::InvalidThreshold(self.expander_threshold));
        }
        if !self.expander_ratio.is_finite() || self.expander_ratio <= 0.0 {
            return Err(AirError::InvalidRatio(self.expander_ratio));
        }
        Ok(())
    }

    /// Pre-expander gain for the mid band
    pub fn mid_drive(&self, knob: f32) -> f32 {
        (self.mid_drive.interpolate(f64::from(knob)) - self.drive_offset) as f32
    }

    /// Gain of the high band boost stage
    pub fn high_boost(&self, knob: f32) -> f32 {
        let knob = f64::from(knob.max(0.0));
        (1.0 + self.boost_scale * knob.powf(self.boost_exponent)) as f32
    }

    /// Limiter `(threshold, ratio)` for a high-air knob position
    pub fn limiter_settings(&self, knob: f32) -> (f32, f32) {
        let knob = f64::from(knob);
        let threshold = self.limiter_threshold.interpolate(knob) as f32;
        let slope = self.limiter_slope.interpolate(knob) as f32;
        (threshold, self.slope_to_ratio(slope))
    }

    /// Invert `slope = 1 - 1/ratio`
    ///
    /// A slope of 1 or more has no finite ratio and maps to `max_limiter_ratio`.
    /// Slopes just below 1 are not capped and may exceed it.
    pub fn slope_to_ratio(&self, slope: f32) -> f32 {
        if slope >= 1.0 {
            self.max_limiter_ratio
        } else {
            1.0 / (1.0 - slope)
        }
    }
}

impl Default for AirCurves {
    fn default() -> Self {
        Self::build_factory()
    }
}
