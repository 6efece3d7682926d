//! Knob-to-parameter curves
//!
//! A `CurveTable` is a sorted list of `(knob, value)` breakpoints. Lookups
//! interpolate linearly between neighbours and clamp to the end points outside
//! the table, so any knob position maps to a finite value.
//!
//! Tables are plain data: where they come from (factory constants, JSON,
//! a host preset) is the owner's business.

use serde::{Deserialize, Serialize};

use crate::error::{AirError, Result};

/// Sorted, validated piecewise-linear curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct CurveTable {
    points: Vec<(f64, f64)>,
}

impl CurveTable {
    /// Build a curve from `(knob, value)` breakpoints
    ///
    /// Knobs must be strictly increasing and every coordinate finite.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(AirError::invalid_curve("table has no breakpoints"));
        }

        if let Some((knob, value)) = points
            .iter()
            .find(|(k, v)| !k.is_finite() || !v.is_finite())
        {
            return Err(AirError::invalid_curve(format!(
                "non-finite breakpoint ({knob}, {value})"
            )));
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(AirError::invalid_curve(format!(
                "knobs not strictly increasing at {} -> {}",
                pair[0].0, pair[1].0
            )));
        }

        Ok(Self { points })
    }

    /// Interpolated value at `knob`, clamped to the first/last breakpoint
    pub fn interpolate(&self, knob: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        // NaN knobs fall through to the first breakpoint
        if knob.is_nan() || knob <= first.0 {
            return first.1;
        }
        if knob >= last.0 {
            return last.1;
        }

        // First breakpoint strictly above the knob; guaranteed in 1..len
        let upper = self.points.partition_point(|&(k, _)| k <= knob);
        let (k1, v1) = self.points[upper - 1];
        let (k2, v2) = self.points[upper];

        let t = (knob - k1) / (k2 - k1);
        v1 + t * (v2 - v1)
    }

    /// Breakpoints in ascending knob order
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Smallest and largest value reachable through `interpolate`
    pub fn value_range(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| {
                (lo.min(v), hi.max(v))
            })
    }
}

impl TryFrom<Vec<(f64, f64)>> for CurveTable {
    type Error = AirError;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<CurveTable> for Vec<(f64, f64)> {
    fn from(curve: CurveTable) -> Self {
        curve.points
    }
}
