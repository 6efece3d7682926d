//! Core error types for Harmonic Air
use thiserror::Error;

/// Result type alias using `AirError`
pub type Result<T> = std::result::Result<T, AirError>;

/// Error type shared by every Harmonic Air crate
///
/// All variants describe a caller contract violation: mismatched buffers or
/// configuration that no processor can honour. Numerical edge cases inside the
/// per-sample kernels are handled by flooring and never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AirError {
    /// Left and right buffers of one block differ in length
    #[error("Channel length mismatch: left has {left} samples, right has {right}")]
    ChannelLengthMismatch { left: usize, right: usize },

    /// Sample rate of zero
    #[error("Invalid sample rate: {0} Hz (must be greater than 0)")]
    InvalidSampleRate(u32),

    /// Threshold that is not a positive finite linear amplitude
    #[error("Invalid threshold: {0} (must be a positive linear amplitude)")]
    InvalidThreshold(f32),

    /// Ratio that is not positive and finite
    #[error("Invalid ratio: {0} (must be greater than 0)")]
    InvalidRatio(f32),

    /// Attack/release/averaging time that is negative or not finite
    #[error("Invalid {name} time: {value} s (must be >= 0)")]
    InvalidTimeConstant { name: &'static str, value: f32 },

    /// Knob, gain or coefficient outside its accepted range
    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Curve table that cannot be interpolated
    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    /// Filter design data whose closed-form solution divides by zero
    #[error("Degenerate filter design: {0}")]
    DegenerateDesign(String),
}

impl AirError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: &'static str, value: impl Into<f64>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// Create an invalid curve error
    pub fn invalid_curve(msg: impl Into<String>) -> Self {
        Self::InvalidCurve(msg.into())
    }

    /// Create a degenerate design error
    pub fn degenerate_design(msg: impl Into<String>) -> Self {
        Self::DegenerateDesign(msg.into())
    }
}
