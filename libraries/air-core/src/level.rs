//! Level conversion and block validation helpers

use crate::error::{AirError, Result};

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Zero and negative amplitudes map to `f32::NEG_INFINITY`.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Check that a planar stereo block has matching channel lengths
///
/// Returns the block length on success. Processors call this before touching
/// any sample so a mismatched block never produces half-written output.
#[inline]
pub fn check_stereo_block(left: &[f32], right: &[f32]) -> Result<usize> {
    if left.len() == right.len() {
        Ok(left.len())
    } else {
        Err(AirError::ChannelLengthMismatch {
            left: left.len(),
            right: right.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversions() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-7);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((linear_to_db(0.822) - (-1.703)).abs() < 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn stereo_block_check() {
        assert_eq!(check_stereo_block(&[0.0; 8], &[0.0; 8]), Ok(8));
        assert_eq!(check_stereo_block(&[], &[]), Ok(0));
        assert_eq!(
            check_stereo_block(&[0.0; 8], &[0.0; 7]),
            Err(AirError::ChannelLengthMismatch { left: 8, right: 7 })
        );
    }
}
