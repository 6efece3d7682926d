/// Stereo processor trait
///
/// Every stage of the air chain, from a single dynamics kernel up to the full
/// processor, consumes planar stereo blocks through this trait.
use air_core::Result;

/// Trait for planar stereo processors
///
/// # Safety
/// - Must NOT allocate memory in `process()` for blocks within the size the
///   processor was built for (real-time constraint)
/// - Must be Send so a stream can be handed to an audio thread
pub trait StereoProcessor: Send {
    /// Process one block in place
    ///
    /// # Arguments
    /// * `left` - Left channel samples, overwritten with the output
    /// * `right` - Right channel samples, overwritten with the output
    ///
    /// # Errors
    /// Fails with `AirError::ChannelLengthMismatch` before any sample or
    /// state is modified when the two channels differ in length.
    ///
    /// # Real-Time Constraints
    /// - No allocations
    /// - No blocking operations
    /// - Deterministic execution time
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()>;

    /// Get processor name (for debugging)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_core::check_stereo_block;

    // Mock processor for testing
    struct Gain {
        gain: f32,
    }

    impl StereoProcessor for Gain {
        fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
            check_stereo_block(left, right)?;
            for sample in left.iter_mut().chain(right.iter_mut()) {
                *sample *= self.gain;
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "Gain"
        }
    }

    #[test]
    fn boxed_processors_run_in_order() {
        let mut stages: Vec<Box<dyn StereoProcessor>> =
            vec![Box::new(Gain { gain: 0.5 }), Box::new(Gain { gain: 4.0 })];

        let mut left = vec![1.0; 16];
        let mut right = vec![-1.0; 16];
        for stage in &mut stages {
            stage.process(&mut left, &mut right).unwrap();
        }

        assert!(left.iter().all(|&s| (s - 2.0).abs() < 1e-6));
        assert!(right.iter().all(|&s| (s + 2.0).abs() < 1e-6));
        assert_eq!(stages[0].name(), "Gain");
    }
}
