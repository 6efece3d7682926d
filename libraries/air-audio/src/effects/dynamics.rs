/// Shared dynamics kernel
///
/// One envelope follower, one static gain computer and one gain smoother.
/// The air chain runs three of these with different configuration: an RMS
/// expander on the mid band, a pass-through gate and a peak limiter on the
/// high band.
use air_core::{check_stereo_block, linear_to_db, AirError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::processor::StereoProcessor;

/// Floor applied to detector power and levels before division (2^-20)
pub(crate) const DETECTOR_FLOOR: f32 = 9.536_743e-7;

/// RMS averaging window
const RMS_WINDOW_SECS: f32 = 0.050;

/// Gain smoothing time, applied after the gain computer
const GAIN_SMOOTHING_SECS: f32 = 0.005;

/// Default envelope attack
pub const DEFAULT_ATTACK_SECS: f32 = 0.002;

/// Default envelope release
pub const DEFAULT_RELEASE_SECS: f32 = 0.100;

/// Expander threshold used by the mid band (about -30 dBFS)
pub const EXPANDER_THRESHOLD: f32 = 0.0316;

/// Expander ratio used by the mid band
pub const EXPANDER_RATIO: f32 = 2.0;

/// Level detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorMode {
    /// Mean power of both channels, averaged over a fixed 50 ms window
    Rms,
    /// Louder channel's absolute value with attack/release ballistics
    Peak,
}

/// Dynamics unit configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Level detector
    pub detector: DetectorMode,

    /// Threshold as linear amplitude (1.0 = 0 dBFS)
    pub threshold: f32,

    /// Ratio; values at or below 1.0 disable gain reduction
    pub ratio: f32,

    /// Envelope attack in seconds (0 = instant), peak detector only
    pub attack_secs: f32,

    /// Envelope release in seconds (0 = instant), peak detector only
    pub release_secs: f32,
}

impl DynamicsConfig {
    /// Low-threshold RMS expander used on the mid band
    pub fn expander(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            detector: DetectorMode::Rms,
            threshold: EXPANDER_THRESHOLD,
            ratio: EXPANDER_RATIO,
            attack_secs: DEFAULT_ATTACK_SECS,
            release_secs: DEFAULT_RELEASE_SECS,
        }
    }

    /// Static gate that never reduces gain
    ///
    /// The ratio of 1.0 gives a zero slope, so the gain computer returns
    /// exactly 1.0 for every envelope and the stage is an identity.
    pub fn pass_through_gate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            detector: DetectorMode::Peak,
            threshold: DETECTOR_FLOOR,
            ratio: 1.0,
            attack_secs: DEFAULT_ATTACK_SECS,
            release_secs: DEFAULT_RELEASE_SECS,
        }
    }

    /// Peak limiter with the given threshold and ratio
    pub fn limiter(sample_rate: u32, threshold: f32, ratio: f32) -> Self {
        Self {
            sample_rate,
            detector: DetectorMode::Peak,
            threshold,
            ratio,
            attack_secs: DEFAULT_ATTACK_SECS,
            release_secs: DEFAULT_RELEASE_SECS,
        }
    }

    /// Reject configuration no processor can honour
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AirError::InvalidSampleRate(self.sample_rate));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(AirError::InvalidThreshold(self.threshold));
        }
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(AirError::InvalidRatio(self.ratio));
        }
        for (name, value) in [("attack", self.attack_secs), ("release", self.release_secs)] {
            if !value.is_finite() || value < 0.0 {
                return Err(AirError::InvalidTimeConstant { name, value });
            }
        }
        Ok(())
    }

    /// Gain computer slope: `1 - 1/ratio`, or 0 when the ratio is 1 or less
    pub fn slope(&self) -> f32 {
        if self.ratio > 1.0 {
            1.0 - 1.0 / self.ratio
        } else {
            0.0
        }
    }
}

/// One-pole smoothing coefficient for a time constant
///
/// `1 - exp(-1 / (time * sample_rate))`; zero or negative times are instant.
#[inline]
pub fn one_pole_coeff(time_secs: f32, sample_rate: u32) -> f32 {
    if time_secs <= 0.0 {
        return 1.0;
    }
    1.0 - (-1.0 / (time_secs * sample_rate as f32)).exp()
}

/// Static gain computer in linear amplitude
///
/// Returns exactly 1.0 at or below the threshold, otherwise
/// `(threshold / envelope) ^ slope`. This is the dB-domain curve
/// `threshold + (level - threshold) / ratio` expressed as a linear gain.
#[inline]
pub fn target_gain(threshold: f32, slope: f32, envelope: f32) -> f32 {
    if envelope <= threshold {
        return 1.0;
    }
    (threshold / envelope.max(DETECTOR_FLOOR)).powf(slope)
}

/// Persistent per-instance state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsState {
    /// Peak level (peak detector) or smoothed power (RMS detector), always >= 0
    pub envelope: f32,
    /// Gain applied to the last sample
    pub smoothed_gain: f32,
}

impl Default for DynamicsState {
    fn default() -> Self {
        Self {
            envelope: 0.0,
            smoothed_gain: 1.0,
        }
    }
}

/// Coefficients derived from the configuration, refreshed between blocks
#[derive(Debug, Clone, Copy, Default)]
struct BlockCoefficients {
    attack: f32,
    release: f32,
    rms: f32,
    gain_smoothing: f32,
    slope: f32,
}

/// Envelope follower, gain computer and gain ballistics
pub struct DynamicsUnit {
    config: DynamicsConfig,
    state: DynamicsState,
    coeffs: BlockCoefficients,
    needs_update: bool,
}

impl DynamicsUnit {
    /// Create a unit from a validated configuration
    pub fn new(config: DynamicsConfig) -> Result<Self> {
        config.validate()?;
        let mut unit = Self {
            config,
            state: DynamicsState::default(),
            coeffs: BlockCoefficients::default(),
            needs_update: true,
        };
        unit.update_coefficients();
        Ok(unit)
    }

    /// Replace the configuration, keeping envelope and gain state
    pub fn set_config(&mut self, config: DynamicsConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.needs_update = true;
        }
        Ok(())
    }

    /// Set threshold (linear amplitude)
    pub fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        self.set_config(DynamicsConfig {
            threshold,
            ..self.config
        })
    }

    /// Set ratio
    pub fn set_ratio(&mut self, ratio: f32) -> Result<()> {
        self.set_config(DynamicsConfig {
            ratio,
            ..self.config
        })
    }

    /// Current configuration
    pub fn config(&self) -> DynamicsConfig {
        self.config
    }

    /// Snapshot of the persistent state
    pub fn state(&self) -> DynamicsState {
        self.state
    }

    /// Gain applied to the most recent sample
    pub fn current_gain(&self) -> f32 {
        self.state.smoothed_gain
    }

    /// Gain reduction of the most recent sample in dB (0 or negative when compressing)
    pub fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.state.smoothed_gain)
    }

    fn update_coefficients(&mut self) {
        if !self.needs_update {
            return;
        }

        let sr = self.config.sample_rate;
        self.coeffs = BlockCoefficients {
            attack: one_pole_coeff(self.config.attack_secs, sr),
            release: one_pole_coeff(self.config.release_secs, sr),
            rms: one_pole_coeff(RMS_WINDOW_SECS, sr),
            gain_smoothing: one_pole_coeff(GAIN_SMOOTHING_SECS, sr),
            slope: self.config.slope(),
        };
        trace!(
            detector = ?self.config.detector,
            threshold = self.config.threshold,
            slope = self.coeffs.slope,
            "dynamics coefficients updated"
        );

        self.needs_update = false;
    }

    /// RMS detector: floored mean power, one-pole averaged, square-rooted
    #[inline]
    fn detect_rms(envelope: &mut f32, coeffs: &BlockCoefficients, left: f32, right: f32) -> f32 {
        let power = ((left * left + right * right) * 0.5).max(DETECTOR_FLOOR);
        *envelope += (power - *envelope) * coeffs.rms;
        envelope.max(0.0).sqrt()
    }

    /// Peak detector: attack coefficient when rising, release when falling
    #[inline]
    fn detect_peak(envelope: &mut f32, coeffs: &BlockCoefficients, left: f32, right: f32) -> f32 {
        let level = left.abs().max(right.abs());
        let coeff = if level > *envelope {
            coeffs.attack
        } else {
            coeffs.release
        };
        *envelope += (level - *envelope) * coeff;
        *envelope
    }

    /// Sample loop, monomorphised per detector so the mode is not re-checked per sample
    #[inline]
    fn run<D>(&mut self, left: &mut [f32], right: &mut [f32], detect: D)
    where
        D: Fn(&mut f32, &BlockCoefficients, f32, f32) -> f32,
    {
        let coeffs = self.coeffs;
        let threshold = self.config.threshold;
        let mut state = self.state;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let envelope = detect(&mut state.envelope, &coeffs, *l, *r);
            let target = target_gain(threshold, coeffs.slope, envelope);

            state.smoothed_gain += (target - state.smoothed_gain) * coeffs.gain_smoothing;

            *l *= state.smoothed_gain;
            *r *= state.smoothed_gain;
        }

        self.state = state;
    }
}

impl StereoProcessor for DynamicsUnit {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        if check_stereo_block(left, right)? == 0 {
            return Ok(());
        }

        self.update_coefficients();

        match self.config.detector {
            DetectorMode::Rms => self.run(left, right, Self::detect_rms),
            DetectorMode::Peak => self.run(left, right, Self::detect_peak),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Dynamics Unit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    fn peak_unit(threshold: f32, ratio: f32) -> DynamicsUnit {
        DynamicsUnit::new(DynamicsConfig::limiter(SR, threshold, ratio)).unwrap()
    }

    #[test]
    fn validation_rejects_bad_config() {
        let base = DynamicsConfig::expander(SR);
        assert!(base.validate().is_ok());

        let cases = [
            DynamicsConfig { sample_rate: 0, ..base },
            DynamicsConfig { threshold: 0.0, ..base },
            DynamicsConfig { threshold: f32::NAN, ..base },
            DynamicsConfig { ratio: 0.0, ..base },
            DynamicsConfig { ratio: -2.0, ..base },
            DynamicsConfig { attack_secs: -0.001, ..base },
            DynamicsConfig { release_secs: f32::INFINITY, ..base },
        ];
        for config in cases {
            assert!(DynamicsUnit::new(config).is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn coefficient_from_time_constant() {
        assert_eq!(one_pole_coeff(0.0, SR), 1.0);
        assert_eq!(one_pole_coeff(-1.0, SR), 1.0);

        let expected = 1.0 - (-1.0f32 / (0.005 * 44100.0)).exp();
        assert!((one_pole_coeff(0.005, SR) - expected).abs() < 1e-9);
        assert!(one_pole_coeff(0.1, SR) < one_pole_coeff(0.002, SR));
    }

    #[test]
    fn slope_from_ratio() {
        let mut config = DynamicsConfig::expander(SR);
        config.ratio = 4.0;
        assert!((config.slope() - 0.75).abs() < 1e-7);
        config.ratio = 1.0;
        assert_eq!(config.slope(), 0.0);
        config.ratio = 0.5;
        assert_eq!(config.slope(), 0.0);
    }

    #[test]
    fn gain_computer_identity_below_threshold() {
        assert_eq!(target_gain(0.5, 0.75, 0.0), 1.0);
        assert_eq!(target_gain(0.5, 0.75, 0.25), 1.0);
        assert_eq!(target_gain(0.5, 0.75, 0.5), 1.0);
    }

    #[test]
    fn gain_computer_above_threshold() {
        // 6 dB over a 2:1 threshold gives 3 dB of reduction
        let gain = target_gain(0.5, 0.5, 1.0);
        assert!((gain - 0.5f32.sqrt()).abs() < 1e-6);
        assert!((linear_to_db(gain) - (-3.0103)).abs() < 1e-3);
    }

    #[test]
    fn peak_envelope_rises_then_falls_monotonically() {
        let mut unit = peak_unit(1.0, 4.0);

        let mut previous = unit.state().envelope;
        for _ in 0..40 {
            let mut left = [0.8; 16];
            let mut right = [0.8; 16];
            unit.process(&mut left, &mut right).unwrap();
            let envelope = unit.state().envelope;
            assert!(envelope >= previous, "attack not monotonic");
            assert!(envelope <= 0.8 + 1e-6);
            previous = envelope;
        }
        assert!(previous > 0.79, "attack did not converge: {}", previous);

        for _ in 0..200 {
            let mut left = [0.1; 64];
            let mut right = [0.1; 64];
            unit.process(&mut left, &mut right).unwrap();
            let envelope = unit.state().envelope;
            assert!(envelope <= previous, "release not monotonic");
            assert!(envelope >= 0.1 - 1e-6);
            previous = envelope;
        }
        assert!(previous < 0.2);
    }

    #[test]
    fn release_is_slower_than_attack() {
        let mut rising = peak_unit(1.0, 4.0);
        let mut left = [1.0; 32];
        let mut right = [1.0; 32];
        rising.process(&mut left, &mut right).unwrap();
        let attacked = rising.state().envelope;

        let mut falling = peak_unit(1.0, 4.0);
        falling.state.envelope = 1.0;
        let mut left = [0.0; 32];
        let mut right = [0.0; 32];
        falling.process(&mut left, &mut right).unwrap();
        let released = 1.0 - falling.state().envelope;

        assert!(attacked > released, "attack {} vs release {}", attacked, released);
    }

    #[test]
    fn rms_detector_tracks_power() {
        let mut unit = DynamicsUnit::new(DynamicsConfig::expander(SR)).unwrap();
        let mut left = vec![0.5; SR as usize];
        let mut right = vec![-0.5; SR as usize];
        unit.process(&mut left, &mut right).unwrap();

        // Power of a constant +/-0.5 signal is 0.25
        assert!((unit.state().envelope - 0.25).abs() < 1e-3);
    }

    #[test]
    fn rms_detector_floors_silence() {
        let mut unit = DynamicsUnit::new(DynamicsConfig::expander(SR)).unwrap();
        let mut left = vec![0.0; SR as usize];
        let mut right = vec![0.0; SR as usize];
        unit.process(&mut left, &mut right).unwrap();

        assert!(unit.state().envelope > 0.0);
        assert!((unit.state().envelope - DETECTOR_FLOOR).abs() < 1e-7);
    }

    #[test]
    fn limiter_settles_to_static_curve() {
        let mut unit = peak_unit(0.25, 4.0);
        let mut left = vec![1.0; SR as usize];
        let mut right = vec![1.0; SR as usize];
        unit.process(&mut left, &mut right).unwrap();

        let expected = 0.25f32.powf(0.75);
        assert!((unit.current_gain() - expected).abs() < 1e-4);
        assert!((left[left.len() - 1] - expected).abs() < 1e-4);
        assert!(unit.gain_reduction_db() < 0.0);
    }

    #[test]
    fn pass_through_gate_is_identity() {
        let mut gate = DynamicsUnit::new(DynamicsConfig::pass_through_gate(SR)).unwrap();
        let input: Vec<f32> = (0..512).map(|i| ((i as f32) * 0.37).sin() * 0.9).collect();
        let mut left = input.clone();
        let mut right: Vec<f32> = input.iter().map(|s| -s).collect();

        gate.process(&mut left, &mut right).unwrap();

        assert_eq!(left, input);
        assert_eq!(gate.current_gain(), 1.0);
    }

    #[test]
    fn mismatched_block_leaves_state_untouched() {
        let mut unit = peak_unit(0.25, 4.0);
        let mut left = [0.9; 8];
        let mut right = [0.9; 8];
        unit.process(&mut left, &mut right).unwrap();
        let before = unit.state();

        let mut left = [0.9; 8];
        let mut right = [0.9; 7];
        let err = unit.process(&mut left, &mut right).unwrap_err();

        assert_eq!(err, AirError::ChannelLengthMismatch { left: 8, right: 7 });
        assert_eq!(unit.state(), before);
        assert_eq!(left, [0.9; 8]);
    }

    #[test]
    fn reconfigure_keeps_state() {
        let mut unit = peak_unit(0.25, 4.0);
        let mut left = [0.9; 64];
        let mut right = [0.9; 64];
        unit.process(&mut left, &mut right).unwrap();
        let before = unit.state();

        unit.set_threshold(0.1).unwrap();
        unit.set_ratio(8.0).unwrap();

        assert_eq!(unit.state(), before);
        assert_eq!(unit.config().threshold, 0.1);
        assert!(unit.set_ratio(0.0).is_err());
        assert_eq!(unit.config().ratio, 8.0);
    }

    #[test]
    fn empty_block_is_noop() {
        let mut unit = peak_unit(0.25, 4.0);
        unit.process(&mut [], &mut []).unwrap();
        assert_eq!(unit.state(), DynamicsState::default());
    }
}
