/// Zero-delay-feedback state-variable filter
///
/// A two-pole, topology-preserving SVF with trapezoidal integrators. The
/// feedback loop is solved in closed form every sample instead of being
/// broken with a unit delay, which keeps the response close to the analog
/// prototype near Nyquist.
///
/// Coefficients and integrator state are kept in `f64`; samples are
/// converted on the way in and out.
use air_core::{check_stereo_block, AirError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::processor::StereoProcessor;

/// Feedback denominators smaller than this disable the feedback term
const MIN_DENOMINATOR: f64 = 1e-20;

/// Design parameters P0..P4, the input of the design step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZdfDesign(pub [f64; 5]);

/// Runtime coefficients C0..C4
///
/// `output = band_mix * bp + low_mix * lp + high_mix * hp`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZdfCoefficients {
    /// C0: integrator gain, `tan(pi * fc / fs)` for a classic design
    pub g: f64,
    /// C1: damping; the loop feeds back `2 * damping * bp`
    pub damping: f64,
    /// C2: high-pass weight
    pub high_mix: f64,
    /// C3: band-pass weight
    pub band_mix: f64,
    /// C4: low-pass weight
    pub low_mix: f64,
}

impl ZdfCoefficients {
    /// Coefficients that silence the output
    pub const SILENT: Self = Self {
        g: 1.0,
        damping: 0.0,
        high_mix: 0.0,
        band_mix: 0.0,
        low_mix: 0.0,
    };

    /// Build from `[C0, C1, C2, C3, C4]`
    pub fn from_array(c: [f64; 5]) -> Self {
        Self {
            g: c[0],
            damping: c[1],
            high_mix: c[2],
            band_mix: c[3],
            low_mix: c[4],
        }
    }

    /// `[C0, C1, C2, C3, C4]`
    pub fn to_array(self) -> [f64; 5] {
        [self.g, self.damping, self.high_mix, self.band_mix, self.low_mix]
    }

    /// Solve the design parameters for runtime coefficients
    ///
    /// Two auxiliary roots come from `-1 - P3 - P4` and `P3 - 1 - P4`. A
    /// non-positive argument gives a purely imaginary root `i*sqrt(-x)`,
    /// otherwise a purely real one `sqrt(x)`. Then:
    ///
    /// ```text
    /// C0 = |root1 / root2|
    /// C1 = (P4 - 1) / Re(root1 * root2)
    /// C2 = (P0 - P1 + P2) / (1 - P3 + P4)
    /// C3 = -2 (P0 - P2) / Re(root1 * root2)
    /// C4 = (P0 + P1 + P2) / (1 + P3 + P4)
    /// ```
    ///
    /// Fails when `root2`, `Re(root1 * root2)` or either normalising sum is
    /// zero, since the closed form has no finite answer there.
    pub fn from_design(design: ZdfDesign) -> Result<Self> {
        let [p0, p1, p2, p3, p4] = design.0;
        if design.0.iter().any(|p| !p.is_finite()) {
            return Err(AirError::degenerate_design(format!(
                "non-finite design parameters {:?}",
                design.0
            )));
        }

        let root1 = Root::sqrt_of(-1.0 - p3 - p4);
        let root2 = Root::sqrt_of(p3 - 1.0 - p4);

        if root2.is_zero() {
            return Err(AirError::degenerate_design("second root vanished"));
        }
        let product = root1.product_re(root2);
        if product == 0.0 {
            return Err(AirError::degenerate_design(
                "root product has no real part",
            ));
        }

        let high_sum = 1.0 - p3 + p4;
        let low_sum = 1.0 + p3 + p4;
        if high_sum == 0.0 || low_sum == 0.0 {
            return Err(AirError::degenerate_design("normalising sum is zero"));
        }

        let inv_product = 1.0 / product;
        Ok(Self {
            g: root1.ratio_magnitude(root2),
            damping: (p4 - 1.0) * inv_product,
            high_mix: (p0 - p1 + p2) / high_sum,
            band_mix: (p0 - p2) * -2.0 * inv_product,
            low_mix: (p0 + p1 + p2) / low_sum,
        })
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("filter g", self.g),
            ("filter damping", self.damping),
            ("filter high mix", self.high_mix),
            ("filter band mix", self.band_mix),
            ("filter low mix", self.low_mix),
        ] {
            if !value.is_finite() {
                return Err(AirError::invalid_parameter(name, value));
            }
        }
        Ok(())
    }

    /// Feedback denominator `1 + 2 * damping * g + g^2`
    fn denominator(&self) -> f64 {
        (2.0 * self.damping + self.g) * self.g + 1.0
    }

    fn offset(self, delta: &[f64; 5]) -> Self {
        let c = self.to_array();
        Self::from_array([
            c[0] + delta[0],
            c[1] + delta[1],
            c[2] + delta[2],
            c[3] + delta[3],
            c[4] + delta[4],
        ])
    }
}

impl Default for ZdfCoefficients {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Purely real or purely imaginary square root
#[derive(Debug, Clone, Copy)]
struct Root {
    re: f64,
    im: f64,
}

impl Root {
    fn sqrt_of(x: f64) -> Self {
        if x <= 0.0 {
            Self {
                re: 0.0,
                im: (-x).sqrt(),
            }
        } else {
            Self {
                re: x.sqrt(),
                im: 0.0,
            }
        }
    }

    fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    fn product_re(self, other: Self) -> f64 {
        self.re * other.re - self.im * other.im
    }

    /// `|self / other|`, dividing through by the larger component of `other`
    fn ratio_magnitude(self, other: Self) -> f64 {
        let (re, im) = if other.re.abs() <= other.im.abs() {
            let s = other.re / other.im;
            let den = other.re * s + other.im;
            ((self.re * s + self.im) / den, (self.im * s - self.re) / den)
        } else {
            let s = other.im / other.re;
            let den = other.re + other.im * s;
            ((self.re + self.im * s) / den, (self.im - self.re * s) / den)
        };
        re.hypot(im)
    }
}

/// Integrator state, index 0 = left, 1 = right
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterState {
    /// Band-pass integrator (s0)
    pub band: [f64; 2],
    /// Low-pass integrator (s2)
    pub low: [f64; 2],
}

/// Terms that only depend on the coefficients
#[derive(Debug, Clone, Copy)]
struct Kernel {
    g: f64,
    two_g: f64,
    two_damping: f64,
    mix: f64,
    inv_den: f64,
    high: f64,
    band: f64,
    low: f64,
}

impl Kernel {
    fn new(c: &ZdfCoefficients) -> Self {
        let mix = 2.0 * c.damping + c.g;
        let den = mix * c.g + 1.0;
        Self {
            g: c.g,
            two_g: 2.0 * c.g,
            two_damping: 2.0 * c.damping,
            mix,
            inv_den: if den.abs() < MIN_DENOMINATOR {
                0.0
            } else {
                1.0 / den
            },
            high: c.high_mix,
            band: c.band_mix,
            low: c.low_mix,
        }
    }

    /// One sample of one channel
    ///
    /// The loop is `hp = x - 2R*bp - lp` with `bp = g*hp + s0` and
    /// `lp = g*bp + s2`. It is linear in `hp`, so substituting gives
    /// `hp = (x - (2R + g)*s0 - s2) / (1 + 2R*g + g^2)`. Below, `u = g*x + s0`
    /// folds the input term into the same expression.
    #[inline]
    fn tick(&self, x: f64, s0: &mut f64, s2: &mut f64) -> f64 {
        let u = x * self.g + *s0;
        let hp = x - (self.mix * u + *s2) * self.inv_den;
        let lp = (u - *s2 * self.g) * self.inv_den * self.g + *s2;
        let bp = hp * self.g + *s0;

        let out = self.band * bp + self.low * lp + self.high * hp;

        // Trapezoidal integrator updates, after every read of s0/s2
        *s0 += ((x - self.two_damping * bp) - lp) * self.two_g;
        *s2 += bp * self.two_g;

        out
    }
}

/// Linear per-sample coefficient movement toward a target
#[derive(Debug, Clone, Copy)]
struct Glide {
    target: ZdfCoefficients,
    delta: [f64; 5],
    remaining: usize,
}

/// Stereo zero-delay-feedback filter
pub struct ZdfFilter {
    coeffs: ZdfCoefficients,
    glide: Option<Glide>,
    state: FilterState,
}

impl ZdfFilter {
    /// Create a filter running the given coefficients
    pub fn new(coeffs: ZdfCoefficients) -> Result<Self> {
        let mut filter = Self {
            coeffs: ZdfCoefficients::SILENT,
            glide: None,
            state: FilterState::default(),
        };
        filter.set_coefficients(coeffs)?;
        Ok(filter)
    }

    /// Create a filter from design parameters
    pub fn from_design(design: ZdfDesign) -> Result<Self> {
        Self::new(ZdfCoefficients::from_design(design)?)
    }

    /// Replace coefficients immediately, keeping integrator state
    pub fn set_coefficients(&mut self, coeffs: ZdfCoefficients) -> Result<()> {
        coeffs.validate()?;
        if coeffs.denominator().abs() < MIN_DENOMINATOR {
            warn!(?coeffs, "feedback denominator vanishes; feedback path disabled");
        }
        self.coeffs = coeffs;
        self.glide = None;
        Ok(())
    }

    /// Move coefficients linearly to `target` over the next `samples` samples
    ///
    /// Integrator state is untouched. A glide of zero samples is an immediate
    /// `set_coefficients`.
    pub fn glide_to(&mut self, target: ZdfCoefficients, samples: usize) -> Result<()> {
        if samples == 0 {
            return self.set_coefficients(target);
        }
        target.validate()?;

        let from = self.coeffs.to_array();
        let to = target.to_array();
        let n = samples as f64;
        self.glide = Some(Glide {
            target,
            delta: std::array::from_fn(|i| (to[i] - from[i]) / n),
            remaining: samples,
        });
        Ok(())
    }

    /// Coefficients in effect for the next sample
    pub fn coefficients(&self) -> ZdfCoefficients {
        self.coeffs
    }

    /// True while a glide is in progress
    pub fn is_gliding(&self) -> bool {
        self.glide.is_some()
    }

    /// Snapshot of the integrator state
    pub fn state(&self) -> FilterState {
        self.state
    }

    fn advance_glide(&mut self) {
        let Some(glide) = self.glide.as_mut() else {
            return;
        };

        glide.remaining -= 1;
        if glide.remaining > 0 {
            self.coeffs = self.coeffs.offset(&glide.delta);
            return;
        }

        // Snap to avoid accumulated rounding
        self.coeffs = glide.target;
        self.glide = None;
    }

    fn process_static(&mut self, left: &mut [f32], right: &mut [f32]) {
        let kernel = Kernel::new(&self.coeffs);
        let mut state = self.state;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l = kernel.tick(f64::from(*l), &mut state.band[0], &mut state.low[0]) as f32;
            *r = kernel.tick(f64::from(*r), &mut state.band[1], &mut state.low[1]) as f32;
        }

        self.state = state;
    }

    fn process_gliding(&mut self, left: &mut [f32], right: &mut [f32]) {
        let mut state = self.state;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let kernel = Kernel::new(&self.coeffs);
            *l = kernel.tick(f64::from(*l), &mut state.band[0], &mut state.low[0]) as f32;
            *r = kernel.tick(f64::from(*r), &mut state.band[1], &mut state.low[1]) as f32;
            self.advance_glide();
        }

        self.state = state;
    }
}

impl Default for ZdfFilter {
    fn default() -> Self {
        Self {
            coeffs: ZdfCoefficients::SILENT,
            glide: None,
            state: FilterState::default(),
        }
    }
}

impl StereoProcessor for ZdfFilter {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        if check_stereo_block(left, right)? == 0 {
            return Ok(());
        }

        if self.glide.is_some() {
            self.process_gliding(left, right);
        } else {
            self.process_static(left, right);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ZDF Filter"
    }
}
