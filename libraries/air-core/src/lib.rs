//! Harmonic Air Core
//!
//! Platform-agnostic building blocks shared by the Harmonic Air processing
//! crates. Nothing in here touches audio samples one at a time; it is the
//! vocabulary the DSP crate speaks.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Error Handling**: Unified `AirError` and `Result` types
//! - **Curves**: `CurveTable`, piecewise-linear knob-to-value lookup
//! - **Levels**: dB/linear conversion and stereo block validation
//!
//! # Example
//!
//! ```rust
//! use air_core::CurveTable;
//!
//! let curve = CurveTable::new(vec![(0.0, 0.5), (1.0, 1.5)]).unwrap();
//! assert_eq!(curve.interpolate(0.5), 1.0);
//! assert_eq!(curve.interpolate(2.0), 1.5); // clamped
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod curve;
pub mod error;
pub mod level;

pub use curve::CurveTable;
pub use error::{AirError, Result};
pub use level::{check_stereo_block, db_to_linear, linear_to_db};
