//! Frequency-domain machinery behind the labeler.
//!
//! - [`Fft2`]: planned separable 2D FFT, serial or row-parallel
//! - [`PstKernel`]: Phase Stretch Transform kernel and phase extraction

pub mod fft;
pub mod kernel;

pub use fft::Fft2;
pub use kernel::{feature_map, PstKernel};
