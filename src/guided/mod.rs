//! Guided labeling: compute a feature mask once, then probe and refine it.
//!
//! A [`FeatureLabeler`] turns a grayscale image into a [`FeatureResult`]; the
//! result answers point queries with the connected region under the point.
//! [`PstLabeler`] / [`PstResult`] are the Phase Stretch Transform flavor.

use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub mod params;
pub mod pst;
pub mod result;

pub use params::PstParameters;
pub use pst::{LabelerOptions, PstLabeler};
pub use result::PstResult;

/// Something that computes a dense feature mask from an image.
pub trait FeatureLabeler {
    type Params;
    type Output: FeatureResult;

    /// Replace the current configuration.
    fn set_params(&mut self, params: Self::Params);

    /// Compute the feature mask of a grayscale `(height, width)` image.
    fn apply(&mut self, image: ArrayView2<u8>) -> Result<Self::Output>;
}

/// A computed feature mask that can be queried point by point.
pub trait FeatureResult {
    /// Connected region containing the pixel at column `x`, row `y`.
    ///
    /// Returns a 0/255 mask of the full image shape; all zero when the point
    /// lies outside the image or on background.
    fn extract_at(&self, x: usize, y: usize) -> Array2<u8>;
}
