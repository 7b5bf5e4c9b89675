//! Feature mask produced by a labeler, with point queries and refinements.

use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use super::FeatureResult;
use crate::error::{LabelError, Result};
use crate::filters::morphology::{close_u8, dilate_u8, ellipse_element};
use crate::filters::noise::median_u8;
use crate::selection::{dbscan, flood_fill_region, FillResult};

/// Owned single-channel feature mask.
///
/// Refinements ([`denoise`](Self::denoise),
/// [`mask_reconstruction`](Self::mask_reconstruction)) rewrite the mask in
/// place and return `&mut Self` so they can be chained. Use
/// [`copy`](Self::copy) to keep an untouched version around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PstResult {
    mask: Array2<u8>,
}

impl PstResult {
    /// Neighborhood radius used by [`denoise`](Self::denoise).
    pub const DEFAULT_EPS_PX: f32 = 2.0;
    /// Core-point neighborhood size used by [`denoise`](Self::denoise).
    pub const DEFAULT_MIN_PTS: usize = 4;
    pub const DEFAULT_CLOSING_SIZE: usize = 15;
    pub const DEFAULT_MEDIAN_SIZE: usize = 7;

    pub fn new(mask: Array2<u8>) -> Self {
        Self { mask }
    }

    /// Snapshot of the current mask.
    pub fn edges(&self) -> Array2<u8> {
        self.mask.clone()
    }

    /// Borrowed view of the current mask.
    pub fn mask(&self) -> ArrayView2<'_, u8> {
        self.mask.view()
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn into_mask(self) -> Array2<u8> {
        self.mask
    }

    /// Connected region under column `x`, row `y` as a 0/255 mask.
    pub fn extract_at(&self, x: usize, y: usize) -> Array2<u8> {
        self.extract_region_at(x, y).mask
    }

    /// Like [`extract_at`](Self::extract_at), with bounds and pixel count.
    pub fn extract_region_at(&self, x: usize, y: usize) -> FillResult {
        flood_fill_region(self.mask.view(), x, y)
    }

    /// Drop noise and clusters smaller than `thresh_px` pixels.
    pub fn denoise(&mut self, thresh_px: usize) -> &mut Self {
        self.denoise_with(thresh_px, Self::DEFAULT_EPS_PX, Self::DEFAULT_MIN_PTS)
    }

    /// Density-based speck removal.
    ///
    /// Foreground pixels are clustered with DBSCAN (`eps_px`, `min_pts`).
    /// Pixels of clusters with at least `thresh_px` members keep their value,
    /// everything else is cleared.
    pub fn denoise_with(&mut self, thresh_px: usize, eps_px: f32, min_pts: usize) -> &mut Self {
        let clustering = dbscan(self.mask.view(), eps_px, min_pts);
        let sizes = clustering.cluster_sizes();

        let mut kept = Array2::<u8>::zeros(self.mask.dim());
        for (&(y, x), label) in clustering.points.iter().zip(clustering.labels.iter()) {
            if let Some(cluster) = *label {
                if sizes[cluster] >= thresh_px {
                    kept[[y, x]] = self.mask[[y, x]];
                }
            }
        }

        debug!(
            points = clustering.points.len(),
            clusters = clustering.n_clusters,
            kept = sizes.iter().filter(|&&n| n >= thresh_px).count(),
            "denoise"
        );
        self.mask = kept;
        self
    }

    /// Close, thicken and smooth with the default sizes (15 and 7).
    pub fn mask_reconstruction(&mut self) -> &mut Self {
        self.mask_reconstruction_with(Self::DEFAULT_CLOSING_SIZE, Self::DEFAULT_MEDIAN_SIZE)
    }

    /// Restore continuity inside regions.
    ///
    /// # Arguments
    /// * `closing_size` - Diameter of the elliptical closing element
    /// * `median_size` - Window side of the final median pass
    pub fn mask_reconstruction_with(&mut self, closing_size: usize, median_size: usize) -> &mut Self {
        let closed = close_u8(self.mask.view(), ellipse_element(closing_size).view());
        let thick = dilate_u8(closed.view(), ellipse_element(3).view());
        self.mask = median_u8(thick.view(), median_size);
        self
    }

    /// Independent deep copy.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// OR the region under `(x, y)` into `target`.
    ///
    /// # Returns
    /// Number of pixels in the extracted region
    pub fn union_at(&self, target: &mut Array2<u8>, x: usize, y: usize) -> Result<usize> {
        self.compose_at(target, x, y, |t, r| t | r)
    }

    /// Logical XOR of the region under `(x, y)` into `target`, so a second
    /// click removes it. Touched pixels come out as 0 or 255.
    pub fn toggle_at(&self, target: &mut Array2<u8>, x: usize, y: usize) -> Result<usize> {
        self.compose_at(target, x, y, |t, r| if (t > 0) ^ (r > 0) { 255 } else { 0 })
    }

    fn compose_at(
        &self,
        target: &mut Array2<u8>,
        x: usize,
        y: usize,
        op: fn(u8, u8) -> u8,
    ) -> Result<usize> {
        if target.dim() != self.dim() {
            return Err(LabelError::ShapeMismatch(format!(
                "label mask is {:?}, feature mask is {:?}",
                target.dim(),
                self.dim()
            )));
        }

        let region = self.extract_region_at(x, y);
        Zip::from(target)
            .and(&region.mask)
            .for_each(|t, &r| *t = op(*t, r));
        Ok(region.pixel_count)
    }
}

impl From<Array2<u8>> for PstResult {
    fn from(mask: Array2<u8>) -> Self {
        Self::new(mask)
    }
}

impl FeatureResult for PstResult {
    fn extract_at(&self, x: usize, y: usize) -> Array2<u8> {
        PstResult::extract_at(self, x, y)
    }
}
