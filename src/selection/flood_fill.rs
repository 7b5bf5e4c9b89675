//! Seeded region extraction on a feature mask.
//!
//! Selects the 4-connected set of positive pixels that contains the seed.

use std::collections::VecDeque;

use ndarray::{s, Array2, ArrayView2};

/// Flood fill result with metadata.
#[derive(Debug, Clone)]
pub struct FillResult {
    /// Region mask (255 = selected, 0 = not selected), same shape as the input
    pub mask: Array2<u8>,
    /// Bounds of the selected region
    pub bounds: Option<(usize, usize, usize, usize)>, // (x, y, width, height)
    /// Number of selected pixels
    pub pixel_count: usize,
}

impl FillResult {
    fn empty(height: usize, width: usize) -> Self {
        FillResult {
            mask: Array2::zeros((height, width)),
            bounds: None,
            pixel_count: 0,
        }
    }
}

/// Extract the connected region of `mask` under the seed `(x, y)`.
///
/// The fill runs on a copy padded by one background pixel on every side, so
/// regions touching the image border need no bounds checks and come back
/// unclipped after cropping.
///
/// # Arguments
/// * `mask` - Feature mask (height, width); any nonzero value is foreground
/// * `x` - Seed column
/// * `y` - Seed row
///
/// # Returns
/// All-zero result when the seed is outside the mask or on a zero pixel
pub fn flood_fill_region(mask: ArrayView2<u8>, x: usize, y: usize) -> FillResult {
    let (height, width) = mask.dim();

    if x >= width || y >= height || mask[[y, x]] == 0 {
        return FillResult::empty(height, width);
    }

    let mut padded = Array2::<u8>::zeros((height + 2, width + 2));
    padded
        .slice_mut(s![1..height + 1, 1..width + 1])
        .assign(&mask.mapv(|v| u8::from(v > 0)));

    // 1 = unvisited foreground, 2 = filled
    let mut queue = VecDeque::new();
    padded[[y + 1, x + 1]] = 2;
    queue.push_back((y + 1, x + 1));

    let mut pixel_count = 0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (width, height, 0, 0);

    while let Some((py, px)) = queue.pop_front() {
        pixel_count += 1;
        min_x = min_x.min(px - 1);
        min_y = min_y.min(py - 1);
        max_x = max_x.max(px - 1);
        max_y = max_y.max(py - 1);

        for (ny, nx) in [(py - 1, px), (py + 1, px), (py, px - 1), (py, px + 1)] {
            if padded[[ny, nx]] == 1 {
                padded[[ny, nx]] = 2;
                queue.push_back((ny, nx));
            }
        }
    }

    let region = padded
        .slice(s![1..height + 1, 1..width + 1])
        .mapv(|v| if v == 2 { 255 } else { 0 });

    FillResult {
        mask: region,
        bounds: Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)),
        pixel_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Array2<u8> {
        let mut m = Array2::<u8>::zeros((8, 10));
        // blob A touches the top-left corner
        for y in 0..3 {
            for x in 0..4 {
                m[[y, x]] = 255;
            }
        }
        // blob B, diagonal contact with A only
        m[[3, 4]] = 255;
        m[[4, 4]] = 255;
        m[[4, 5]] = 255;
        m
    }

    #[test]
    fn test_fill_selects_border_region_unclipped() {
        let m = two_blobs();
        let result = flood_fill_region(m.view(), 0, 0);

        assert_eq!(result.pixel_count, 12);
        assert_eq!(result.bounds, Some((0, 0, 4, 3)));
        assert_eq!(result.mask[[0, 0]], 255);
        assert_eq!(result.mask[[2, 3]], 255);
        assert_eq!(result.mask[[3, 4]], 0);
    }

    #[test]
    fn test_fill_is_4_connected() {
        let m = two_blobs();
        let result = flood_fill_region(m.view(), 5, 4);
        assert_eq!(result.pixel_count, 3);
        assert_eq!(result.mask[[0, 0]], 0);
    }

    #[test]
    fn test_fill_treats_any_positive_value_as_foreground() {
        let mut m = Array2::<u8>::zeros((3, 3));
        m[[1, 0]] = 1;
        m[[1, 1]] = 90;
        m[[1, 2]] = 255;
        let result = flood_fill_region(m.view(), 0, 1);
        assert_eq!(result.pixel_count, 3);
        assert!(result.mask.row(1).iter().all(|&v| v == 255));
    }

    #[test]
    fn test_fill_on_background_is_empty() {
        let m = two_blobs();
        let result = flood_fill_region(m.view(), 9, 7);
        assert_eq!(result.pixel_count, 0);
        assert!(result.bounds.is_none());
        assert!(result.mask.iter().all(|&v| v == 0));
        assert_eq!(result.mask.dim(), m.dim());
    }

    #[test]
    fn test_fill_out_of_bounds_is_empty() {
        let m = two_blobs();
        assert_eq!(flood_fill_region(m.view(), 10, 0).pixel_count, 0);
        assert_eq!(flood_fill_region(m.view(), 0, 8).pixel_count, 0);
    }
}
