//! Median smoothing for single-channel masks.
//!
//! Uses a sliding 256-bin histogram per row (Huang's algorithm), so the cost
//! per pixel grows with the window side rather than its area. Borders are
//! replicated, matching OpenCV's `medianBlur`.

use ndarray::{Array2, ArrayView2, Axis};
use ndarray::parallel::prelude::*;

// ============================================================================
// Median
// ============================================================================

/// Value at sorted position `count / 2` of the histogram.
#[inline]
fn histogram_median(hist: &[u32; 256], count: u32) -> u8 {
    let target = count / 2;
    let mut cumulative = 0u32;
    for (value, &n) in hist.iter().enumerate() {
        cumulative += n;
        if cumulative > target {
            return value as u8;
        }
    }
    255
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Median filter over a square window with replicated borders.
///
/// # Arguments
/// * `input` - Single-channel image (height, width)
/// * `ksize` - Window side; even sizes behave like `ksize + 1`, sizes below 2 copy the input
///
/// # Returns
/// Filtered image with the same shape
pub fn median_u8(input: ArrayView2<u8>, ksize: usize) -> Array2<u8> {
    let (height, width) = input.dim();
    let radius = ksize / 2;
    if radius == 0 || height == 0 || width == 0 {
        return input.to_owned();
    }

    let r = radius as isize;
    let side = 2 * radius + 1;
    let count = (side * side) as u32;
    let mut output = Array2::<u8>::zeros((height, width));

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            let rows: Vec<usize> = (-r..=r)
                .map(|dy| clamp_index(y as isize + dy, height))
                .collect();

            let mut hist = [0u32; 256];
            for &sy in &rows {
                for dx in -r..=r {
                    hist[input[[sy, clamp_index(dx, width)]] as usize] += 1;
                }
            }
            row[0] = histogram_median(&hist, count);

            for x in 1..width {
                let leaving = clamp_index(x as isize - r - 1, width);
                let entering = clamp_index(x as isize + r, width);
                for &sy in &rows {
                    hist[input[[sy, leaving]] as usize] -= 1;
                    hist[input[[sy, entering]] as usize] += 1;
                }
                row[x] = histogram_median(&hist, count);
            }
        });

    output
}
