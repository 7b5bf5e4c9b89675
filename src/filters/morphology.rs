//! Morphology on single-channel masks: Dilate, Erode, Close, Thin, Perimeter.
//!
//! Grayscale operators work on `(height, width)` u8 masks with an arbitrary
//! boolean structuring element anchored at its center. Pixels outside the
//! image never take part in the min/max, so borders neither grow nor shrink
//! a region on their own.
//!
//! ## Performance
//!
//! Rows are processed in parallel with Rayon.

use ndarray::{Array2, ArrayView2, Axis};
use ndarray::parallel::prelude::*;

// ============================================================================
// Structuring Elements
// ============================================================================

/// Elliptical structuring element inscribed in a `size × size` square.
///
/// Row spans follow OpenCV's `getStructuringElement(MORPH_ELLIPSE, ..)`, so a
/// size of 3 gives the plus-shaped cross and larger sizes give a disc whose
/// top and bottom rows collapse to the center column.
///
/// # Arguments
/// * `size` - Diameter in pixels (0 is treated as 1)
pub fn ellipse_element(size: usize) -> Array2<bool> {
    let size = size.max(1);
    let r = (size / 2) as isize;
    let c = (size / 2) as isize;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

    let mut element = Array2::from_elem((size, size), false);
    for i in 0..size {
        let dy = i as isize - r;
        if dy.abs() > r {
            continue;
        }
        let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
        let j1 = (c - dx).max(0) as usize;
        let j2 = ((c + dx + 1) as usize).min(size);
        for j in j1..j2 {
            element[[i, j]] = true;
        }
    }

    element
}

/// Offsets `(dy, dx)` of the set cells of an element relative to its center.
fn element_offsets(element: ArrayView2<bool>) -> Vec<(isize, isize)> {
    let (eh, ew) = element.dim();
    let (ay, ax) = ((eh / 2) as isize, (ew / 2) as isize);
    element
        .indexed_iter()
        .filter(|(_, &on)| on)
        .map(|((y, x), _)| (y as isize - ay, x as isize - ax))
        .collect()
}

fn rank_filter(
    input: ArrayView2<u8>,
    element: ArrayView2<bool>,
    init: u8,
    pick: fn(u8, u8) -> u8,
) -> Array2<u8> {
    let (height, width) = input.dim();
    let offsets = element_offsets(element);
    let mut output = Array2::<u8>::zeros((height, width));

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                let mut acc = init;
                for &(dy, dx) in &offsets {
                    let sy = y as isize + dy;
                    let sx = x as isize + dx;
                    if sy < 0 || sy >= height as isize || sx < 0 || sx >= width as isize {
                        continue;
                    }
                    acc = pick(acc, input[[sy as usize, sx as usize]]);
                }
                row[x] = acc;
            }
        });

    output
}

// ============================================================================
// Dilate / Erode / Close
// ============================================================================

/// Grayscale dilation: maximum over the structuring element.
///
/// # Arguments
/// * `input` - Single-channel mask (height, width)
/// * `element` - Structuring element, anchored at its center
///
/// # Returns
/// Dilated mask with the same shape
pub fn dilate_u8(input: ArrayView2<u8>, element: ArrayView2<bool>) -> Array2<u8> {
    rank_filter(input, element, u8::MIN, u8::max)
}

/// Grayscale erosion: minimum over the structuring element.
///
/// # Arguments
/// * `input` - Single-channel mask (height, width)
/// * `element` - Structuring element, anchored at its center
///
/// # Returns
/// Eroded mask with the same shape
pub fn erode_u8(input: ArrayView2<u8>, element: ArrayView2<bool>) -> Array2<u8> {
    rank_filter(input, element, u8::MAX, u8::min)
}

/// Morphological closing (dilate, then erode with the same element).
///
/// Fills gaps and holes smaller than the element without growing the region.
pub fn close_u8(input: ArrayView2<u8>, element: ArrayView2<bool>) -> Array2<u8> {
    let dilated = dilate_u8(input, element);
    erode_u8(dilated.view(), element)
}

// ============================================================================
// Binary Thinning / Perimeter
// ============================================================================

/// 8-neighborhood of `(y, x)` clockwise from north; outside pixels are off.
#[inline]
fn neighbors_8(img: &Array2<bool>, y: usize, x: usize) -> [bool; 8] {
    const RING: [(isize, isize); 8] = [
        (-1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
        (1, 0),
        (1, -1),
        (0, -1),
        (-1, -1),
    ];
    let (h, w) = img.dim();
    let mut out = [false; 8];
    for (slot, &(dy, dx)) in out.iter_mut().zip(RING.iter()) {
        let sy = y as isize + dy;
        let sx = x as isize + dx;
        if sy >= 0 && sx >= 0 && (sy as usize) < h && (sx as usize) < w {
            *slot = img[[sy as usize, sx as usize]];
        }
    }
    out
}

/// Zhang-Suen thinning.
///
/// Each iteration runs both sub-passes; stops early once nothing changes.
///
/// # Arguments
/// * `input` - Binary mask
/// * `max_iter` - Upper bound on thinning iterations
pub fn thin(input: ArrayView2<bool>, max_iter: usize) -> Array2<bool> {
    let mut img = input.to_owned();
    let (height, width) = img.dim();

    for _ in 0..max_iter {
        let mut changed = false;

        for pass in 0..2 {
            let mut remove = Vec::new();
            for y in 0..height {
                for x in 0..width {
                    if !img[[y, x]] {
                        continue;
                    }
                    let n = neighbors_8(&img, y, x);
                    let b = n.iter().filter(|&&on| on).count();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let a = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
                    if a != 1 {
                        continue;
                    }
                    let (p2, p4, p6, p8) = (n[0], n[2], n[4], n[6]);
                    let deletable = if pass == 0 {
                        !(p2 && p4 && p6) && !(p4 && p6 && p8)
                    } else {
                        !(p2 && p4 && p8) && !(p2 && p6 && p8)
                    };
                    if deletable {
                        remove.push((y, x));
                    }
                }
            }

            changed |= !remove.is_empty();
            for (y, x) in remove {
                img[[y, x]] = false;
            }
        }

        if !changed {
            break;
        }
    }

    img
}

/// Pixels that are on and have at least one off (or outside) 4-neighbor.
pub fn perimeter_4(input: ArrayView2<bool>) -> Array2<bool> {
    let (height, width) = input.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        if !input[[y, x]] {
            return false;
        }
        y == 0
            || x == 0
            || y + 1 == height
            || x + 1 == width
            || !input[[y - 1, x]]
            || !input[[y + 1, x]]
            || !input[[y, x - 1]]
            || !input[[y, x + 1]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_on(mask: &Array2<u8>) -> usize {
        mask.iter().filter(|&&v| v > 0).count()
    }

    #[test]
    fn test_ellipse_3_is_cross() {
        let e = ellipse_element(3);
        let expected = [
            [false, true, false],
            [true, true, true],
            [false, true, false],
        ];
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(e[[y, x]], expected[y][x], "at ({y}, {x})");
            }
        }
    }

    #[test]
    fn test_ellipse_15_matches_opencv_rows() {
        let e = ellipse_element(15);
        let row_len = |y: usize| e.row(y).iter().filter(|&&on| on).count();
        assert_eq!(row_len(0), 1);
        assert_eq!(row_len(1), 9);
        assert_eq!(row_len(7), 15);
        assert_eq!(row_len(14), 1);
        assert!(e[[0, 7]]);
    }

    #[test]
    fn test_dilate_u8_grows_single_pixel_to_cross() {
        let mut img = Array2::<u8>::zeros((5, 5));
        img[[2, 2]] = 255;

        let result = dilate_u8(img.view(), ellipse_element(3).view());

        assert_eq!(count_on(&result), 5);
        assert_eq!(result[[1, 2]], 255);
        assert_eq!(result[[2, 1]], 255);
        assert_eq!(result[[1, 1]], 0);
    }

    #[test]
    fn test_erode_u8_ignores_outside_pixels() {
        let img = Array2::<u8>::from_elem((4, 4), 255);
        let result = erode_u8(img.view(), ellipse_element(3).view());
        assert!(result.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_close_u8_bridges_gap_in_bar() {
        let mut img = Array2::<u8>::zeros((13, 19));
        for y in 4..9 {
            for x in 4..15 {
                if x != 9 {
                    img[[y, x]] = 255;
                }
            }
        }

        let result = close_u8(img.view(), ellipse_element(5).view());

        for y in 5..8 {
            assert_eq!(result[[y, 9]], 255);
        }
        // the element's top and bottom rows are a single pixel
        assert_eq!(result[[4, 9]], 0);
        assert_eq!(result[[8, 9]], 0);
        assert_eq!(count_on(&result), 53);
    }

    #[test]
    fn test_close_u8_keeps_one_pixel_gap_in_line() {
        let mut img = Array2::<u8>::zeros((9, 19));
        for x in 4..15 {
            if x != 9 {
                img[[4, x]] = 255;
            }
        }

        let result = close_u8(img.view(), ellipse_element(5).view());

        assert_eq!(result[[4, 9]], 0);
        assert_eq!(result, img);
    }

    #[test]
    fn test_thin_reduces_thick_bar() {
        let mut img = Array2::from_elem((7, 12), false);
        for y in 2..5 {
            for x in 1..11 {
                img[[y, x]] = true;
            }
        }

        let thinned = thin(img.view(), 10);
        let before = img.iter().filter(|&&on| on).count();
        let after = thinned.iter().filter(|&&on| on).count();

        assert!(after < before);
        assert!(after > 0);
        // thinning only removes pixels
        for ((y, x), &on) in thinned.indexed_iter() {
            if on {
                assert!(img[[y, x]]);
            }
        }
    }

    #[test]
    fn test_perimeter_of_square_is_outline() {
        let mut img = Array2::from_elem((7, 7), false);
        for y in 1..6 {
            for x in 1..6 {
                img[[y, x]] = true;
            }
        }

        let outline = perimeter_4(img.view());

        assert_eq!(outline.iter().filter(|&&on| on).count(), 16);
        assert!(outline[[1, 1]]);
        assert!(!outline[[3, 3]]);
    }
}
