//! WebAssembly exports for mask queries and refinements.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Masks travel
//! as flat row-major byte arrays (length = width * height).

use ndarray::Array2;
use wasm_bindgen::prelude::*;

use crate::guided::PstResult;

fn result_from_flat(data: &[u8], width: usize, height: usize) -> Result<PstResult, JsError> {
    let mask = Array2::from_shape_vec((height, width), data.to_vec())
        .map_err(|e| JsError::new(&format!("invalid mask dimensions: {e}")))?;
    Ok(PstResult::new(mask))
}

fn into_flat(result: PstResult) -> Vec<u8> {
    result.into_mask().into_raw_vec_and_offset().0
}

// ============================================================================
// Region Extraction
// ============================================================================

/// Connected region of a feature mask under a point.
///
/// # Arguments
/// * `data` - Flat feature mask bytes (length = width * height)
/// * `width` - Mask width in pixels
/// * `height` - Mask height in pixels
/// * `x` - Column of the query point
/// * `y` - Row of the query point
///
/// # Returns
/// Flat 0/255 mask of the region
#[wasm_bindgen]
pub fn extract_at_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
) -> Result<Vec<u8>, JsError> {
    let result = result_from_flat(data, width, height)?;
    Ok(result.extract_at(x, y).into_raw_vec_and_offset().0)
}

// ============================================================================
// Refinements
// ============================================================================

/// Remove clusters smaller than `thresh_px` pixels.
#[wasm_bindgen]
pub fn denoise_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    thresh_px: usize,
) -> Result<Vec<u8>, JsError> {
    let mut result = result_from_flat(data, width, height)?;
    result.denoise(thresh_px);
    Ok(into_flat(result))
}

/// Close, thicken and median-smooth a mask.
///
/// # Arguments
/// * `closing_size` - Elliptical closing diameter (the native default is 15)
/// * `median_size` - Median window side (the native default is 7)
///
/// Both sizes must be passed explicitly.
#[wasm_bindgen]
pub fn mask_reconstruction_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    closing_size: usize,
    median_size: usize,
) -> Result<Vec<u8>, JsError> {
    let mut result = result_from_flat(data, width, height)?;
    result.mask_reconstruction_with(closing_size, median_size);
    Ok(into_flat(result))
}
