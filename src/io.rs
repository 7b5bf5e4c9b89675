//! Image loading and mask persistence via the `image` crate.
//!
//! Masks are stored as single-channel 8-bit PNG so they round-trip exactly.

use std::path::Path;

use image::{GrayImage, ImageFormat, ImageReader};
use ndarray::{Array2, Array3, ArrayView2};

use crate::error::{LabelError, Result};

/// Decode any supported image file into a `(height, width)` luminance plane.
pub fn load_gray(path: impl AsRef<Path>) -> Result<Array2<u8>> {
    let img = ImageReader::open(path.as_ref())?.decode()?.to_luma8();
    let (w, h) = img.dimensions();
    Array2::from_shape_vec((h as usize, w as usize), img.into_raw())
        .map_err(|e| LabelError::ShapeMismatch(e.to_string()))
}

/// Decode an image file into a `(height, width, 3)` RGB array.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<Array3<u8>> {
    let img = ImageReader::open(path.as_ref())?.decode()?.to_rgb8();
    let (w, h) = img.dimensions();
    Array3::from_shape_vec((h as usize, w as usize, 3), img.into_raw())
        .map_err(|e| LabelError::ShapeMismatch(e.to_string()))
}

/// Load a stored label mask.
pub fn load_mask(path: impl AsRef<Path>) -> Result<Array2<u8>> {
    load_gray(path)
}

/// Write a mask as a lossless single-channel PNG.
pub fn save_mask(path: impl AsRef<Path>, mask: ArrayView2<u8>) -> Result<()> {
    let (h, w) = mask.dim();
    let pixels: Vec<u8> = mask.iter().copied().collect();
    let img = GrayImage::from_raw(w as u32, h as u32, pixels).ok_or_else(|| {
        LabelError::ShapeMismatch(format!("cannot store a {h}x{w} mask"))
    })?;
    img.save_with_format(path.as_ref(), ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.png");
        let mask = Array2::from_shape_fn((5, 7), |(y, x)| if (y + x) % 3 == 0 { 255 } else { 0 });

        save_mask(&path, mask.view()).unwrap();
        let back = load_mask(&path).unwrap();

        assert_eq!(back, mask);
    }

    #[test]
    fn test_load_rgb_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        save_mask(&path, Array2::<u8>::from_elem((3, 4), 90).view()).unwrap();

        let rgb = load_rgb(&path).unwrap();

        assert_eq!(rgb.dim(), (3, 4, 3));
        assert!(rgb.iter().all(|&v| v == 90));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_gray("/nonexistent/image.png").unwrap_err();
        assert!(matches!(err, LabelError::Io(_)));
    }
}
