//! Grayscale conversion.
//!
//! Uses ITU-R BT.709 luminosity coefficients.

use ndarray::{Array2, ArrayView3, Axis};

use crate::error::{LabelError, Result};

/// ITU-R BT.709 luminosity coefficients
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Collapse an image to a single luminance channel.
///
/// Alpha, when present, is ignored.
///
/// # Arguments
/// * `input` - 3D array view of shape (height, width, channels) with 1, 3 or 4 channels
///
/// # Returns
/// Luminance plane of shape (height, width)
pub fn to_gray_u8(input: ArrayView3<u8>) -> Result<Array2<u8>> {
    let (height, width, channels) = input.dim();

    match channels {
        1 => Ok(input.index_axis(Axis(2), 0).to_owned()),
        3 | 4 => Ok(Array2::from_shape_fn((height, width), |(y, x)| {
            let r = input[[y, x, 0]] as f32;
            let g = input[[y, x, 1]] as f32;
            let b = input[[y, x, 2]] as f32;
            (LUMA_R * r + LUMA_G * g + LUMA_B * b).round().min(255.0) as u8
        })),
        n => Err(LabelError::InvalidArgument(format!(
            "expected 1, 3 or 4 channels, got {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_gray_u8_red() {
        let mut img = Array3::<u8>::zeros((1, 1, 3));
        img[[0, 0, 0]] = 255;
        let gray = to_gray_u8(img.view()).unwrap();
        assert_eq!(gray[[0, 0]], 54);
    }

    #[test]
    fn test_gray_u8_white_rgba() {
        let img = Array3::<u8>::from_elem((2, 2, 4), 255);
        let gray = to_gray_u8(img.view()).unwrap();
        assert!(gray.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_gray_u8_single_channel_passthrough() {
        let img = Array3::from_shape_fn((2, 3, 1), |(y, x, _)| (y * 3 + x) as u8);
        let gray = to_gray_u8(img.view()).unwrap();
        assert_eq!(gray[[1, 2]], 5);
    }

    #[test]
    fn test_gray_u8_rejects_two_channels() {
        let img = Array3::<u8>::zeros((2, 2, 2));
        assert!(to_gray_u8(img.view()).is_err());
    }
}
