//! Single-channel filters used by the labeler and its mask refinements.
//!
//! | Module | Operations |
//! |--------|------------|
//! | `grayscale` | 1/3/4-channel u8 image to a luminance plane |
//! | `morphology` | dilate, erode, close (elliptical elements), thinning, perimeter |
//! | `noise` | median smoothing |
//!
//! Masks are `(height, width)` u8 arrays. Row-wise work runs on rayon.

pub mod grayscale;
pub mod morphology;
pub mod noise;
