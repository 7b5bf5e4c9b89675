//! Phase Stretch Transform kernel.
//!
//! The kernel is a warped phase profile in the frequency domain:
//!
//! ```text
//! k(rho) = S * f(W * rho) / max f,   f(t) = t * atan(t) - ln(1 + t^2) / 2
//! ```
//!
//! Applying it to a low-pass filtered image and taking the argument of the
//! result yields a phase field whose extremes sit on sharp transitions.

use std::f32::consts::LN_2;

use ndarray::{Array2, ArrayView2, Zip};
use rustfft::num_complex::Complex32;
use tracing::instrument;

use super::fft::Fft2;
use crate::device::Device;
use crate::filters::morphology::{perimeter_4, thin};

/// Dark-area cutoff: pixels at or below `max / DARK_FRACTION` never carry features.
const DARK_FRACTION: f32 = 20.0;

/// PST kernel sized for one image shape and one `(S, W)` pair.
///
/// Building is the expensive part (planning plus the per-frequency profile);
/// [`phase_field`](Self::phase_field) only runs FFTs.
pub struct PstKernel {
    height: usize,
    width: usize,
    phase_strength: f32,
    warp_strength: f32,
    /// Radial frequency per bin, FFT order.
    rho: Vec<f32>,
    /// Phase profile per bin, FFT order.
    profile: Vec<f32>,
    fft: Fft2,
}

impl PstKernel {
    /// Build the kernel for a `height × width` image.
    ///
    /// # Arguments
    /// * `phase_strength` - S, peak phase of the profile
    /// * `warp_strength` - W, how strongly the profile bends with frequency
    /// * `device` - where the FFT passes run
    #[instrument(level = "debug", skip(device))]
    pub fn new(
        height: usize,
        width: usize,
        phase_strength: f32,
        warp_strength: f32,
        device: Device,
    ) -> Self {
        let u = linspace_half(height);
        let v = linspace_half(width);

        let mut rho = vec![0.0f32; height * width];
        let mut profile = vec![0.0f32; height * width];
        let mut peak = f32::NEG_INFINITY;

        for (y, &uy) in u.iter().enumerate() {
            let sy = ifftshift_index(y, height);
            for (x, &vx) in v.iter().enumerate() {
                let sx = ifftshift_index(x, width);
                let r = (uy * uy + vx * vx).sqrt();
                let t = warp_strength * r;
                let k = t * t.atan() - 0.5 * (1.0 + t * t).ln();

                let idx = sy * width + sx;
                rho[idx] = r;
                profile[idx] = k;
                peak = peak.max(k);
            }
        }

        if peak.is_finite() && peak > 0.0 {
            let scale = phase_strength / peak;
            for k in profile.iter_mut() {
                *k *= scale;
            }
        } else {
            profile.iter_mut().for_each(|k| *k = 0.0);
        }

        Self {
            height,
            width,
            phase_strength,
            warp_strength,
            rho,
            profile,
            fft: Fft2::new(height, width, device),
        }
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// `(phase_strength, warp_strength)` the kernel was built with.
    #[inline]
    pub fn strengths(&self) -> (f32, f32) {
        (self.phase_strength, self.warp_strength)
    }

    /// Whether this kernel can be reused for the given shape and strengths.
    pub fn fits(&self, height: usize, width: usize, phase_strength: f32, warp_strength: f32) -> bool {
        self.dim() == (height, width) && self.strengths() == (phase_strength, warp_strength)
    }

    /// Run the transform and return the output phase in radians.
    ///
    /// `sigma_lpf <= 0` disables the low-pass stage.
    ///
    /// # Panics
    /// Debug builds assert that `image` matches the kernel shape.
    pub fn phase_field(&self, image: ArrayView2<u8>, sigma_lpf: f32) -> Array2<f32> {
        debug_assert_eq!(image.dim(), self.dim());
        let (h, w) = self.dim();

        let mut buf: Vec<Complex32> = image.iter().map(|&v| Complex32::new(v as f32, 0.0)).collect();
        self.fft.forward(&mut buf);

        if sigma_lpf > 0.0 {
            let c = LN_2 / (sigma_lpf * sigma_lpf);
            for (v, &r) in buf.iter_mut().zip(self.rho.iter()) {
                *v *= (-r * r * c).exp();
            }
            self.fft.inverse(&mut buf);
            for v in buf.iter_mut() {
                v.im = 0.0;
            }
            self.fft.forward(&mut buf);
        }

        for (v, &k) in buf.iter_mut().zip(self.profile.iter()) {
            *v *= Complex32::from_polar(1.0, -k);
        }
        self.fft.inverse(&mut buf);

        // arg() of a signed zero is ±pi; vanishing response means no phase
        Array2::from_shape_fn((h, w), |(y, x)| {
            let c = buf[y * w + x];
            if c.norm_sqr() == 0.0 {
                0.0
            } else {
                c.arg()
            }
        })
    }
}

/// Binary feature map (0.0 / 1.0) from a phase field.
///
/// Marks phase above `thresh_max` or below `thresh_min`, clears dark areas of
/// the source image, then thins, keeps the 4-connected perimeter and thins again.
pub fn feature_map(
    image: ArrayView2<u8>,
    phase: ArrayView2<f32>,
    thresh_min: f32,
    thresh_max: f32,
) -> Array2<f32> {
    let brightest = image.iter().copied().max().unwrap_or(0) as f32;
    let floor = brightest / DARK_FRACTION;

    let raw = Zip::from(phase)
        .and(image)
        .map_collect(|&p, &v| (p > thresh_max || p < thresh_min) && v as f32 > floor);

    let skeleton = thin(raw.view(), 1);
    let outline = perimeter_4(skeleton.view());
    thin(outline.view(), 1).mapv(|on| if on { 1.0 } else { 0.0 })
}

/// `numpy.linspace(-0.5, 0.5, n)`.
fn linspace_half(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![-0.5],
        _ => (0..n).map(|i| -0.5 + i as f32 / (n - 1) as f32).collect(),
    }
}

/// Destination of centered index `i` after `ifftshift` of a length-`n` axis.
#[inline]
fn ifftshift_index(i: usize, n: usize) -> usize {
    (i + n - n / 2) % n
}
