//! Separable 2D FFT over row-major `f32` buffers.

use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::device::Device;

/// Planned forward/inverse 2D transform for a fixed `height × width`.
///
/// Rows are transformed in place, columns through a transposed scratch
/// buffer. The inverse is normalized by `1 / (height * width)`.
pub struct Fft2 {
    height: usize,
    width: usize,
    device: Device,
    row_forward: Arc<dyn Fft<f32>>,
    row_inverse: Arc<dyn Fft<f32>>,
    col_forward: Arc<dyn Fft<f32>>,
    col_inverse: Arc<dyn Fft<f32>>,
}

impl Fft2 {
    pub fn new(height: usize, width: usize, device: Device) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            height,
            width,
            device,
            row_forward: planner.plan_fft_forward(width),
            row_inverse: planner.plan_fft_inverse(width),
            col_forward: planner.plan_fft_forward(height),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn forward(&self, data: &mut [Complex32]) {
        self.transform(data, &self.row_forward, &self.col_forward);
    }

    pub fn inverse(&self, data: &mut [Complex32]) {
        self.transform(data, &self.row_inverse, &self.col_inverse);
        let scale = 1.0 / (self.height * self.width) as f32;
        for v in data.iter_mut() {
            *v *= scale;
        }
    }

    fn transform(&self, data: &mut [Complex32], rows: &Arc<dyn Fft<f32>>, cols: &Arc<dyn Fft<f32>>) {
        let (h, w) = (self.height, self.width);
        debug_assert_eq!(data.len(), h * w);
        if h == 0 || w == 0 {
            return;
        }

        self.run_lines(data, w, rows);

        let mut transposed = vec![Complex32::new(0.0, 0.0); h * w];
        for y in 0..h {
            for x in 0..w {
                transposed[x * h + y] = data[y * w + x];
            }
        }

        self.run_lines(&mut transposed, h, cols);

        for x in 0..w {
            for y in 0..h {
                data[y * w + x] = transposed[x * h + y];
            }
        }
    }

    fn run_lines(&self, data: &mut [Complex32], len: usize, fft: &Arc<dyn Fft<f32>>) {
        if self.device.is_parallel() {
            data.par_chunks_mut(len).for_each(|line| fft.process(line));
        } else {
            let mut scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];
            for line in data.chunks_mut(len) {
                fft.process_with_scratch(line, &mut scratch);
            }
        }
    }
}
