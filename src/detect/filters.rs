//! Grayscale filters used by motion differencing.

use anyhow::{anyhow, Result};

use crate::frame::GrayFrame;

/// Precompute a normalised 1D Gaussian kernel.
///
/// `kernel_size` must be odd and >= 1. Sigma follows the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule for an unspecified sigma.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    if kernel_size <= 1 {
        return vec![1.0];
    }
    let sigma = 0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (kernel_size / 2) as f64;
    let mut kernel: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel.iter().map(|&v| v as f32).collect()
}

/// Separable Gaussian blur. Borders mirror without repeating the edge
/// pixel (`dcb|abcd|cba`).
pub fn gaussian_blur(src: &GrayFrame, kernel: &[f32]) -> GrayFrame {
    let width = src.width as usize;
    let height = src.height as usize;
    let mut out = src.clone();
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return out;
    }
    let half = (kernel.len() / 2) as isize;
    let data = src.pixels();
    let mut temp = vec![0f32; width * height];

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - half, width);
                sum += data[y * width + sx] as f32 * w;
            }
            temp[y * width + x] = sum;
        }
    }

    let dst = out.pixels_mut();
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - half, height);
                sum += temp[sy * width + x] * w;
            }
            dst[y * width + x] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn reflect_101(mut i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    while i < 0 || i >= len {
        i = if i < 0 { -i } else { 2 * len - 2 - i };
    }
    i as usize
}

/// Per-pixel `|a - b|`.
pub fn abs_diff(a: &GrayFrame, b: &GrayFrame) -> Result<GrayFrame> {
    if !a.same_dimensions(b) {
        return Err(anyhow!(
            "cannot difference {}x{} against {}x{}",
            a.width,
            a.height,
            b.width,
            b.height
        ));
    }
    let data = a
        .pixels()
        .iter()
        .zip(b.pixels())
        .map(|(&p, &q)| p.abs_diff(q))
        .collect();
    GrayFrame::new(data, a.width, a.height)
}

/// Binary threshold: strictly above `cutoff` becomes 255, the rest 0.
pub fn threshold(src: &GrayFrame, cutoff: u8) -> GrayFrame {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        *p = if *p > cutoff { 255 } else { 0 };
    }
    out
}

/// Morphological dilation with a 3x3 square structuring element, repeated
/// `iterations` times. Pixels outside the frame do not contribute.
pub fn dilate(src: &GrayFrame, iterations: u32) -> GrayFrame {
    let width = src.width as usize;
    let height = src.height as usize;
    let mut current = src.clone();
    for _ in 0..iterations {
        let prev = current.pixels().to_vec();
        let dst = current.pixels_mut();
        for y in 0..height {
            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(height - 1);
            for x in 0..width {
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(width - 1);
                let mut max = 0u8;
                for ny in y0..=y1 {
                    for nx in x0..=x1 {
                        max = max.max(prev[ny * width + nx]);
                    }
                }
                dst[y * width + x] = max;
            }
        }
    }
    current
}
