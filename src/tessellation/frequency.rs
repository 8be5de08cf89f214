//! Frequency tessellation: windowed FFT high-pass
//!
//! A 2-D Hann window takes the image to zero along its borders, a soft
//! radial high-pass strips the low-frequency content responsible for
//! visible seams, and the image mean is restored additively after the
//! inverse transform. A narrow wrap equalization pass then removes the
//! last numeric residue at the boundary. Works best on organic and
//! noise-like textures.

use super::{wrap_blend_horizontal, wrap_blend_vertical};
use crate::filters::fft::{fft2, ifft2};
use crate::pipeline::diagnostics::CancelToken;
use crate::types::{Plane, Result};
use ndarray::Array2;

/// Band the final wrap equalization runs over, in pixels.
const SEAL_BAND: usize = 2;

pub fn frequency_blend(plane: &Plane, cancel: &CancelToken) -> Result<Plane> {
    cancel.check()?;
    let (height, width) = (plane.nrows(), plane.ncols());
    let mean = plane.mean().unwrap_or(0.0);

    // 2-D Hann window: zero on every border row/column
    let window_x = hann(width);
    let window_y = hann(height);
    let windowed = Array2::from_shape_fn((height, width), |(y, x)| {
        plane[(y, x)] * window_y[y] * window_x[x]
    });

    let mut spectrum = fft2(&windowed)?;
    cancel.check()?;

    // Soft radial high-pass; the DC term is carried separately as the mean
    let r0 = 0.01 * width.min(height) as f64;
    spectrum.apply_radial_gain(|r| {
        let s = r / r0;
        1.0 - (-s * s).exp()
    });

    let mut out = ifft2(&spectrum)?;
    cancel.check()?;

    out.mapv_inplace(|v| (v + mean).clamp(0.0, 1.0));

    wrap_blend_horizontal(&mut out, SEAL_BAND);
    wrap_blend_vertical(&mut out, SEAL_BAND);
    Ok(out)
}

fn hann(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (n as f32 - 1.0);
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}
