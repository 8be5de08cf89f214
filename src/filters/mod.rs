//! Spatial filter kernels for texture derivation
//!
//! Separable Gaussian blur, the Sobel gradient pair, and bilinear
//! rotation, all operating on float planes. Blurs take a boundary
//! mode: `Replicate` for ordinary images, `Wrap` (periodic) when the
//! input tiles and the output must keep tiling. The horizontal blur
//! pass splits edge and interior loops so the interior auto-vectorizes.

pub mod fft;
pub mod noise;

use crate::types::{Error, Plane, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Boundary policy for convolution kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Clamp out-of-range taps to the nearest edge sample.
    Replicate,
    /// Wrap taps around the torus; preserves seamless tiling exactly.
    Wrap,
}

/// Axis selection for 1-D blurs (wood grain, brushed-metal streaks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

#[inline]
fn tap(pos: isize, len: usize, boundary: Boundary) -> usize {
    match boundary {
        Boundary::Replicate => pos.clamp(0, len as isize - 1) as usize,
        Boundary::Wrap => pos.rem_euclid(len as isize) as usize,
    }
}

/// Generate a normalized 1-D Gaussian kernel with radius `ceil(3 * sigma)`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let size = 2 * radius + 1;
    let mut kernel = Vec::with_capacity(size);
    let mut sum = 0.0;

    for i in 0..size {
        let x = i as f32 - radius as f32;
        let value = (-x * x / (2.0 * sigma * sigma)).exp();
        kernel.push(value);
        sum += value;
    }

    for k in &mut kernel {
        *k /= sum;
    }

    kernel
}

/// Separable Gaussian blur with edge replication. `sigma <= 0` is a no-op.
pub fn gaussian_blur(plane: &Plane, sigma: f32) -> Result<Plane> {
    gaussian_blur_with(plane, sigma, Boundary::Replicate)
}

/// Separable Gaussian blur with an explicit boundary policy.
pub fn gaussian_blur_with(plane: &Plane, sigma: f32, boundary: Boundary) -> Result<Plane> {
    if sigma <= 0.0 {
        return Ok(plane.clone());
    }
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area plane".to_string()));
    }
    let kernel = gaussian_kernel_1d(sigma);
    let half_k = kernel.len() / 2;

    let src = flat_copy(plane);
    let mut temp = vec![0.0f32; height * width];
    horizontal_pass(&src, &mut temp, width, &kernel, half_k, boundary);

    let mut out = vec![0.0f32; height * width];
    vertical_pass(&temp, &mut out, width, height, &kernel, half_k, boundary);

    Array2::from_shape_vec((height, width), out)
        .map_err(|e| Error::InvalidShape(format!("blur output shape: {}", e)))
}

/// 1-D Gaussian blur along a single axis, edge replicated.
pub fn gaussian_blur_axis(plane: &Plane, sigma: f32, axis: BlurAxis) -> Result<Plane> {
    gaussian_blur_axis_with(plane, sigma, axis, Boundary::Replicate)
}

/// 1-D Gaussian blur along a single axis with an explicit boundary policy.
pub fn gaussian_blur_axis_with(
    plane: &Plane,
    sigma: f32,
    axis: BlurAxis,
    boundary: Boundary,
) -> Result<Plane> {
    if sigma <= 0.0 {
        return Ok(plane.clone());
    }
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area plane".to_string()));
    }
    let kernel = gaussian_kernel_1d(sigma);
    let half_k = kernel.len() / 2;
    let src = flat_copy(plane);
    let mut out = vec![0.0f32; height * width];

    match axis {
        BlurAxis::Horizontal => horizontal_pass(&src, &mut out, width, &kernel, half_k, boundary),
        BlurAxis::Vertical => vertical_pass(&src, &mut out, width, height, &kernel, half_k, boundary),
    }

    Array2::from_shape_vec((height, width), out)
        .map_err(|e| Error::InvalidShape(format!("blur output shape: {}", e)))
}

/// Row-wise convolution pass. Edge and interior columns are handled
/// separately so the interior loop carries no boundary arithmetic.
fn horizontal_pass(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    kernel: &[f32],
    half_k: usize,
    boundary: Boundary,
) {
    let kernel_size = kernel.len();
    dst.par_chunks_mut(width).enumerate().for_each(|(y, dst_row)| {
        let src_row = &src[y * width..(y + 1) * width];

        let interior = width > kernel_size;
        let left_end = if interior { half_k } else { width };
        let right_start = if interior { width - half_k } else { width };

        // Left edge
        for x in 0..left_end {
            let mut sum = 0.0f32;
            for (i, &k_val) in kernel.iter().enumerate() {
                let sx = tap(x as isize + i as isize - half_k as isize, width, boundary);
                sum += src_row[sx] * k_val;
            }
            dst_row[x] = sum;
        }

        // Interior (no boundary arithmetic)
        if interior {
            for x in half_k..(width - half_k) {
                let mut sum = 0.0f32;
                let base = x - half_k;
                for (i, &k_val) in kernel.iter().enumerate() {
                    sum += src_row[base + i] * k_val;
                }
                dst_row[x] = sum;
            }
        }

        // Right edge
        for x in right_start..width {
            let mut sum = 0.0f32;
            for (i, &k_val) in kernel.iter().enumerate() {
                let sx = tap(x as isize + i as isize - half_k as isize, width, boundary);
                sum += src_row[sx] * k_val;
            }
            dst_row[x] = sum;
        }
    });
}

/// Column-wise convolution pass, parallel over output rows.
fn vertical_pass(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    kernel: &[f32],
    half_k: usize,
    boundary: Boundary,
) {
    dst.par_chunks_mut(width).enumerate().for_each(|(y, dst_row)| {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (i, &k_val) in kernel.iter().enumerate() {
                let sy = tap(y as isize + i as isize - half_k as isize, height, boundary);
                sum += src[sy * width + x] * k_val;
            }
            dst_row[x] = sum;
        }
    });
}

/// Sobel gradient pair with edge-replicated boundaries.
///
/// `gx` is positive where the plane brightens toward +x, `gy` where it
/// brightens toward +y.
pub fn sobel_xy(plane: &Plane) -> Result<(Plane, Plane)> {
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area plane".to_string()));
    }
    let src = flat_copy(plane);

    let rows: Vec<(Vec<f32>, Vec<f32>)> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut gx_row = vec![0.0f32; width];
            let mut gy_row = vec![0.0f32; width];
            let y0 = y.saturating_sub(1);
            let y2 = (y + 1).min(height - 1);
            for x in 0..width {
                let x0 = x.saturating_sub(1);
                let x2 = (x + 1).min(width - 1);

                let tl = src[y0 * width + x0];
                let tc = src[y0 * width + x];
                let tr = src[y0 * width + x2];
                let ml = src[y * width + x0];
                let mr = src[y * width + x2];
                let bl = src[y2 * width + x0];
                let bc = src[y2 * width + x];
                let br = src[y2 * width + x2];

                gx_row[x] = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
                gy_row[x] = (bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr);
            }
            (gx_row, gy_row)
        })
        .collect();

    let mut gx = Vec::with_capacity(height * width);
    let mut gy = Vec::with_capacity(height * width);
    for (gx_row, gy_row) in rows {
        gx.extend_from_slice(&gx_row);
        gy.extend_from_slice(&gy_row);
    }

    let gx = Array2::from_shape_vec((height, width), gx)
        .map_err(|e| Error::InvalidShape(format!("sobel output shape: {}", e)))?;
    let gy = Array2::from_shape_vec((height, width), gy)
        .map_err(|e| Error::InvalidShape(format!("sobel output shape: {}", e)))?;
    Ok((gx, gy))
}

/// Rotate a plane about its center by `angle_deg` (counter-clockwise),
/// bilinear resampled with edge replication. Output keeps the input size.
pub fn rotate(plane: &Plane, angle_deg: f32) -> Result<Plane> {
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area plane".to_string()));
    }
    let theta = angle_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let src = flat_copy(plane);

    let mut out = vec![0.0f32; height * width];
    out.par_chunks_mut(width).enumerate().for_each(|(y, out_row)| {
        let dy = y as f32 - cy;
        for (x, slot) in out_row.iter_mut().enumerate() {
            let dx = x as f32 - cx;
            // Inverse rotation maps output pixels back onto the source
            let sx = cos_t * dx + sin_t * dy + cx;
            let sy = -sin_t * dx + cos_t * dy + cy;
            *slot = bilinear_sample(&src, width, height, sx, sy);
        }
    });

    Array2::from_shape_vec((height, width), out)
        .map_err(|e| Error::InvalidShape(format!("rotate output shape: {}", e)))
}

/// Bilinear sample with coordinates clamped into the plane.
fn bilinear_sample(src: &[f32], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x = x.clamp(0.0, width as f32 - 1.0);
    let y = y.clamp(0.0, height as f32 - 1.0);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = src[y0 * width + x0] * (1.0 - fx) + src[y0 * width + x1] * fx;
    let bottom = src[y1 * width + x0] * (1.0 - fx) + src[y1 * width + x1] * fx;
    top * (1.0 - fy) + bottom * fy
}

fn flat_copy(plane: &Plane) -> Vec<f32> {
    if let Some(slice) = plane.as_slice() {
        slice.to_vec()
    } else {
        plane.iter().copied().collect()
    }
}
