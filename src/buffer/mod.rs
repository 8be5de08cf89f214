//! Planar image buffers and channel conversions
//!
//! All pipeline kernels operate on `ndarray` float planes in `[0, 1]`.
//! This module owns the conversions at the boundary: 8-bit interleaved
//! RGB from the provider, quantized 8/16-bit grayscale toward the PNG
//! writer, and Lanczos-3 resampling in between.

use crate::types::{Error, Plane, Result, RgbPlanes};
use image::imageops::FilterType;
use image::{Rgb32FImage, RgbImage};
use ndarray::{Array2, Array3};

/// Rec. 601 luma weights used for every luminance extraction in the pipeline.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert a decoded 8-bit RGB bitmap to float planes in `[0, 1]`.
pub fn rgb8_to_f32(bitmap: &RgbImage) -> Result<RgbPlanes> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidShape("zero-area bitmap".to_string()));
    }
    let data: Vec<f32> = bitmap.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    Array3::from_shape_vec((height as usize, width as usize, 3), data)
        .map_err(|e| Error::InvalidShape(format!("bitmap layout: {}", e)))
}

/// Quantize float planes back to an 8-bit RGB bitmap.
///
/// Composed with [`rgb8_to_f32`] this is a contraction to the 8-bit grid:
/// already-quantized values round-trip exactly.
pub fn f32_to_rgb8(rgb: &RgbPlanes) -> Result<RgbImage> {
    let (height, width, channels) = rgb.dim();
    if channels != 3 {
        return Err(Error::InvalidShape(format!(
            "expected 3 channels, got {}",
            channels
        )));
    }
    let data: Vec<u8> = rgb
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| Error::InvalidShape("RGB buffer length mismatch".to_string()))
}

/// Extract linear luminance: `Y = 0.299R + 0.587G + 0.114B`.
pub fn luminance(rgb: &RgbPlanes) -> Plane {
    let (height, width, _) = rgb.dim();
    let mut out = Array2::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            out[(y, x)] = LUMA_R * rgb[(y, x, 0)] + LUMA_G * rgb[(y, x, 1)] + LUMA_B * rgb[(y, x, 2)];
        }
    }
    out
}

/// Lanczos-3 resample of an RGB float image. Fails only on a zero-area target.
pub fn resize_rgb(rgb: &RgbPlanes, width: u32, height: u32) -> Result<RgbPlanes> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidShape("zero-area resize target".to_string()));
    }
    let (src_h, src_w, channels) = rgb.dim();
    if channels != 3 {
        return Err(Error::InvalidShape(format!(
            "expected 3 channels, got {}",
            channels
        )));
    }
    if src_w as u32 == width && src_h as u32 == height {
        return Ok(rgb.clone());
    }

    let raw: Vec<f32> = if let Some(slice) = rgb.as_slice() {
        slice.to_vec()
    } else {
        rgb.iter().copied().collect()
    };
    let buf = Rgb32FImage::from_raw(src_w as u32, src_h as u32, raw)
        .ok_or_else(|| Error::InvalidShape("RGB buffer length mismatch".to_string()))?;

    let resized = image::imageops::resize(&buf, width, height, FilterType::Lanczos3);
    let mut out = Array3::from_shape_vec((height as usize, width as usize, 3), resized.into_raw())
        .map_err(|e| Error::InvalidShape(format!("resized layout: {}", e)))?;
    // Lanczos lobes overshoot; pull samples back into range
    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    Ok(out)
}

/// Lanczos-3 resample of a single float plane.
pub fn resize_plane(plane: &Plane, width: u32, height: u32) -> Result<Plane> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidShape("zero-area resize target".to_string()));
    }
    let (src_h, src_w) = (plane.nrows(), plane.ncols());
    if src_w as u32 == width && src_h as u32 == height {
        return Ok(plane.clone());
    }

    let raw: Vec<f32> = if let Some(slice) = plane.as_slice() {
        slice.to_vec()
    } else {
        plane.iter().copied().collect()
    };
    let buf =
        image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_raw(src_w as u32, src_h as u32, raw)
            .ok_or_else(|| Error::InvalidShape("plane buffer length mismatch".to_string()))?;

    let resized = image::imageops::resize(&buf, width, height, FilterType::Lanczos3);
    let mut out = Array2::from_shape_vec((height as usize, width as usize), resized.into_raw())
        .map_err(|e| Error::InvalidShape(format!("resized layout: {}", e)))?;
    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    Ok(out)
}

/// Quantize a `[0, 1]` plane to 8 bits.
pub fn quantize_u8(plane: &Plane) -> Array2<u8> {
    plane.mapv(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Quantize a `[0, 1]` plane to 16 bits with the linear `[0, 65535]` mapping.
pub fn quantize_u16(plane: &Plane) -> Array2<u16> {
    plane.mapv(|v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
}

/// Reject planes carrying NaN or infinite samples before they reach a kernel.
pub fn ensure_finite(plane: &Plane) -> Result<()> {
    if plane.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numeric("non-finite sample in plane".to_string()));
    }
    Ok(())
}
