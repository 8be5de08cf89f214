//! Diffuse intake
//!
//! Normalizes whatever the provider returned into the canonical diffuse
//! master: f32 RGB planes at the requested resolution. Decoding already
//! lands in 8-bit sRGB, so normalization here is dimension handling.

use crate::buffer;
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{Resolution, Result, RgbPlanes};
use image::RgbImage;

/// Convert a provider bitmap to the float diffuse master, resampling
/// (Lanczos-3) when the provider took liberties with the dimensions.
pub fn normalize(bitmap: RgbImage, target: Resolution, diag: &mut Diagnostics) -> Result<RgbPlanes> {
    let (width, height) = bitmap.dimensions();
    let planes = buffer::rgb8_to_f32(&bitmap)?;
    if width != target.width || height != target.height {
        diag.warn(format!(
            "provider returned {}x{}, resampling to {}",
            width, height, target
        ));
        return buffer::resize_rgb(&planes, target.width, target.height);
    }
    Ok(planes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_exact_size_passthrough() {
        let mut bitmap = RgbImage::new(32, 32);
        bitmap.put_pixel(3, 4, Rgb([255, 128, 0]));
        let mut diag = Diagnostics::new();
        let planes = normalize(bitmap, Resolution::new(32, 32), &mut diag).unwrap();
        assert_eq!(planes.dim(), (32, 32, 3));
        assert!(diag.warnings().is_empty());
        assert!((planes[(4, 3, 0)] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_size_resamples_with_warning() {
        let bitmap = RgbImage::new(100, 60);
        let mut diag = Diagnostics::new();
        let planes = normalize(bitmap, Resolution::new(64, 64), &mut diag).unwrap();
        assert_eq!(planes.dim(), (64, 64, 3));
        assert_eq!(diag.warnings().len(), 1);
    }
}
