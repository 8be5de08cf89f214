//! Roughness derivation (luminance remap with material presets)

use super::{DeriveContext, ROUGHNESS_NOISE_STREAM};
use crate::filters::noise::{derive_seed, uniform_field};
use crate::filters::{gaussian_blur_axis_with, rotate, BlurAxis, Boundary};
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{MaterialClass, Plane, Result};

/// Per-material remap defaults; explicit request params override.
struct RoughnessPreset {
    base: f32,
    contrast: f32,
    invert: bool,
}

fn preset(material: MaterialClass) -> RoughnessPreset {
    let (base, contrast, invert) = match material {
        MaterialClass::Stone => (0.8, 0.3, false),
        MaterialClass::Brick => (0.85, 0.25, false),
        MaterialClass::Wood => (0.7, 0.4, false),
        MaterialClass::Metal => (0.3, 0.5, true),
        MaterialClass::Fabric => (0.9, 0.2, false),
        MaterialClass::Concrete => (0.75, 0.35, false),
        MaterialClass::Generic => (0.5, 0.3, false),
    };
    RoughnessPreset { base, contrast, invert }
}

/// Floor applied to metals so they never read as perfect mirrors.
const METAL_FLOOR: f32 = 0.15;

/// Angles within this many degrees of an axis use the cheap 1-D blur
/// instead of the rotate-blur-rotate path.
const AXIS_SNAP_DEG: f32 = 0.5;

pub(super) fn derive(ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<Plane> {
    let params = &ctx.params.roughness;
    let preset = preset(ctx.material);

    let requested_base = params.base_value.unwrap_or(preset.base);
    let base = requested_base.clamp(0.0, 1.0);
    if base != requested_base {
        diag.warn(format!(
            "roughness base {} outside [0, 1], clamped to {}",
            requested_base, base
        ));
    }
    let invert = params.invert.unwrap_or(preset.invert);
    let sign = if invert { -1.0 } else { 1.0 };

    let luminance = ctx.height_plane();
    let mut roughness =
        luminance.mapv(|l| (base + preset.contrast * (l - 0.5) * sign).clamp(0.0, 1.0));

    // Wood: soften cross-grain noise along the grain axis
    if ctx.material == MaterialClass::Wood {
        let softened = gaussian_blur_axis_with(&roughness, 2.0, BlurAxis::Horizontal, ctx.boundary())?;
        roughness.zip_mut_with(&softened, |r, &s| *r = 0.7 * *r + 0.3 * s);
    }

    if ctx.material == MaterialClass::Metal {
        roughness.mapv_inplace(|v| v.max(METAL_FLOOR));
    }

    if params.directional {
        ctx.cancel.check()?;
        let streaked = directional_streaks(&roughness, params.direction_angle_deg, ctx.boundary())?;
        roughness.zip_mut_with(&streaked, |r, &s| *r = 0.5 * *r + 0.5 * s);
    }

    // Micro-variation noise
    let amplitude = params.variation.max(0.0);
    if amplitude > 0.0 {
        let (rows, cols) = roughness.dim();
        let noise = uniform_field(cols, rows, amplitude, derive_seed(ctx.seed, ROUGHNESS_NOISE_STREAM));
        roughness.zip_mut_with(&noise, |r, &n| *r = (*r + n).clamp(0.0, 1.0));
    }

    Ok(roughness)
}

/// True when the streak direction coincides with an image axis.
pub(crate) fn is_axis_aligned(angle_deg: f32) -> bool {
    let a = angle_deg.rem_euclid(90.0);
    a < AXIS_SNAP_DEG || a > 90.0 - AXIS_SNAP_DEG
}

/// Brushed-surface streaks: a 1-D blur along the requested direction.
/// Axis-aligned angles blur in place; anything else goes through
/// rotate, blur, rotate back.
fn directional_streaks(plane: &Plane, angle_deg: f32, boundary: Boundary) -> Result<Plane> {
    let (rows, cols) = plane.dim();
    let sigma = (rows.min(cols) as f32 / 256.0).max(1.0);

    if is_axis_aligned(angle_deg) {
        let folded = angle_deg.rem_euclid(180.0);
        let axis = if folded < 45.0 || folded > 135.0 {
            BlurAxis::Horizontal
        } else {
            BlurAxis::Vertical
        };
        return gaussian_blur_axis_with(plane, sigma, axis, boundary);
    }

    let rotated = rotate(plane, -angle_deg)?;
    let blurred = gaussian_blur_axis_with(&rotated, sigma, BlurAxis::Horizontal, Boundary::Replicate)?;
    rotate(&blurred, angle_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diagnostics::CancelToken;
    use crate::types::{DerivationParams, RoughnessParams};
    use ndarray::Array3;

    fn run(material: MaterialClass, diffuse_value: f32, params: RoughnessParams) -> Plane {
        let diffuse = Array3::from_elem((32, 32, 3), diffuse_value);
        let mut all = DerivationParams::default();
        all.roughness = params;
        let cancel = CancelToken::new();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material,
            params: &all,
            seed: 7,
            wrap: false,
            cancel: &cancel,
        };
        let mut diag = Diagnostics::new();
        derive(&ctx, &mut diag).unwrap()
    }

    #[test]
    fn test_uniform_diffuse_hits_base_within_variation() {
        let params = RoughnessParams::default();
        let variation = params.variation;
        let out = run(MaterialClass::Brick, 0.5, params);
        for &v in out.iter() {
            // L = 0.5 cancels the contrast term, leaving base plus noise
            assert!((v - 0.85).abs() <= variation + 1e-4, "value {}", v);
        }
    }

    #[test]
    fn test_invert_reverses_mapping() {
        let bright = run(
            MaterialClass::Stone,
            0.9,
            RoughnessParams {
                variation: 0.0,
                ..RoughnessParams::default()
            },
        );
        let inverted = run(
            MaterialClass::Stone,
            0.9,
            RoughnessParams {
                invert: Some(true),
                variation: 0.0,
                ..RoughnessParams::default()
            },
        );
        assert!(bright[(16, 16)] > inverted[(16, 16)]);
    }

    #[test]
    fn test_metal_floor_applies() {
        // Metal preset inverts: bright luminance maps toward smooth, but
        // never below the floor
        let out = run(
            MaterialClass::Metal,
            1.0,
            RoughnessParams {
                variation: 0.0,
                ..RoughnessParams::default()
            },
        );
        for &v in out.iter() {
            assert!(v >= METAL_FLOOR - 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_base_warns() {
        let diffuse = Array3::from_elem((16, 16, 3), 0.5f32);
        let mut all = DerivationParams::default();
        all.roughness.base_value = Some(1.8);
        let cancel = CancelToken::new();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material: MaterialClass::Generic,
            params: &all,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        let mut diag = Diagnostics::new();
        derive(&ctx, &mut diag).unwrap();
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn test_axis_alignment_detection() {
        assert!(is_axis_aligned(0.0));
        assert!(is_axis_aligned(90.0));
        assert!(is_axis_aligned(180.0));
        assert!(is_axis_aligned(270.0));
        assert!(is_axis_aligned(-90.0));
        assert!(!is_axis_aligned(30.0));
        assert!(!is_axis_aligned(45.0));
    }

    #[test]
    fn test_directional_vertical_raises_vertical_correlation() {
        // Alternating columns of noise-free contrast: vertical streaks
        // should leave columns intact and horizontal blur would not
        let diffuse = Array3::from_shape_fn((64, 64, 3), |(y, _, _)| if y % 2 == 0 { 0.8 } else { 0.2 });
        let mut all = DerivationParams::default();
        all.roughness = RoughnessParams {
            directional: true,
            direction_angle_deg: 90.0,
            variation: 0.0,
            ..RoughnessParams::default()
        };
        let cancel = CancelToken::new();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material: MaterialClass::Metal,
            params: &all,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        let mut diag = Diagnostics::new();
        let out = derive(&ctx, &mut diag).unwrap();

        // Row-to-row contrast collapses under the vertical blur
        let non_directional = {
            all.roughness.directional = false;
            let ctx = DeriveContext {
                diffuse: &diffuse,
                height: None,
                material: MaterialClass::Metal,
                params: &all,
                seed: 0,
                wrap: false,
                cancel: &cancel,
            };
            derive(&ctx, &mut Diagnostics::new()).unwrap()
        };
        let contrast = |p: &Plane| {
            let mut acc = 0.0f32;
            for y in 1..63 {
                acc += (p[(y, 32)] - p[(y - 1, 32)]).abs();
            }
            acc
        };
        assert!(contrast(&out) < contrast(&non_directional));
    }
}
