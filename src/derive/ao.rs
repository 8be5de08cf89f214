//! Ambient occlusion derivation
//!
//! Three height-driven signals combine into the occlusion estimate:
//! cavity AO (blur-minus-height concavity), global AO (multi-scale
//! blur accumulation), and gradient AO (slope shading), weighted
//! 0.4/0.3/0.3 before material post-processing and the occlusion floor.

use super::{DeriveContext, AO_NEUTRAL_STREAM};
use crate::filters::noise::{derive_seed, gaussian_field};
use crate::filters::{gaussian_blur_axis_with, gaussian_blur_with, sobel_xy, BlurAxis, Boundary};
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{MaterialClass, Plane, Result};
use ndarray::Array2;

/// Per-material occlusion tuning; explicit request params override.
struct AoPreset {
    cavity_scale: f32,
    global_scale: f32,
    min_ao: f32,
}

fn preset(material: MaterialClass) -> AoPreset {
    let (cavity_scale, global_scale, min_ao) = match material {
        MaterialClass::Stone => (2.0, 4.0, 0.3),
        MaterialClass::Brick => (1.5, 3.0, 0.2),
        MaterialClass::Wood => (1.0, 2.0, 0.5),
        MaterialClass::Metal => (0.5, 1.0, 0.7),
        MaterialClass::Fabric => (0.8, 1.5, 0.6),
        MaterialClass::Concrete => (1.8, 3.5, 0.35),
        MaterialClass::Generic => (1.5, 3.0, 0.4),
    };
    AoPreset {
        cavity_scale,
        global_scale,
        min_ao,
    }
}

const CAVITY_WEIGHT: f32 = 0.4;
const GLOBAL_WEIGHT: f32 = 0.3;
const GRADIENT_WEIGHT: f32 = 0.3;

pub(super) fn derive(ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<Plane> {
    let params = &ctx.params.ao;
    let preset = preset(ctx.material);

    let height = match ctx.height {
        Some(h) => h,
        None => {
            // Upstream never produced a height plane; emit a plausible
            // neutral map instead of failing the whole set
            diag.warn("no height plane available, emitting neutral AO".to_string());
            return Ok(neutral_map(ctx));
        }
    };

    let cavity_scale = params.cavity_scale.unwrap_or(preset.cavity_scale).max(0.1);
    let global_scale = params.global_scale.unwrap_or(preset.global_scale).max(0.1);
    let requested_min = params.min_ao.unwrap_or(preset.min_ao);
    let min_ao = requested_min.clamp(0.0, 1.0);
    if min_ao != requested_min {
        diag.warn(format!(
            "min AO {} outside [0, 1], clamped to {}",
            requested_min, min_ao
        ));
    }
    let requested_intensity = params.intensity;
    let intensity = requested_intensity.clamp(0.0, 1.0);
    if intensity != requested_intensity {
        diag.warn(format!(
            "AO intensity {} outside [0, 1], clamped to {}",
            requested_intensity, intensity
        ));
    }

    let boundary = ctx.boundary();
    let cavity = cavity_ao(height, cavity_scale, boundary)?;
    ctx.cancel.check()?;
    let global = global_ao(height, global_scale, boundary, ctx)?;
    let gradient = gradient_ao(height, boundary)?;
    ctx.cancel.check()?;

    let mut ao = Array2::zeros(height.dim());
    ao.assign(&cavity);
    ao.mapv_inplace(|v| v * CAVITY_WEIGHT);
    ao.zip_mut_with(&global, |a, &g| *a += g * GLOBAL_WEIGHT);
    ao.zip_mut_with(&gradient, |a, &g| *a += g * GRADIENT_WEIGHT);

    apply_material_post(&mut ao, ctx.material, boundary)?;

    // Blend toward white by intensity, then enforce the occlusion floor
    ao.mapv_inplace(|v| {
        let shaped = 1.0 - (1.0 - v) * intensity;
        (shaped * (1.0 - min_ao) + min_ao).clamp(0.0, 1.0)
    });
    Ok(ao)
}

/// Concavity signal: places sitting below their blurred surroundings.
fn cavity_ao(height: &Plane, scale: f32, boundary: Boundary) -> Result<Plane> {
    let blurred = gaussian_blur_with(height, scale, boundary)?;
    let mut cavity = blurred;
    cavity.zip_mut_with(height, |b, &h| {
        let depth = (*b - h).max(0.0);
        *b = (1.0 - depth * 10.0).clamp(0.0, 1.0);
    });
    Ok(cavity)
}

/// Large-feature shading: three blur-and-blend passes at doubling
/// scales, then a gamma lift.
fn global_ao(height: &Plane, scale: f32, boundary: Boundary, ctx: &DeriveContext) -> Result<Plane> {
    let mut acc = height.clone();
    for pass in 0..3 {
        ctx.cancel.check()?;
        let sigma = scale * (1 << pass) as f32;
        let blurred = gaussian_blur_with(&acc, sigma, boundary)?;
        acc.zip_mut_with(&blurred, |a, &b| *a = 0.5 * *a + 0.5 * b);
    }
    acc.mapv_inplace(|v| v.max(0.0).powf(1.5));
    Ok(acc)
}

/// Slope shading: steep gradients read as occluded.
fn gradient_ao(height: &Plane, boundary: Boundary) -> Result<Plane> {
    let (gx, gy) = sobel_xy(height)?;
    let mut magnitude = gx;
    magnitude.zip_mut_with(&gy, |x, &y| *x = (*x * *x + y * y).sqrt());

    let max_magnitude = magnitude.iter().cloned().fold(0.0f32, f32::max) + 1e-6;
    magnitude.mapv_inplace(|m| 1.0 - 0.5 * (m / max_magnitude));
    gaussian_blur_with(&magnitude, 1.0, boundary)
}

fn apply_material_post(ao: &mut Plane, material: MaterialClass, boundary: Boundary) -> Result<()> {
    match material {
        MaterialClass::Stone | MaterialClass::Brick => {
            // Deepen crevices that are already dark
            ao.mapv_inplace(|v| if v < 0.3 { v * 0.8 } else { v });
        }
        MaterialClass::Wood => {
            let softened = gaussian_blur_axis_with(ao, 2.0, BlurAxis::Horizontal, boundary)?;
            ao.zip_mut_with(&softened, |a, &s| *a = 0.7 * *a + 0.3 * s);
        }
        MaterialClass::Fabric => {
            let (rows, cols) = ao.dim();
            for y in 0..rows {
                for x in 0..cols {
                    let weave = 0.05
                        * ((std::f32::consts::PI * x as f32 / 4.0).sin()
                            + (std::f32::consts::PI * y as f32 / 4.0).sin());
                    ao[(y, x)] = (ao[(y, x)] - weave).clamp(0.0, 1.0);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Fallback plane for runs where no height data exists: almost fully
/// lit with light Gaussian grain.
fn neutral_map(ctx: &DeriveContext) -> Plane {
    let (rows, cols) = (ctx.diffuse.dim().0, ctx.diffuse.dim().1);
    let mut ao = Array2::from_elem((rows, cols), 0.9f32);
    let grain = gaussian_field(cols, rows, 0.01, derive_seed(ctx.seed, AO_NEUTRAL_STREAM));
    ao.zip_mut_with(&grain, |a, &g| *a = (*a + g).clamp(0.0, 1.0));
    ao
}
