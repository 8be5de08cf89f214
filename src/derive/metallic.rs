//! Metallic derivation
//!
//! Most surfaces are either metal or not, so the default output is a
//! uniform plane at the preset value. A positive threshold switches to
//! luminance mask detection for mixed materials, despeckled with a
//! 1-pixel morphological open.

use super::{DeriveContext, METALLIC_NOISE_STREAM};
use crate::filters::noise::{derive_seed, uniform_field};
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{MaterialClass, Plane, Result};
use ndarray::Array2;

fn preset_base(material: MaterialClass) -> f32 {
    match material {
        MaterialClass::Metal => 1.0,
        _ => 0.0,
    }
}

pub(super) fn derive(ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<Plane> {
    let params = &ctx.params.metallic;

    let requested_base = params.base_value.unwrap_or_else(|| preset_base(ctx.material));
    let base = requested_base.clamp(0.0, 1.0);
    if base != requested_base {
        diag.warn(format!(
            "metallic base {} outside [0, 1], clamped to {}",
            requested_base, base
        ));
    }

    // threshold == 0 skips detection entirely and emits a uniform plane
    if params.threshold > 0.0 {
        let luminance = ctx.height_plane();
        let mask = luminance.mapv(|l| if l > params.threshold { 1.0 } else { 0.0 });
        return Ok(morphological_open(&mask));
    }

    let (rows, cols) = (ctx.diffuse.dim().0, ctx.diffuse.dim().1);
    let mut metallic = Array2::from_elem((rows, cols), base);
    let amplitude = params.variation.max(0.0);
    if amplitude > 0.0 {
        let noise = uniform_field(cols, rows, amplitude, derive_seed(ctx.seed, METALLIC_NOISE_STREAM));
        metallic.zip_mut_with(&noise, |m, &n| *m = (*m + n).clamp(0.0, 1.0));
    }
    Ok(metallic)
}

/// 3x3 erode then dilate, edge replicated. Removes isolated speckle
/// from the threshold mask without shrinking solid regions.
fn morphological_open(mask: &Plane) -> Plane {
    let eroded = neighborhood_reduce(mask, f32::min);
    neighborhood_reduce(&eroded, f32::max)
}

fn neighborhood_reduce(plane: &Plane, reduce: fn(f32, f32) -> f32) -> Plane {
    let (rows, cols) = plane.dim();
    Array2::from_shape_fn((rows, cols), |(y, x)| {
        let mut acc = plane[(y, x)];
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sy = (y as i64 + dy).clamp(0, rows as i64 - 1) as usize;
                let sx = (x as i64 + dx).clamp(0, cols as i64 - 1) as usize;
                acc = reduce(acc, plane[(sy, sx)]);
            }
        }
        acc
    })
}
