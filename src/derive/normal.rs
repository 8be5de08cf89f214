//! Normal map derivation (height -> tangent-space normals)
//!
//! Sobel gradients of the height plane become the XY components of a
//! unit normal, encoded into RGB with the OpenGL +Y-up convention.

use super::DeriveContext;
use crate::filters::{gaussian_blur_with, sobel_xy};
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{Result, RgbPlanes};
use ndarray::Array3;

const STRENGTH_MIN: f32 = 0.1;
const STRENGTH_MAX: f32 = 5.0;

pub(super) fn derive(ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<RgbPlanes> {
    let params = &ctx.params.normal;

    let requested = params.strength.unwrap_or(1.0);
    let strength = requested.clamp(STRENGTH_MIN, STRENGTH_MAX);
    if strength != requested {
        diag.warn(format!(
            "normal strength {} outside [{}, {}], clamped to {}",
            requested, STRENGTH_MIN, STRENGTH_MAX, strength
        ));
    }

    let mut height = ctx.height_plane();
    if params.blur_radius > 0 {
        height = gaussian_blur_with(&height, params.blur_radius as f32, ctx.boundary())?;
    }
    ctx.cancel.check()?;

    let (gx, gy) = sobel_xy(&height)?;

    // N = normalize((-gx*s, -gy*s, 1)); inverting the height convention
    // flips the gradient sign
    let sign = if params.invert_height { strength } else { -strength };
    let (rows, cols) = (height.nrows(), height.ncols());
    let mut out = Array3::zeros((rows, cols, 3));
    for y in 0..rows {
        for x in 0..cols {
            let nx = gx[(y, x)] * sign;
            let ny = gy[(y, x)] * sign;
            let magnitude = (nx * nx + ny * ny + 1.0).sqrt();
            out[(y, x, 0)] = (nx / magnitude + 1.0) * 0.5;
            out[(y, x, 1)] = (ny / magnitude + 1.0) * 0.5;
            out[(y, x, 2)] = (1.0 / magnitude + 1.0) * 0.5;
        }
    }
    Ok(out)
}

/// Renormalize encoded normals after an operation (like re-tessellation)
/// that blends them channel-wise.
pub fn renormalize(normal: &mut RgbPlanes) {
    let (rows, cols, _) = normal.dim();
    for y in 0..rows {
        for x in 0..cols {
            let nx = normal[(y, x, 0)] * 2.0 - 1.0;
            let ny = normal[(y, x, 1)] * 2.0 - 1.0;
            let nz = (normal[(y, x, 2)] * 2.0 - 1.0).max(1e-4);
            let magnitude = (nx * nx + ny * ny + nz * nz).sqrt().max(1e-6);
            normal[(y, x, 0)] = (nx / magnitude + 1.0) * 0.5;
            normal[(y, x, 1)] = (ny / magnitude + 1.0) * 0.5;
            normal[(y, x, 2)] = (nz / magnitude + 1.0) * 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diagnostics::CancelToken;
    use crate::types::{DerivationParams, MaterialClass, NormalParams};
    use ndarray::{Array2, Array3};

    fn run(height: Array2<f32>, params: NormalParams) -> (RgbPlanes, Diagnostics) {
        let (rows, cols) = height.dim();
        let diffuse = Array3::zeros((rows, cols, 3));
        let mut all = DerivationParams::default();
        all.normal = params;
        let cancel = CancelToken::new();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: Some(&height),
            material: MaterialClass::Generic,
            params: &all,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        let mut diag = Diagnostics::new();
        let out = derive(&ctx, &mut diag).unwrap();
        (out, diag)
    }

    fn decoded_norm(map: &RgbPlanes, y: usize, x: usize) -> f32 {
        let nx = map[(y, x, 0)] * 2.0 - 1.0;
        let ny = map[(y, x, 1)] * 2.0 - 1.0;
        let nz = map[(y, x, 2)] * 2.0 - 1.0;
        (nx * nx + ny * ny + nz * nz).sqrt()
    }

    #[test]
    fn test_flat_height_gives_neutral_normal() {
        let height = Array2::from_elem((16, 16), 0.5f32);
        let (out, _) = run(height, NormalParams::default());
        for y in 0..16 {
            for x in 0..16 {
                assert!((out[(y, x, 0)] - 0.5).abs() < 1e-6);
                assert!((out[(y, x, 1)] - 0.5).abs() < 1e-6);
                assert!((out[(y, x, 2)] - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let height = Array2::from_shape_fn((24, 24), |(y, x)| {
            ((x as f32 * 0.7).sin() * (y as f32 * 0.5).cos()) * 0.5 + 0.5
        });
        let (out, _) = run(
            height,
            NormalParams {
                strength: Some(2.0),
                ..NormalParams::default()
            },
        );
        for y in 0..24 {
            for x in 0..24 {
                let n = decoded_norm(&out, y, x);
                assert!((n - 1.0).abs() < 1e-3, "norm {} at ({}, {})", n, y, x);
            }
        }
    }

    #[test]
    fn test_ramp_tilts_against_gradient() {
        // Height rising to the right: normal X points left, R < 0.5
        let height = Array2::from_shape_fn((8, 8), |(_, x)| x as f32 / 8.0);
        let (out, _) = run(height, NormalParams::default());
        assert!(out[(4, 4, 0)] < 0.5);
        assert!((out[(4, 4, 1)] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_invert_height_flips_tilt() {
        let height = Array2::from_shape_fn((8, 8), |(_, x)| x as f32 / 8.0);
        let (out, _) = run(
            height.clone(),
            NormalParams {
                invert_height: true,
                ..NormalParams::default()
            },
        );
        assert!(out[(4, 4, 0)] > 0.5);
    }

    #[test]
    fn test_out_of_range_strength_warns() {
        let height = Array2::from_elem((8, 8), 0.5f32);
        let (_, diag) = run(
            height,
            NormalParams {
                strength: Some(50.0),
                ..NormalParams::default()
            },
        );
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn test_renormalize_restores_unit_length() {
        let mut map = Array3::from_elem((4, 4, 3), 0.6f32);
        renormalize(&mut map);
        for y in 0..4 {
            for x in 0..4 {
                let n = decoded_norm(&map, y, x);
                assert!((n - 1.0).abs() < 1e-3);
            }
        }
    }
}
