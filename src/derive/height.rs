//! Height map derivation (luminance with S-curve contrast)
//!
//! The height sample is a monotone function of diffuse luminance, so
//! brighter always means higher. Bit depth only matters at write time;
//! the plane here stays float.

use super::DeriveContext;
use crate::filters::gaussian_blur_with;
use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{Plane, Result};

const DEPTH_SCALE_MAX: f32 = 10.0;

pub(super) fn derive(ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<Plane> {
    let params = &ctx.params.height;

    let requested = params.depth_scale;
    let depth_scale = requested.clamp(0.0, DEPTH_SCALE_MAX);
    if depth_scale != requested {
        diag.warn(format!(
            "height depth scale {} outside [0, {}], clamped to {}",
            requested, DEPTH_SCALE_MAX, depth_scale
        ));
    }
    if params.bit_depth != 8 && params.bit_depth != 16 {
        diag.warn(format!(
            "height bit depth {} unsupported, writer will fall back to 8",
            params.bit_depth
        ));
    }

    let height = ctx.height_plane();
    let mut out = height.mapv(|v| (0.5 + depth_scale * (v - 0.5)).clamp(0.0, 1.0));

    if params.blur_radius > 0 {
        ctx.cancel.check()?;
        out = gaussian_blur_with(&out, params.blur_radius as f32, ctx.boundary())?;
    }
    Ok(out)
}
