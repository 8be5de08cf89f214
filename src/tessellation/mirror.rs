//! Mirror tessellation: edge blending against the wrap-mirrored strip
//!
//! For each edge, the strip just inside the image is blended with its
//! mirror across the tile boundary (which, on the torus, is the strip
//! inside the opposite edge). Both sides of every wrap pair move toward
//! their shared average with a quadratic-ease falloff, meeting exactly
//! at the boundary. Suits symmetric, organic textures.

use super::{wrap_blend_horizontal, wrap_blend_vertical};
use crate::types::{Plane, Result};

pub fn mirror_blend(plane: &Plane, blend_width: u32) -> Result<Plane> {
    let mut out = plane.clone();
    let band = blend_width as usize;
    wrap_blend_horizontal(&mut out, band);
    wrap_blend_vertical(&mut out, band);
    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    Ok(out)
}
