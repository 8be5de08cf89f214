//! Offset tessellation: quadrant swap with feathered cross-fade
//!
//! The diagonal quadrant swap moves the original outer edges to the
//! image center, where the resulting cross seam is hidden by fading
//! back to the untouched original over a band around the seam lines.
//! Suits geometric patterns with repeatable cells.

use super::{smoothstep, wrap_blend_horizontal, wrap_blend_vertical};
use crate::filters::gaussian_blur;
use crate::pipeline::diagnostics::CancelToken;
use crate::types::{Plane, Result};
use ndarray::Array2;

pub fn offset_blend(plane: &Plane, blend_width: u32, cancel: &CancelToken) -> Result<Plane> {
    let (height, width) = (plane.nrows(), plane.ncols());
    let half_h = height / 2;
    let half_w = width / 2;

    // Circular shift by half the image: the old wrap seam now crosses
    // the center, and the new outer edges are contiguous original content.
    let swapped = Array2::from_shape_fn((height, width), |(y, x)| {
        plane[((y + half_h) % height, (x + half_w) % width)]
    });

    cancel.check()?;

    // Cross-fade mask: 1 away from the interior seam cross (keep the
    // swapped image), easing to 0 on the seam lines (keep the original,
    // which is continuous there). Seam lines sit between sample columns
    // half_w-1 / half_w and rows half_h-1 / half_h.
    let half_band = (blend_width as f32 / 2.0).max(1.0);
    let seam_x = half_w as f32 - 0.5;
    let seam_y = half_h as f32 - 0.5;

    let mut out = Array2::zeros((height, width));
    let mut mask = Array2::zeros((height, width));
    for y in 0..height {
        let wy = smoothstep((y as f32 - seam_y).abs() / half_band);
        for x in 0..width {
            let wx = smoothstep((x as f32 - seam_x).abs() / half_band);
            let m = wx * wy;
            mask[(y, x)] = m;
            out[(y, x)] = swapped[(y, x)] * m + plane[(y, x)] * (1.0 - m);
        }
    }

    cancel.check()?;

    // Light smoothing confined to the blend band; the mask is 1 at the
    // outer edges so the wrap content is untouched.
    let sigma = blend_width as f32 / 6.0;
    let blurred = gaussian_blur(&out, sigma)?;
    for y in 0..height {
        for x in 0..width {
            let m = mask[(y, x)];
            out[(y, x)] = out[(y, x)] * m + blurred[(y, x)] * (1.0 - m);
        }
    }

    // Seal the wrap numerically over a narrow band
    let edge_band = ((blend_width / 4).clamp(1, 16)) as usize;
    wrap_blend_horizontal(&mut out, edge_band);
    wrap_blend_vertical(&mut out, edge_band);

    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    Ok(out)
}
