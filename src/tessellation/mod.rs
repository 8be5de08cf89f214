//! Seamless tiling engine
//!
//! Three algorithms turn an arbitrary image into one that tiles on the
//! torus: `offset` (quadrant swap plus cross-fade), `mirror` (edge
//! blending against the wrap-mirrored strip), and `frequency`
//! (windowed FFT high-pass). All of them finish with a symmetric wrap
//! equalization pass, so opposite edges agree to well under the 1/255
//! validator tolerance regardless of content.

pub mod frequency;
pub mod mirror;
pub mod offset;

use crate::buffer;
use crate::pipeline::diagnostics::{CancelToken, Diagnostics};
use crate::types::{Error, Plane, Result, RgbPlanes, TessAlgorithm, TessellationParams};
use ndarray::{Array2, Array3};

/// Maximum wrap edge delta (linear luminance) for an image to count as
/// seamless, matching one 8-bit quantization step.
pub const EDGE_TOLERANCE: f32 = 1.0 / 255.0;

/// Hard lower bound on the blend band width.
const MIN_BLEND_WIDTH: u32 = 8;

/// Resolve the blend band width for a `width x height` image, clamping
/// out-of-range values with a warning. Default is `max(16, min(w,h)/32)`.
pub fn resolve_blend_width(
    params: &TessellationParams,
    width: u32,
    height: u32,
    diag: &mut Diagnostics,
) -> u32 {
    let min_side = width.min(height);
    let max_width = (min_side / 2).max(1);
    let min_width = MIN_BLEND_WIDTH.min(max_width);
    let requested = params
        .blend_width
        .unwrap_or_else(|| (min_side / 32).max(16))
        .max(1);

    let clamped = requested.clamp(min_width, max_width);
    if params.blend_width.is_some() && clamped != requested {
        diag.warn(format!(
            "blend width {} out of range for {}x{}, clamped to {}",
            requested, width, height, clamped
        ));
    }
    clamped
}

/// Make a single plane seamlessly tileable.
pub fn make_seamless_plane(
    plane: &Plane,
    params: &TessellationParams,
    cancel: &CancelToken,
    diag: &mut Diagnostics,
) -> Result<Plane> {
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area plane".to_string()));
    }
    let blend_width = resolve_blend_width(params, width as u32, height as u32, diag);
    apply_plane(plane, params.algorithm, blend_width, params.corner_blend, cancel)
}

/// Make an RGB image seamlessly tileable; channels share one resolved
/// blend width so they stay aligned.
pub fn make_seamless_rgb(
    rgb: &RgbPlanes,
    params: &TessellationParams,
    cancel: &CancelToken,
    diag: &mut Diagnostics,
) -> Result<RgbPlanes> {
    let (height, width, channels) = rgb.dim();
    if height == 0 || width == 0 {
        return Err(Error::InvalidShape("zero-area image".to_string()));
    }
    let blend_width = resolve_blend_width(params, width as u32, height as u32, diag);

    let mut out = Array3::zeros((height, width, channels));
    for c in 0..channels {
        cancel.check()?;
        let channel = Array2::from_shape_fn((height, width), |(y, x)| rgb[(y, x, c)]);
        let seamless = apply_plane(&channel, params.algorithm, blend_width, params.corner_blend, cancel)?;
        for y in 0..height {
            for x in 0..width {
                out[(y, x, c)] = seamless[(y, x)];
            }
        }
    }
    Ok(out)
}

fn apply_plane(
    plane: &Plane,
    algorithm: TessAlgorithm,
    blend_width: u32,
    corner: bool,
    cancel: &CancelToken,
) -> Result<Plane> {
    let mut out = match algorithm {
        TessAlgorithm::Offset => offset::offset_blend(plane, blend_width, cancel)?,
        TessAlgorithm::Mirror => mirror::mirror_blend(plane, blend_width)?,
        TessAlgorithm::Frequency => frequency::frequency_blend(plane, cancel)?,
    };
    if corner {
        corner_blend(&mut out, ((blend_width / 2).max(2)) as usize);
    }
    Ok(out)
}

/// Check how well an image tiles: returns `(is_seamless, max_edge_delta)`
/// where the delta is measured in linear luminance over the wrap-adjacent
/// edge rows, edge columns, and the four corners.
pub fn validate_tiling_rgb(rgb: &RgbPlanes) -> (bool, f32) {
    validate_tiling_plane(&buffer::luminance(rgb))
}

/// Plane variant of [`validate_tiling_rgb`].
pub fn validate_tiling_plane(plane: &Plane) -> (bool, f32) {
    let (height, width) = (plane.nrows(), plane.ncols());
    if height == 0 || width == 0 {
        return (false, f32::INFINITY);
    }

    let mut max_delta = 0.0f32;
    for y in 0..height {
        max_delta = max_delta.max((plane[(y, 0)] - plane[(y, width - 1)]).abs());
    }
    for x in 0..width {
        max_delta = max_delta.max((plane[(0, x)] - plane[(height - 1, x)]).abs());
    }

    // 4-corner cross-delta: all four must agree when tiled
    let corners = [
        plane[(0, 0)],
        plane[(0, width - 1)],
        plane[(height - 1, 0)],
        plane[(height - 1, width - 1)],
    ];
    for i in 0..corners.len() {
        for j in (i + 1)..corners.len() {
            max_delta = max_delta.max((corners[i] - corners[j]).abs());
        }
    }

    (max_delta <= EDGE_TOLERANCE, max_delta)
}

/// Smoothstep easing used by every blend mask in the engine.
pub(crate) fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Symmetric wrap equalization along the horizontal axis: each column
/// pair `(i, w-1-i)` inside the band is pulled toward its shared
/// average, fully at the edge and not at all at the band's inner rim.
/// Guarantees `out[y][0] == out[y][w-1]` exactly.
pub(crate) fn wrap_blend_horizontal(plane: &mut Plane, band: usize) {
    let (height, width) = (plane.nrows(), plane.ncols());
    let band = band.min(width / 2).max(1);
    for y in 0..height {
        for i in 0..band {
            let t = i as f32 / band as f32;
            let keep = 0.5 + 0.5 * smoothstep(t);
            let left = plane[(y, i)];
            let right = plane[(y, width - 1 - i)];
            plane[(y, i)] = keep * left + (1.0 - keep) * right;
            plane[(y, width - 1 - i)] = keep * right + (1.0 - keep) * left;
        }
    }
}

/// Vertical counterpart of [`wrap_blend_horizontal`].
pub(crate) fn wrap_blend_vertical(plane: &mut Plane, band: usize) {
    let (height, width) = (plane.nrows(), plane.ncols());
    let band = band.min(height / 2).max(1);
    for i in 0..band {
        let t = i as f32 / band as f32;
        let keep = 0.5 + 0.5 * smoothstep(t);
        for x in 0..width {
            let top = plane[(i, x)];
            let bottom = plane[(height - 1 - i, x)];
            plane[(i, x)] = keep * top + (1.0 - keep) * bottom;
            plane[(height - 1 - i, x)] = keep * bottom + (1.0 - keep) * top;
        }
    }
}

/// Pull the four corner neighborhoods toward their common toroidal
/// average so the corner cross region reads as one continuous patch.
pub(crate) fn corner_blend(plane: &mut Plane, radius: usize) {
    let (height, width) = (plane.nrows(), plane.ncols());
    let radius = radius.min(width / 2).min(height / 2).max(1);

    for dy in 0..radius {
        for dx in 0..radius {
            let positions = [
                (dy, dx),
                (dy, width - 1 - dx),
                (height - 1 - dy, dx),
                (height - 1 - dy, width - 1 - dx),
            ];
            let avg = positions.iter().map(|&p| plane[p]).sum::<f32>() / 4.0;
            let t = dx.max(dy) as f32 / radius as f32;
            let weight = smoothstep(1.0 - t);
            for &p in &positions {
                plane[p] = plane[p] * (1.0 - weight) + avg * weight;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::TessellationParams;

    /// Checkerboard with the given cell size, guaranteed hard seams.
    pub(crate) fn checkerboard(width: usize, height: usize, cell: usize) -> Plane {
        Array2::from_shape_fn((height, width), |(y, x)| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                0.9
            } else {
                0.1
            }
        })
    }

    fn params(algorithm: TessAlgorithm, blend_width: u32) -> TessellationParams {
        TessellationParams {
            algorithm,
            blend_width: Some(blend_width),
            corner_blend: true,
        }
    }

    #[test]
    fn test_validator_flags_checkerboard() {
        // 3 cells across: opposite edges land on opposite phases
        let board = checkerboard(48, 48, 16);
        let (seamless, delta) = validate_tiling_plane(&board);
        assert!(!seamless);
        assert!(delta > 0.5);
    }

    #[test]
    fn test_validator_accepts_constant() {
        let flat = Array2::from_elem((32, 32), 0.42f32);
        let (seamless, delta) = validate_tiling_plane(&flat);
        assert!(seamless);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_all_algorithms_meet_tolerance() {
        let board = checkerboard(64, 64, 8);
        let cancel = CancelToken::new();
        for algorithm in [
            TessAlgorithm::Offset,
            TessAlgorithm::Mirror,
            TessAlgorithm::Frequency,
        ] {
            let mut diag = Diagnostics::new();
            let result =
                make_seamless_plane(&board, &params(algorithm, 16), &cancel, &mut diag).unwrap();
            let (seamless, delta) = validate_tiling_plane(&result);
            assert!(
                seamless,
                "{} left edge delta {}",
                algorithm.as_str(),
                delta
            );
        }
    }

    #[test]
    fn test_non_square_meets_tolerance() {
        let board = checkerboard(96, 48, 8);
        let cancel = CancelToken::new();
        for algorithm in [TessAlgorithm::Offset, TessAlgorithm::Mirror, TessAlgorithm::Frequency] {
            let mut diag = Diagnostics::new();
            let result =
                make_seamless_plane(&board, &params(algorithm, 12), &cancel, &mut diag).unwrap();
            let (seamless, delta) = validate_tiling_plane(&result);
            assert!(seamless, "{} delta {}", algorithm.as_str(), delta);
            assert_eq!(result.dim(), (48, 96));
        }
    }

    #[test]
    fn test_blend_width_default_rule() {
        let mut diag = Diagnostics::new();
        let p = TessellationParams {
            algorithm: TessAlgorithm::Offset,
            blend_width: None,
            corner_blend: false,
        };
        // 1024 / 32 = 32
        assert_eq!(resolve_blend_width(&p, 1024, 1024, &mut diag), 32);
        // small image: floor of 16 applies until the half-size cap bites
        assert_eq!(resolve_blend_width(&p, 256, 256, &mut diag), 16);
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn test_blend_width_clamps_with_warning() {
        let mut diag = Diagnostics::new();
        let p = TessellationParams {
            algorithm: TessAlgorithm::Offset,
            blend_width: Some(4096),
            corner_blend: false,
        };
        assert_eq!(resolve_blend_width(&p, 128, 128, &mut diag), 64);
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn test_degenerate_full_band_still_valid() {
        // blend_width == min(w,h)/2 degenerates to a full-image blend
        let board = checkerboard(32, 32, 4);
        let cancel = CancelToken::new();
        let mut diag = Diagnostics::new();
        let result =
            make_seamless_plane(&board, &params(TessAlgorithm::Mirror, 16), &cancel, &mut diag)
                .unwrap();
        let (seamless, _) = validate_tiling_plane(&result);
        assert!(seamless);
        assert!(result.iter().all(|v| v.is_finite() && *v >= 0.0 && *v <= 1.0));
    }

    #[test]
    fn test_reapplication_keeps_edges() {
        let board = checkerboard(64, 64, 8);
        let cancel = CancelToken::new();
        let mut diag = Diagnostics::new();
        let p = params(TessAlgorithm::Mirror, 16);
        let once = make_seamless_plane(&board, &p, &cancel, &mut diag).unwrap();
        let twice = make_seamless_plane(&once, &p, &cancel, &mut diag).unwrap();

        let (seamless, _) = validate_tiling_plane(&twice);
        assert!(seamless);
        // Matched wrap edges are a fixed point of the equalization
        let (h, w) = (once.nrows(), once.ncols());
        for y in 0..h {
            assert!((once[(y, 0)] - twice[(y, 0)]).abs() < 1e-6);
            assert!((once[(y, w - 1)] - twice[(y, w - 1)]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rgb_channels_stay_aligned() {
        let board = checkerboard(32, 32, 4);
        let mut rgb = Array3::zeros((32, 32, 3));
        for y in 0..32 {
            for x in 0..32 {
                for c in 0..3 {
                    rgb[(y, x, c)] = board[(y, x)];
                }
            }
        }
        let cancel = CancelToken::new();
        let mut diag = Diagnostics::new();
        let out = make_seamless_rgb(&rgb, &params(TessAlgorithm::Offset, 8), &cancel, &mut diag)
            .unwrap();
        // Identical channels in, identical channels out
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(out[(y, x, 0)], out[(y, x, 1)]);
                assert_eq!(out[(y, x, 1)], out[(y, x, 2)]);
            }
        }
        let (seamless, _) = validate_tiling_rgb(&out);
        assert!(seamless);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let board = checkerboard(32, 32, 4);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut diag = Diagnostics::new();
        let result = make_seamless_plane(&board, &params(TessAlgorithm::Frequency, 8), &cancel, &mut diag);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
