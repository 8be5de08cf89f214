//! Pipeline orchestration
//!
//! Linear state machine: validate, intake, normalize, tessellate,
//! shared height, parallel fan-out, seal. The diffuse master and the
//! height cache are frozen before the fan-out; derivation tasks see
//! identical bytes and run as pure functions, so results are
//! deterministic regardless of join order.

pub mod diagnostics;

use crate::buffer;
use crate::derive::{normal, DeriveContext, DerivedMap, MapDeriver};
use crate::intake;
use crate::provider::{build_prompt, ImageProvider};
use crate::tessellation;
use crate::types::{
    Error, MapKind, PipelineRequest, PipelineResult, PipelineStatus, Plane, Result, RgbPlanes,
    TessellationParams,
};
use self::diagnostics::{CancelToken, Diagnostics};
use rayon::prelude::*;
use std::time::Instant;

/// Progress/timing switches for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print stage progress lines to stdout.
    pub show_progress: bool,
    /// Print per-stage timing.
    pub benchmark: bool,
}

/// Run the full pipeline against a provider.
///
/// Fatal outcomes are `InvalidRequest`, `UpstreamImage`, and `Cancelled`
/// before a diffuse exists. Everything later degrades: failed
/// derivations turn into warnings, and cancellation returns whatever
/// maps finished, marked `PipelineStatus::Cancelled`.
pub fn run(
    provider: &dyn ImageProvider,
    request: &PipelineRequest,
    options: &RunOptions,
    cancel: &CancelToken,
) -> Result<PipelineResult> {
    let start_time = Instant::now();
    let mut diag = Diagnostics::new();

    // Init
    validate_request(request)?;
    cancel.check()?;

    // Intake: the single suspension point on the network
    if options.show_progress {
        println!("Requesting diffuse map ({})...", request.resolution);
    }
    let intake_start = Instant::now();
    let prompt = build_prompt(request);
    let bitmap = provider.generate(
        &prompt,
        request.resolution.width,
        request.resolution.height,
        request.timeout,
    )?;
    if options.benchmark {
        println!("  Intake time: {:.2}s", intake_start.elapsed().as_secs_f32());
    }

    // Normalize to the canonical float master
    let mut diffuse = intake::normalize(bitmap, request.resolution, &mut diag)?;
    if cancel.is_cancelled() {
        return Ok(cancelled_result(diffuse, None, diag));
    }

    // Tessellate
    let mut tiling_delta = None;
    if request.seamless {
        if options.show_progress {
            println!(
                "Making diffuse seamless ({})...",
                request.tessellation.algorithm.as_str()
            );
        }
        let tess_start = Instant::now();
        match tessellation::make_seamless_rgb(&diffuse, &request.tessellation, cancel, &mut diag) {
            Ok(seamless) => diffuse = seamless,
            Err(Error::Cancelled) => return Ok(cancelled_result(diffuse, None, diag)),
            Err(e) => {
                // The raw diffuse is still usable; degrade rather than abort
                diag.warn(format!("tessellation failed ({}), using raw diffuse", e));
            }
        }
        let (is_seamless, delta) = tessellation::validate_tiling_rgb(&diffuse);
        tiling_delta = Some(delta);
        if !is_seamless {
            diag.warn(format!(
                "diffuse edge delta {:.5} exceeds the seamless tolerance",
                delta
            ));
        }
        if options.benchmark {
            println!(
                "  Tessellation time: {:.2}s (edge delta {:.6})",
                tess_start.elapsed().as_secs_f32(),
                delta
            );
        }
    }
    if cancel.is_cancelled() {
        return Ok(cancelled_result(diffuse, tiling_delta, diag));
    }

    // Shared height plane, computed once for C5/C8/C9
    let height_cache = buffer::luminance(&diffuse);

    // Fan-out: one task per requested derived map
    let derivers: Vec<MapDeriver> = MapKind::ALL
        .iter()
        .copied()
        .filter(|kind| request.kinds.contains(kind))
        .filter_map(MapDeriver::for_kind)
        .collect();

    let mut status = PipelineStatus::Complete;
    let mut derived: Vec<(MapDeriver, Option<DerivedMap>)> = Vec::new();

    if !derivers.is_empty() {
        if options.show_progress {
            println!("Deriving {} map(s)...", derivers.len());
        }
        let fanout_start = Instant::now();

        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: Some(&height_cache),
            material: request.material,
            params: &request.derivation,
            seed: request.seed,
            wrap: request.seamless,
            cancel,
        };

        let workers = derivers.len().min(rayon::current_num_threads()).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Numeric(format!("worker pool: {}", e)))?;

        let outcomes: Vec<(MapDeriver, Result<DerivedMap>, Diagnostics)> = pool.install(|| {
            derivers
                .par_iter()
                .map(|&deriver| {
                    let mut task_diag = Diagnostics::new();
                    let outcome = derive_one(deriver, &ctx, request, cancel, &mut task_diag);
                    (deriver, outcome, task_diag)
                })
                .collect()
        });

        // Seal: join in canonical order so warnings are deterministic
        for (deriver, outcome, task_diag) in outcomes {
            diag.absorb(task_diag);
            match outcome {
                Ok(map) => derived.push((deriver, Some(map))),
                Err(Error::Cancelled) => status = PipelineStatus::Cancelled,
                Err(e) => {
                    let error = Error::Derivation {
                        kind: deriver.kind(),
                        message: e.to_string(),
                    };
                    diag.warn(error.to_string());
                }
            }
        }

        if options.benchmark {
            println!("  Fan-out time: {:.2}s", fanout_start.elapsed().as_secs_f32());
        }
    }

    if cancel.is_cancelled() {
        status = PipelineStatus::Cancelled;
    }

    let mut result = PipelineResult {
        status,
        diffuse,
        normal: None,
        roughness: None,
        metallic: None,
        ao: None,
        height: None,
        tiling_delta,
        warnings: Vec::new(),
    };
    for (deriver, map) in derived {
        assign_map(&mut result, deriver, map);
    }
    result.warnings = diag.into_warnings();

    if options.show_progress {
        println!(
            "Generated {} map(s) in {:.2}s",
            result.present_kinds().len(),
            start_time.elapsed().as_secs_f32()
        );
    }
    Ok(result)
}

fn validate_request(request: &PipelineRequest) -> Result<()> {
    request.resolution.validate()?;
    if request.kinds.is_empty() {
        return Err(Error::InvalidRequest(
            "no texture kinds requested".to_string(),
        ));
    }
    Ok(())
}

/// One derivation task: run the kernel, then re-tessellate its output
/// when the kernel chain can re-introduce edge discontinuity.
fn derive_one(
    deriver: MapDeriver,
    ctx: &DeriveContext,
    request: &PipelineRequest,
    cancel: &CancelToken,
    diag: &mut Diagnostics,
) -> Result<DerivedMap> {
    cancel.check()?;
    let map = deriver.derive(ctx, diag)?;
    if request.seamless && !deriver.seamless_preserving(ctx) {
        return retessellate(map, &request.tessellation, cancel, diag);
    }
    Ok(map)
}

fn retessellate(
    map: DerivedMap,
    params: &TessellationParams,
    cancel: &CancelToken,
    diag: &mut Diagnostics,
) -> Result<DerivedMap> {
    match map {
        DerivedMap::Gray(plane) => Ok(DerivedMap::Gray(tessellation::make_seamless_plane(
            &plane, params, cancel, diag,
        )?)),
        DerivedMap::Rgb(rgb) => {
            let mut seamless = tessellation::make_seamless_rgb(&rgb, params, cancel, diag)?;
            // Channel-wise blending denormalizes encoded normals
            normal::renormalize(&mut seamless);
            Ok(DerivedMap::Rgb(seamless))
        }
    }
}

fn assign_map(result: &mut PipelineResult, deriver: MapDeriver, map: Option<DerivedMap>) {
    match (deriver, map) {
        (MapDeriver::Normal, Some(DerivedMap::Rgb(rgb))) => result.normal = Some(rgb),
        (MapDeriver::Roughness, Some(DerivedMap::Gray(plane))) => result.roughness = Some(plane),
        (MapDeriver::Metallic, Some(DerivedMap::Gray(plane))) => result.metallic = Some(plane),
        (MapDeriver::Ao, Some(DerivedMap::Gray(plane))) => result.ao = Some(plane),
        (MapDeriver::Height, Some(DerivedMap::Gray(plane))) => result.height = Some(plane),
        _ => {}
    }
}

fn cancelled_result(
    diffuse: RgbPlanes,
    tiling_delta: Option<f32>,
    diag: Diagnostics,
) -> PipelineResult {
    PipelineResult {
        status: PipelineStatus::Cancelled,
        diffuse,
        normal: None,
        roughness: None,
        metallic: None,
        ao: None,
        height: None,
        tiling_delta,
        warnings: diag.into_warnings(),
    }
}

/// Expose the shared height computation for callers that want to feed
/// derivations directly (tests, alternative front ends).
pub fn shared_height(diffuse: &RgbPlanes) -> Plane {
    buffer::luminance(diffuse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SyntheticProvider;
    use crate::types::{MaterialClass, Resolution};

    fn small_request() -> PipelineRequest {
        let mut request = PipelineRequest::new("stone", Resolution::new(32, 32), MaterialClass::Stone);
        request.seed = 5;
        request
    }

    #[test]
    fn test_empty_kinds_rejected() {
        let mut request = small_request();
        request.kinds.clear();
        let provider = SyntheticProvider::new(1);
        let result = run(&provider, &request, &RunOptions::default(), &CancelToken::new());
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_tiny_resolution_rejected() {
        let mut request = small_request();
        request.resolution = Resolution::new(8, 8);
        let provider = SyntheticProvider::new(1);
        let result = run(&provider, &request, &RunOptions::default(), &CancelToken::new());
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_cancel_before_intake_is_fatal() {
        let request = small_request();
        let provider = SyntheticProvider::new(1);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = run(&provider, &request, &RunOptions::default(), &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_full_small_run() {
        let request = small_request();
        let provider = SyntheticProvider::new(1);
        let result = run(&provider, &request, &RunOptions::default(), &CancelToken::new()).unwrap();
        assert_eq!(result.status, PipelineStatus::Complete);
        assert_eq!(result.diffuse.dim(), (32, 32, 3));
        assert!(result.normal.is_some());
        assert!(result.roughness.is_some());
        assert!(result.metallic.is_some());
        assert!(result.ao.is_some());
        assert!(result.height.is_some());
        assert!(result.tiling_delta.is_some());
    }

    #[test]
    fn test_subset_of_kinds() {
        let mut request = small_request();
        request.kinds = vec![MapKind::Diffuse, MapKind::Normal];
        let provider = SyntheticProvider::new(1);
        let result = run(&provider, &request, &RunOptions::default(), &CancelToken::new()).unwrap();
        assert!(result.normal.is_some());
        assert!(result.roughness.is_none());
        assert!(result.ao.is_none());
    }

    #[test]
    fn test_duplicate_kinds_collapse() {
        let mut request = small_request();
        request.kinds = vec![MapKind::Height, MapKind::Height, MapKind::Diffuse];
        let provider = SyntheticProvider::new(1);
        let result = run(&provider, &request, &RunOptions::default(), &CancelToken::new()).unwrap();
        assert!(result.height.is_some());
        assert_eq!(result.present_kinds(), vec![MapKind::Diffuse, MapKind::Height]);
    }
}
