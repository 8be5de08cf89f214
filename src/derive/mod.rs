//! PBR map derivation
//!
//! One module per derived map (C5-C9), fronted by the `MapDeriver`
//! capability enum the orchestrator dispatches on. Every deriver is a
//! pure function of the read-only `DeriveContext`, which is what makes
//! the parallel fan-out safe and the output deterministic.

pub mod ao;
pub mod height;
pub mod metallic;
pub mod normal;
pub mod roughness;

use crate::buffer;
use crate::filters::Boundary;
use crate::pipeline::diagnostics::{CancelToken, Diagnostics};
use crate::types::{DerivationParams, MapKind, MaterialClass, Plane, Result, RgbPlanes};

/// Noise stream identifiers, kept distinct per consumer so derivations
/// never share random sequences.
pub(crate) const ROUGHNESS_NOISE_STREAM: u64 = 101;
pub(crate) const METALLIC_NOISE_STREAM: u64 = 102;
pub(crate) const AO_NEUTRAL_STREAM: u64 = 103;

/// Read-only inputs shared by every derivation task. Frozen before the
/// fan-out starts; tasks never mutate them.
pub struct DeriveContext<'a> {
    pub diffuse: &'a RgbPlanes,
    /// Shared height plane (diffuse luminance), absent only after an
    /// upstream failure.
    pub height: Option<&'a Plane>,
    pub material: MaterialClass,
    pub params: &'a DerivationParams,
    pub seed: u64,
    /// True when the diffuse went through tessellation; blurs then use
    /// the periodic boundary so derived maps keep tiling.
    pub wrap: bool,
    pub cancel: &'a CancelToken,
}

impl DeriveContext<'_> {
    /// The shared height plane, or a fresh luminance extraction when the
    /// cache is unavailable.
    pub(crate) fn height_plane(&self) -> Plane {
        match self.height {
            Some(h) => h.clone(),
            None => buffer::luminance(self.diffuse),
        }
    }

    /// Boundary policy for this run's convolution kernels.
    pub(crate) fn boundary(&self) -> Boundary {
        if self.wrap {
            Boundary::Wrap
        } else {
            Boundary::Replicate
        }
    }
}

/// A finished derivation, RGB for normals and grayscale for the rest.
#[derive(Debug)]
pub enum DerivedMap {
    Rgb(RgbPlanes),
    Gray(Plane),
}

/// Capability handle for one derivable map kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDeriver {
    Normal,
    Roughness,
    Metallic,
    Height,
    Ao,
}

impl MapDeriver {
    /// Deriver for a requested kind; `Diffuse` has none.
    pub fn for_kind(kind: MapKind) -> Option<Self> {
        match kind {
            MapKind::Diffuse => None,
            MapKind::Normal => Some(MapDeriver::Normal),
            MapKind::Roughness => Some(MapDeriver::Roughness),
            MapKind::Metallic => Some(MapDeriver::Metallic),
            MapKind::Ao => Some(MapDeriver::Ao),
            MapKind::Height => Some(MapDeriver::Height),
        }
    }

    pub fn kind(self) -> MapKind {
        match self {
            MapDeriver::Normal => MapKind::Normal,
            MapDeriver::Roughness => MapKind::Roughness,
            MapDeriver::Metallic => MapKind::Metallic,
            MapDeriver::Height => MapKind::Height,
            MapDeriver::Ao => MapKind::Ao,
        }
    }

    /// Run the kernel. Warnings land in the task-local sink.
    pub fn derive(self, ctx: &DeriveContext, diag: &mut Diagnostics) -> Result<DerivedMap> {
        match self {
            MapDeriver::Normal => normal::derive(ctx, diag).map(DerivedMap::Rgb),
            MapDeriver::Roughness => roughness::derive(ctx, diag).map(DerivedMap::Gray),
            MapDeriver::Metallic => metallic::derive(ctx, diag).map(DerivedMap::Gray),
            MapDeriver::Height => height::derive(ctx, diag).map(DerivedMap::Gray),
            MapDeriver::Ao => ao::derive(ctx, diag).map(DerivedMap::Gray),
        }
    }

    /// Whether this kernel chain keeps a seamless input seamless, letting
    /// the orchestrator skip re-tessellation of the output.
    ///
    /// Pointwise maps, Gaussian blurs, and Sobel with replicated edges
    /// all hold the wrap deltas within tolerance on a seamless input.
    /// The two exceptions: arbitrary-angle rotation (directional
    /// roughness off the axes) and the fabric weave overlay, whose
    /// period need not divide the image size.
    pub fn seamless_preserving(self, ctx: &DeriveContext) -> bool {
        match self {
            MapDeriver::Normal | MapDeriver::Metallic | MapDeriver::Height => true,
            MapDeriver::Roughness => {
                let p = &ctx.params.roughness;
                !p.directional || roughness::is_axis_aligned(p.direction_angle_deg)
            }
            MapDeriver::Ao => ctx.material != MaterialClass::Fabric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoughnessParams;
    use ndarray::Array3;

    fn flat_diffuse(value: f32) -> RgbPlanes {
        Array3::from_elem((32, 32, 3), value)
    }

    #[test]
    fn test_for_kind_covers_derivables() {
        assert!(MapDeriver::for_kind(MapKind::Diffuse).is_none());
        for kind in [
            MapKind::Normal,
            MapKind::Roughness,
            MapKind::Metallic,
            MapKind::Ao,
            MapKind::Height,
        ] {
            let deriver = MapDeriver::for_kind(kind).unwrap();
            assert_eq!(deriver.kind(), kind);
        }
    }

    #[test]
    fn test_seamless_preserving_flags() {
        let diffuse = flat_diffuse(0.5);
        let params = DerivationParams::default();
        let cancel = CancelToken::new();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material: MaterialClass::Stone,
            params: &params,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        assert!(MapDeriver::Normal.seamless_preserving(&ctx));
        assert!(MapDeriver::Roughness.seamless_preserving(&ctx));
        assert!(MapDeriver::Ao.seamless_preserving(&ctx));

        // Off-axis directional roughness re-introduces seams
        let mut directional = DerivationParams::default();
        directional.roughness = RoughnessParams {
            directional: true,
            direction_angle_deg: 30.0,
            ..RoughnessParams::default()
        };
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material: MaterialClass::Metal,
            params: &directional,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        assert!(!MapDeriver::Roughness.seamless_preserving(&ctx));

        // The fabric weave overlay does too
        let params = DerivationParams::default();
        let ctx = DeriveContext {
            diffuse: &diffuse,
            height: None,
            material: MaterialClass::Fabric,
            params: &params,
            seed: 0,
            wrap: false,
            cancel: &cancel,
        };
        assert!(!MapDeriver::Ao.seamless_preserving(&ctx));
    }
}
