//! PBRForge: seamless PBR texture sets from a single AI-generated diffuse map
//!
//! One provider call produces the diffuse; tessellation makes it tile
//! on the torus; every remaining map (normal, roughness, metallic, AO,
//! height) is derived algorithmically from that one image, so the whole
//! set stays spatially aligned and seamless.

pub mod buffer;
pub mod config;
pub mod derive;
pub mod filters;
pub mod intake;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod tessellation;
pub mod types;

pub use pipeline::diagnostics::{CancelToken, Diagnostics};
pub use pipeline::RunOptions;
pub use provider::{ImageProvider, OpenAiProvider, SyntheticProvider};
pub use types::{
    Error, MapKind, MaterialClass, PipelineRequest, PipelineResult, PipelineStatus, Resolution,
    Result, TessAlgorithm,
};

/// Run the pipeline with default options and no cancellation hook.
///
/// Front ends that need progress output or cooperative cancellation
/// call [`pipeline::run`] directly.
pub fn generate_texture_set(
    provider: &dyn ImageProvider,
    request: &PipelineRequest,
) -> Result<PipelineResult> {
    pipeline::run(provider, request, &RunOptions::default(), &CancelToken::new())
}
