//! AI image provider interface
//!
//! The pipeline needs exactly one capability from the outside world:
//! given a prompt and target dimensions, return a decoded RGB bitmap.
//! Implementations may return an image of different dimensions; the
//! intake stage resamples.

pub mod openai;
pub mod synthetic;

use crate::types::{PipelineRequest, Result};
use image::RgbImage;
use std::time::Duration;

pub use openai::OpenAiProvider;
pub use synthetic::SyntheticProvider;

/// The single capability the pipeline requires of an image source.
pub trait ImageProvider: Sync {
    /// Generate (or synthesize) an RGB bitmap for the prompt. Failures
    /// surface as `Error::UpstreamImage` and abort the pipeline.
    fn generate(&self, prompt: &str, width: u32, height: u32, timeout: Duration)
        -> Result<RgbImage>;
}

/// Compose the diffuse prompt sent to the provider. The wording asks for
/// a flat albedo without baked lighting so the derivation kernels see
/// clean color data.
pub fn build_prompt(request: &PipelineRequest) -> String {
    format!(
        "A {}x{} photorealistic, seamless diffuse/albedo texture map of {} with a {} style. \
         This should be the base color map without any lighting, shadows, or reflections. \
         The texture must tile seamlessly on all edges.",
        request.resolution.width, request.resolution.height, request.prompt, request.style
    )
}
