//! Core types and structures for PBRForge

use ndarray::{Array2, Array3};
use thiserror::Error;

/// Single-channel float plane, values in `[0, 1]`, indexed `[(y, x)]`.
pub type Plane = Array2<f32>;

/// Interleaved RGB float image, values in `[0, 1]`, shape `(height, width, 3)`.
pub type RgbPlanes = Array3<f32>;

/// Output resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Smallest resolution the pipeline accepts on either axis.
pub const MIN_RESOLUTION: u32 = 16;

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Validate against the pipeline minimum.
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_RESOLUTION || self.height < MIN_RESOLUTION {
            return Err(Error::InvalidRequest(format!(
                "resolution {}x{} is below the {}x{} minimum",
                self.width, self.height, MIN_RESOLUTION, MIN_RESOLUTION
            )));
        }
        Ok(())
    }

    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Coarse material label driving derivation presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialClass {
    Stone,
    Brick,
    Wood,
    Metal,
    Fabric,
    Concrete,
    Generic,
}

impl MaterialClass {
    /// Map a free-form label to a material class by case-insensitive
    /// prefix match. Unrecognized labels fall back to `Generic`.
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        for class in [
            MaterialClass::Stone,
            MaterialClass::Brick,
            MaterialClass::Wood,
            MaterialClass::Metal,
            MaterialClass::Fabric,
            MaterialClass::Concrete,
        ] {
            if lower.starts_with(class.as_str()) {
                return class;
            }
        }
        MaterialClass::Generic
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialClass::Stone => "stone",
            MaterialClass::Brick => "brick",
            MaterialClass::Wood => "wood",
            MaterialClass::Metal => "metal",
            MaterialClass::Fabric => "fabric",
            MaterialClass::Concrete => "concrete",
            MaterialClass::Generic => "generic",
        }
    }
}

impl std::fmt::Display for MaterialClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The texture maps the pipeline can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKind {
    Diffuse,
    Normal,
    Roughness,
    Metallic,
    Ao,
    Height,
}

impl MapKind {
    /// All kinds in canonical pipeline order.
    pub const ALL: [MapKind; 6] = [
        MapKind::Diffuse,
        MapKind::Normal,
        MapKind::Roughness,
        MapKind::Metallic,
        MapKind::Ao,
        MapKind::Height,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapKind::Diffuse => "diffuse",
            MapKind::Normal => "normal",
            MapKind::Roughness => "roughness",
            MapKind::Metallic => "metallic",
            MapKind::Ao => "ao",
            MapKind::Height => "height",
        }
    }

    /// Parse a kind name as it appears in config files and CLI flags.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "diffuse" | "albedo" => Some(MapKind::Diffuse),
            "normal" => Some(MapKind::Normal),
            "roughness" => Some(MapKind::Roughness),
            "metallic" => Some(MapKind::Metallic),
            "ao" | "ambient_occlusion" => Some(MapKind::Ao),
            "height" | "displacement" => Some(MapKind::Height),
            _ => None,
        }
    }

    /// Output channel count: diffuse and normal are RGB, the rest grayscale.
    pub fn channels(&self) -> usize {
        match self {
            MapKind::Diffuse | MapKind::Normal => 3,
            _ => 1,
        }
    }
}

impl std::fmt::Display for MapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seamless tiling algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TessAlgorithm {
    /// Diagonal quadrant swap with cross-fade. Best for repeatable cells.
    Offset,
    /// Edge blending against the wrap-mirrored strip. Best for organic textures.
    Mirror,
    /// Frequency-domain seam removal. Exact wrap by construction.
    Frequency,
}

impl TessAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "offset" => Some(TessAlgorithm::Offset),
            "mirror" => Some(TessAlgorithm::Mirror),
            "frequency" => Some(TessAlgorithm::Frequency),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TessAlgorithm::Offset => "offset",
            TessAlgorithm::Mirror => "mirror",
            TessAlgorithm::Frequency => "frequency",
        }
    }
}

/// Tessellation configuration
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    pub algorithm: TessAlgorithm,
    /// Blend band width in pixels. `None` resolves to `max(16, min(w,h)/32)`.
    pub blend_width: Option<u32>,
    /// Run the extra 4-corner neighborhood blend after the main algorithm.
    pub corner_blend: bool,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            algorithm: TessAlgorithm::Frequency,
            blend_width: None,
            corner_blend: true,
        }
    }
}

/// Normal derivation parameters. `None` fields resolve from presets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalParams {
    /// Gradient scale, valid range `[0.1, 5.0]`; out-of-range values clamp.
    pub strength: Option<f32>,
    /// Pre-Sobel Gaussian sigma in pixels. 0 disables.
    pub blur_radius: u32,
    /// Flip the gradient convention (treat dark as high).
    pub invert_height: bool,
}

/// Roughness derivation parameters
#[derive(Debug, Clone, Copy)]
pub struct RoughnessParams {
    pub base_value: Option<f32>,
    /// Uniform micro-variation amplitude.
    pub variation: f32,
    pub invert: Option<bool>,
    /// Overlay a directional streak pattern (brushed surfaces).
    pub directional: bool,
    pub direction_angle_deg: f32,
}

impl Default for RoughnessParams {
    fn default() -> Self {
        Self {
            base_value: None,
            variation: 0.02,
            invert: None,
            directional: false,
            direction_angle_deg: 0.0,
        }
    }
}

/// Metallic derivation parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct MetallicParams {
    pub base_value: Option<f32>,
    pub variation: f32,
    /// Luminance threshold for mask detection. 0 emits a uniform plane.
    pub threshold: f32,
}

/// Ambient occlusion derivation parameters
#[derive(Debug, Clone, Copy)]
pub struct AoParams {
    pub cavity_scale: Option<f32>,
    pub global_scale: Option<f32>,
    /// Occlusion floor, `[0, 1]`.
    pub min_ao: Option<f32>,
    /// Blend toward white: 0 disables AO entirely, 1 applies it fully.
    pub intensity: f32,
}

impl Default for AoParams {
    fn default() -> Self {
        Self {
            cavity_scale: None,
            global_scale: None,
            min_ao: None,
            intensity: 1.0,
        }
    }
}

/// Height derivation parameters
#[derive(Debug, Clone, Copy)]
pub struct HeightParams {
    /// Contrast of the S-curve around mid-gray.
    pub depth_scale: f32,
    /// Post-curve Gaussian sigma in pixels. 0 disables.
    pub blur_radius: u32,
    /// Output bit depth, 8 or 16.
    pub bit_depth: u32,
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            depth_scale: 1.0,
            blur_radius: 0,
            bit_depth: 8,
        }
    }
}

/// Per-map derivation parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivationParams {
    pub normal: NormalParams,
    pub roughness: RoughnessParams,
    pub metallic: MetallicParams,
    pub ao: AoParams,
    pub height: HeightParams,
}

/// Everything the pipeline needs for one run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Material/subject description fed into the prompt template.
    pub prompt: String,
    /// Visual style appended to the prompt (e.g. "realistic").
    pub style: String,
    pub resolution: Resolution,
    pub material: MaterialClass,
    /// Requested output maps. Diffuse is always produced.
    pub kinds: Vec<MapKind>,
    pub tessellation: TessellationParams,
    pub derivation: DerivationParams,
    /// When false the tessellation stage is skipped entirely.
    pub seamless: bool,
    /// Seed for all stochastic detail; fixes the output byte-for-byte.
    pub seed: u64,
    /// Timeout for the AI image call.
    pub timeout: std::time::Duration,
}

impl PipelineRequest {
    pub fn new(prompt: impl Into<String>, resolution: Resolution, material: MaterialClass) -> Self {
        Self {
            prompt: prompt.into(),
            style: "realistic".to_string(),
            resolution,
            material,
            kinds: MapKind::ALL.to_vec(),
            tessellation: TessellationParams::default(),
            derivation: DerivationParams::default(),
            seamless: true,
            seed: 0,
            timeout: std::time::Duration::from_secs(120),
        }
    }
}

/// Whether a run finished all requested maps or was cancelled partway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Complete,
    Cancelled,
}

/// The generated texture set.
///
/// Every present map has the request's dimensions. Diffuse is always
/// present; derived maps are `None` when not requested, when their
/// derivation failed non-fatally, or when cancellation struck first.
#[derive(Debug)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub diffuse: RgbPlanes,
    pub normal: Option<RgbPlanes>,
    pub roughness: Option<Plane>,
    pub metallic: Option<Plane>,
    pub ao: Option<Plane>,
    pub height: Option<Plane>,
    /// Maximum wrap edge delta of the tessellated diffuse, if measured.
    pub tiling_delta: Option<f32>,
    pub warnings: Vec<String>,
}

impl PipelineResult {
    /// Kinds actually present in this result, canonical order.
    pub fn present_kinds(&self) -> Vec<MapKind> {
        let mut kinds = vec![MapKind::Diffuse];
        if self.normal.is_some() {
            kinds.push(MapKind::Normal);
        }
        if self.roughness.is_some() {
            kinds.push(MapKind::Roughness);
        }
        if self.metallic.is_some() {
            kinds.push(MapKind::Metallic);
        }
        if self.ao.is_some() {
            kinds.push(MapKind::Ao);
        }
        if self.height.is_some() {
            kinds.push(MapKind::Height);
        }
        kinds
    }
}

/// PBRForge error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream image error: {0}")]
    UpstreamImage(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("numeric error: {0}")]
    Numeric(String),

    #[error("{kind} derivation failed: {message}")]
    Derivation { kind: MapKind, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
