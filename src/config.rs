//! JSON configuration loading
//!
//! Mirrors the recognized config schema into typed sections. Every
//! field is optional and falls back to a sane default; unknown keys are
//! collected through flattened maps and surfaced as warnings so typos
//! never fail a run silently.

use crate::pipeline::diagnostics::Diagnostics;
use crate::types::{
    AoParams, DerivationParams, Error, HeightParams, MapKind, MaterialClass, MetallicParams,
    NormalParams, PipelineRequest, Resolution, Result, RoughnessParams, TessAlgorithm,
    TessellationParams,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default on-disk location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.json";

const DEFAULT_RESOLUTION: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub textures: TexturesSection,
    pub material: MaterialSection,
    pub tessellation: TessellationSection,
    pub generation: GenerationSection,
    pub output: OutputSection,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TexturesSection {
    pub resolution: ResolutionSection,
    pub types: Option<Vec<String>>,
    pub seamless: Option<bool>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResolutionSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MaterialSection {
    pub base_material: Option<String>,
    pub style: Option<String>,
    pub properties: PropertiesSection,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

/// Flat overrides for the derivation defaults. Absent keys defer to the
/// material-class presets.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PropertiesSection {
    pub roughness_base: Option<f32>,
    pub roughness_variation: Option<f32>,
    pub roughness_invert: Option<bool>,
    pub roughness_directional: Option<bool>,
    pub direction_angle_deg: Option<f32>,
    pub metallic_value: Option<f32>,
    pub metallic_variation: Option<f32>,
    pub metallic_threshold: Option<f32>,
    pub normal_strength: Option<f32>,
    pub normal_blur_radius: Option<u32>,
    pub invert_height: Option<bool>,
    pub ao_intensity: Option<f32>,
    pub min_ao: Option<f32>,
    pub cavity_scale: Option<f32>,
    pub global_scale: Option<f32>,
    pub depth_scale: Option<f32>,
    pub height_blur_radius: Option<u32>,
    pub height_bit_depth: Option<u32>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TessellationSection {
    pub method: Option<String>,
    pub blend_width: Option<u32>,
    pub corner_blend: Option<bool>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub model: Option<String>,
    pub quality: Option<String>,
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
    /// Name of the environment variable holding the API key; consumed
    /// by the CLI, never by the core.
    pub api_key_ref: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub directory: Option<String>,
    pub prefix: Option<String>,
    pub create_preview: Option<bool>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

impl FileConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidRequest(format!("config parse ({}): {}", path.display(), e)))
    }

    /// Load an explicit path, the default path if present, or built-in
    /// defaults when no file exists at all.
    pub fn load_or_default(path: Option<&Path>, diag: &mut Diagnostics) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    diag.warn(format!(
                        "no config file at {}, using built-in defaults",
                        DEFAULT_CONFIG_PATH
                    ));
                    Ok(Self::default())
                }
            }
        }
    }

    /// Warn once per unrecognized key, prefixed with its section.
    pub fn warn_unknown_keys(&self, diag: &mut Diagnostics) {
        let sections: [(&str, &HashMap<String, Value>); 8] = [
            ("", &self.extra),
            ("textures.", &self.textures.extra),
            ("textures.resolution.", &self.textures.resolution.extra),
            ("material.", &self.material.extra),
            ("material.properties.", &self.material.properties.extra),
            ("tessellation.", &self.tessellation.extra),
            ("generation.", &self.generation.extra),
            ("output.", &self.output.extra),
        ];
        for (prefix, extra) in sections {
            let mut keys: Vec<&String> = extra.keys().collect();
            keys.sort();
            for key in keys {
                diag.warn(format!("unrecognized config key: {}{}", prefix, key));
            }
        }
    }

    /// Assemble the pipeline request from this config.
    pub fn build_request(&self, diag: &mut Diagnostics) -> Result<PipelineRequest> {
        let resolution = Resolution::new(
            self.textures.resolution.width.unwrap_or(DEFAULT_RESOLUTION),
            self.textures.resolution.height.unwrap_or(DEFAULT_RESOLUTION),
        );

        let kinds = match &self.textures.types {
            None => MapKind::ALL.to_vec(),
            Some(names) => {
                let mut kinds = Vec::new();
                for name in names {
                    match MapKind::from_name(name) {
                        Some(kind) => {
                            if !kinds.contains(&kind) {
                                kinds.push(kind);
                            }
                        }
                        None => diag.warn(format!("unknown texture type: {}", name)),
                    }
                }
                if kinds.is_empty() {
                    return Err(Error::InvalidRequest(
                        "textures.types resolved to no known kinds".to_string(),
                    ));
                }
                kinds
            }
        };

        let label = self.material.base_material.as_deref().unwrap_or("generic");
        let material = MaterialClass::from_label(label);

        let algorithm = match &self.tessellation.method {
            None => TessAlgorithm::Frequency,
            Some(name) => TessAlgorithm::from_name(name).unwrap_or_else(|| {
                diag.warn(format!(
                    "unknown tessellation method '{}', using frequency",
                    name
                ));
                TessAlgorithm::Frequency
            }),
        };

        let p = &self.material.properties;
        let derivation = DerivationParams {
            normal: NormalParams {
                strength: p.normal_strength,
                blur_radius: p.normal_blur_radius.unwrap_or(0),
                invert_height: p.invert_height.unwrap_or(false),
            },
            roughness: RoughnessParams {
                base_value: p.roughness_base,
                variation: p.roughness_variation.unwrap_or(0.02),
                invert: p.roughness_invert,
                directional: p.roughness_directional.unwrap_or(false),
                direction_angle_deg: p.direction_angle_deg.unwrap_or(0.0),
            },
            metallic: MetallicParams {
                base_value: p.metallic_value,
                variation: p.metallic_variation.unwrap_or(0.0),
                threshold: p.metallic_threshold.unwrap_or(0.0),
            },
            ao: AoParams {
                cavity_scale: p.cavity_scale,
                global_scale: p.global_scale,
                min_ao: p.min_ao,
                intensity: p.ao_intensity.unwrap_or(1.0),
            },
            height: HeightParams {
                depth_scale: p.depth_scale.unwrap_or(1.0),
                blur_radius: p.height_blur_radius.unwrap_or(0),
                bit_depth: p.height_bit_depth.unwrap_or(8),
            },
        };

        Ok(PipelineRequest {
            prompt: label.to_string(),
            style: self
                .material
                .style
                .clone()
                .unwrap_or_else(|| "realistic".to_string()),
            resolution,
            material,
            kinds,
            tessellation: TessellationParams {
                algorithm,
                blend_width: self.tessellation.blend_width,
                corner_blend: self.tessellation.corner_blend.unwrap_or(true),
            },
            derivation,
            seamless: self.textures.seamless.unwrap_or(true),
            seed: self.generation.seed.unwrap_or(0),
            timeout: Duration::from_secs(
                self.generation.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}
