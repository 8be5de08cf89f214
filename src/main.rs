//! PBRForge CLI

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use pbr_forge::config::FileConfig;
use pbr_forge::output::{self, OutputOptions};
use pbr_forge::pipeline::{self, RunOptions};
use pbr_forge::{
    CancelToken, Diagnostics, ImageProvider, MapKind, MaterialClass, OpenAiProvider,
    PipelineStatus, Resolution, SyntheticProvider, TessAlgorithm,
};
use std::path::PathBuf;

/// PBRForge: generate seamless PBR texture sets with AI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: config/default.json)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Material to generate (overrides config)
    #[arg(short = 'm', long)]
    material: Option<String>,

    /// Resolution, e.g. 1024x1024 (overrides config)
    #[arg(short = 'r', long, value_name = "WxH")]
    resolution: Option<String>,

    /// Output directory (overrides config)
    #[arg(short = 'o', long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Comma-separated texture types (e.g. diffuse,normal,roughness)
    #[arg(short = 't', long, value_name = "LIST")]
    types: Option<String>,

    /// Visual style appended to the prompt
    #[arg(long)]
    style: Option<String>,

    /// Extra detail appended to the material prompt
    #[arg(long, value_name = "TEXT")]
    prompt: Option<String>,

    /// Skip the seamless tessellation stage
    #[arg(long)]
    no_seamless: bool,

    /// Tessellation method: offset, mirror, frequency
    #[arg(long, value_name = "METHOD")]
    tessellation: Option<String>,

    /// Seed for deterministic texture detail
    #[arg(long)]
    seed: Option<u64>,

    /// Write a 2x2 tiled diffuse preview
    #[arg(long)]
    preview: bool,

    /// Use the deterministic synthetic provider instead of the AI call
    #[arg(long)]
    offline: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Show detailed timing information
    #[arg(long)]
    benchmark: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut diag = Diagnostics::new();

    let config = FileConfig::load_or_default(args.config.as_deref(), &mut diag)?;
    config.warn_unknown_keys(&mut diag);
    let mut request = config.build_request(&mut diag)?;

    // CLI overrides on top of the config
    if let Some(material) = &args.material {
        request.prompt = material.clone();
        request.material = MaterialClass::from_label(material);
    }
    if let Some(resolution) = &args.resolution {
        request.resolution = parse_resolution(resolution)?;
    }
    if let Some(types) = &args.types {
        request.kinds = parse_types(types)?;
    }
    if let Some(style) = &args.style {
        request.style = style.clone();
    }
    if let Some(extra) = &args.prompt {
        request.prompt = format!("{}, {}", request.prompt, extra);
    }
    if args.no_seamless {
        request.seamless = false;
    }
    if let Some(method) = &args.tessellation {
        request.tessellation.algorithm = TessAlgorithm::from_name(method)
            .with_context(|| format!("unknown tessellation method: {}", method))?;
    }
    if let Some(seed) = args.seed {
        request.seed = seed;
    }

    let output_options = OutputOptions {
        directory: args
            .output
            .clone()
            .or_else(|| config.output.directory.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("output")),
        prefix: config
            .output
            .prefix
            .clone()
            .unwrap_or_else(|| sanitize_prefix(&request.prompt)),
        create_preview: args.preview || config.output.create_preview.unwrap_or(false),
    };

    if !args.quiet {
        println!("PBRForge v{}", env!("CARGO_PKG_VERSION"));
        println!("Material:   {} ({})", request.prompt, request.material);
        println!("Resolution: {}", request.resolution);
        println!(
            "Types:      {}",
            request
                .kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Output:     {}\n", output_options.directory.display());
    }

    let provider: Box<dyn ImageProvider> = if args.offline {
        Box::new(SyntheticProvider::new(request.seed))
    } else {
        let key_var = config.generation.api_key_ref.as_deref().unwrap_or("OPENAI_API_KEY");
        let api_key = std::env::var(key_var).with_context(|| {
            format!("{} not set (use --offline for the synthetic provider)", key_var)
        })?;
        let mut provider = OpenAiProvider::new(api_key);
        if let Some(model) = &config.generation.model {
            provider = provider.with_model(model);
        }
        if let Some(quality) = &config.generation.quality {
            provider = provider.with_quality(quality);
        }
        if let Ok(org_id) = std::env::var("OPENAI_ORG_ID") {
            provider = provider.with_org_id(org_id);
        }
        Box::new(provider)
    };

    let run_options = RunOptions {
        show_progress: !args.quiet,
        benchmark: args.benchmark,
    };
    let cancel = CancelToken::new();
    let result = pipeline::run(provider.as_ref(), &request, &run_options, &cancel)?;

    let written = output::write_texture_set(
        &result,
        request.derivation.height.bit_depth,
        &output_options,
    )?;

    for warning in diag.warnings().iter().chain(result.warnings.iter()) {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    if !args.quiet {
        match result.status {
            PipelineStatus::Complete => println!("\n{}", "Texture set written:".green().bold()),
            PipelineStatus::Cancelled => println!(
                "\n{}",
                "Run cancelled, partial texture set written:".yellow().bold()
            ),
        }
        for (kind, path) in &written {
            println!("  {:<10} {}", kind.as_str(), path.display());
        }
        if let Some(delta) = result.tiling_delta {
            println!("  tiling edge delta: {:.6}", delta);
        }
    }
    Ok(())
}

fn parse_resolution(value: &str) -> Result<Resolution> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("resolution must look like 1024x1024, got '{}'", value))?;
    Ok(Resolution::new(
        width.trim().parse().context("invalid resolution width")?,
        height.trim().parse().context("invalid resolution height")?,
    ))
}

fn parse_types(value: &str) -> Result<Vec<MapKind>> {
    let mut kinds = Vec::new();
    for name in value.split(',') {
        let kind = MapKind::from_name(name)
            .with_context(|| format!("unknown texture type: {}", name.trim()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    anyhow::ensure!(!kinds.is_empty(), "--types resolved to no texture kinds");
    Ok(kinds)
}

fn sanitize_prefix(prompt: &str) -> String {
    let cleaned: String = prompt
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "texture".to_string()
    } else {
        cleaned
    }
}
