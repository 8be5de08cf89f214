//! Deterministic synthetic diffuse provider
//!
//! Offline stand-in for the AI call: multi-octave value noise tinted by
//! the material named in the prompt. Used by `--offline` runs and the
//! integration tests. Output is fully determined by the seed, so a
//! fixed request reproduces the whole texture set byte-for-byte.

use super::ImageProvider;
use crate::filters::noise::derive_seed;
use crate::types::{MaterialClass, Result};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::time::Duration;

/// Procedural provider; honors requested dimensions exactly.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl ImageProvider for SyntheticProvider {
    fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        _timeout: Duration,
    ) -> Result<RgbImage> {
        let shade = fractal_value_noise(width as usize, height as usize, self.seed);
        let base = tint_for_prompt(prompt);

        let mut img = RgbImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let s = 0.6 + 0.4 * shade[(y as usize, x as usize)];
            *px = Rgb([
                (base[0] * s).round().clamp(0.0, 255.0) as u8,
                (base[1] * s).round().clamp(0.0, 255.0) as u8,
                (base[2] * s).round().clamp(0.0, 255.0) as u8,
            ]);
        }
        Ok(img)
    }
}

/// Pick a tint from the first material word appearing in the prompt.
fn tint_for_prompt(prompt: &str) -> [f32; 3] {
    let lower = prompt.to_lowercase();
    let material = [
        MaterialClass::Stone,
        MaterialClass::Brick,
        MaterialClass::Wood,
        MaterialClass::Metal,
        MaterialClass::Fabric,
        MaterialClass::Concrete,
    ]
    .into_iter()
    .find(|m| lower.contains(m.as_str()))
    .unwrap_or(MaterialClass::Generic);

    match material {
        MaterialClass::Stone => [128.0, 126.0, 120.0],
        MaterialClass::Brick => [180.0, 105.0, 80.0],
        MaterialClass::Wood => [133.0, 94.0, 55.0],
        MaterialClass::Metal => [140.0, 144.0, 150.0],
        MaterialClass::Fabric => [120.0, 110.0, 130.0],
        MaterialClass::Concrete => [155.0, 152.0, 145.0],
        MaterialClass::Generic => [128.0, 128.0, 128.0],
    }
}

/// Sum of bilinearly interpolated lattice noise octaves, normalized to `[0, 1]`.
fn fractal_value_noise(width: usize, height: usize, seed: u64) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((height, width));
    let mut amplitude = 1.0f32;
    let mut total_amplitude = 0.0f32;
    let mut cell = (width.min(height) / 8).max(4);

    for octave in 0..4u64 {
        let lattice = lattice_grid(width, height, cell, derive_seed(seed, octave));
        for y in 0..height {
            let fy = y as f32 / cell as f32;
            let y0 = fy.floor() as usize;
            let ty = smooth(fy - y0 as f32);
            for x in 0..width {
                let fx = x as f32 / cell as f32;
                let x0 = fx.floor() as usize;
                let tx = smooth(fx - x0 as f32);

                let v00 = lattice[(y0, x0)];
                let v01 = lattice[(y0, x0 + 1)];
                let v10 = lattice[(y0 + 1, x0)];
                let v11 = lattice[(y0 + 1, x0 + 1)];
                let top = v00 * (1.0 - tx) + v01 * tx;
                let bottom = v10 * (1.0 - tx) + v11 * tx;
                out[(y, x)] += (top * (1.0 - ty) + bottom * ty) * amplitude;
            }
        }
        total_amplitude += amplitude;
        amplitude *= 0.5;
        cell = (cell / 2).max(2);
    }

    out.mapv_inplace(|v| v / total_amplitude);
    out
}

fn lattice_grid(width: usize, height: usize, cell: usize, seed: u64) -> Array2<f32> {
    let cols = width / cell + 2;
    let rows = height / cell + 2;
    let mut rng = Pcg32::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen::<f32>())
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}
