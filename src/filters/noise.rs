//! Seeded noise fields
//!
//! All stochastic texture detail flows through these generators so a
//! fixed request seed reproduces output byte-for-byte. PCG32 is cheap
//! to seed and has no global state to leak between derivation tasks.

use crate::types::Plane;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Derive an independent stream seed for one consumer of the request seed.
///
/// SplitMix64 finalizer; distinct `stream` values give uncorrelated
/// sequences from the same base seed.
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform noise field with samples in `[-amplitude, amplitude]`.
pub fn uniform_field(width: usize, height: usize, amplitude: f32, seed: u64) -> Plane {
    if amplitude <= 0.0 {
        return Array2::zeros((height, width));
    }
    let mut rng = Pcg32::seed_from_u64(seed);
    Array2::from_shape_fn((height, width), |_| {
        (rng.gen::<f32>() * 2.0 - 1.0) * amplitude
    })
}

/// Zero-mean Gaussian noise field with standard deviation `sigma`
/// (Box-Muller over the PCG stream).
pub fn gaussian_field(width: usize, height: usize, sigma: f32, seed: u64) -> Plane {
    if sigma <= 0.0 {
        return Array2::zeros((height, width));
    }
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut spare: Option<f32> = None;
    Array2::from_shape_fn((height, width), |_| {
        if let Some(v) = spare.take() {
            return v * sigma;
        }
        // Box-Muller; u1 kept away from 0 so ln stays finite
        let u1: f32 = rng.gen::<f32>().max(1e-10);
        let u2: f32 = rng.gen::<f32>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f32::consts::PI * u2;
        spare = Some(radius * angle.sin());
        radius * angle.cos() * sigma
    })
}
