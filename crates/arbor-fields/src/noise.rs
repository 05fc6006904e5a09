//! Hash-based value noise and fractal Brownian motion.
//!
//! The hash is the usual `fract(sin(x)·c)` shader trick, so results are
//! cheap and repeatable but not suitable for anything statistical.

use arbor_math::Vec2;
use serde::{Deserialize, Serialize};

/// Fractal value-noise generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f32,
    /// Amplitude multiplier between octaves.
    pub gain: f32,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 1.5,
            gain: 0.75,
        }
    }
}

impl Noise {
    /// Pseudo-random value in (−1, 1) from a scalar seed.
    pub fn random(x: f32) -> f32 {
        x.sin().fract()
    }

    /// Pseudo-random value in (−1, 1) from a 2D seed.
    pub fn random2(st: Vec2) -> f32 {
        (st.dot(Vec2::new(12.9898, 78.233)).sin() * 43758.547).fract()
    }

    /// Smoothly interpolated value noise.
    pub fn value(st: Vec2) -> f32 {
        let i = st.floor();
        let f = st - i;

        let a = Self::random2(i);
        let b = Self::random2(i + Vec2::new(1.0, 0.0));
        let c = Self::random2(i + Vec2::new(0.0, 1.0));
        let d = Self::random2(i + Vec2::new(1.0, 1.0));

        // Smoothstep weights
        let u = f * f * (Vec2::splat(3.0) - 2.0 * f);

        a + (b - a) * u.x + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y
    }

    /// Sums `octaves` layers of value noise starting at `amplitude`.
    pub fn fbm(&self, st: Vec2, amplitude: f32) -> f32 {
        let mut st = st;
        let mut amplitude = amplitude;
        let mut value = 0.0;
        for _ in 0..self.octaves {
            value += amplitude * Self::value(st);
            st *= self.lacunarity;
            amplitude *= self.gain;
        }
        value
    }

    /// Largest magnitude `fbm` can return for the given amplitude.
    pub fn bound(&self, amplitude: f32) -> f32 {
        // Each octave's value noise is a convex blend of hashes in (−1, 1).
        (0..self.octaves)
            .map(|o| amplitude.abs() * self.gain.abs().powi(o as i32))
            .sum()
    }
}
