//! Turbulent wind driven by fractal noise.

use arbor_math::{Vec2, Vec3};
use arbor_tree::RigidBody;
use serde::{Deserialize, Serialize};

use crate::field::PhysicsField;
use crate::noise::Noise;

/// Horizontal wind whose gusts drift over the ground plane with time.
///
/// The gust strength at a body is `fbm((x, z)·scale + drift·t)`, applied
/// along `direction` and scaled by the body's exposed area (the side
/// silhouette `2·r·l` of a segment, or 1 for shapeless bodies).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindField {
    /// Unit wind direction.
    pub direction: Vec3,
    /// Constant base pressure added to the gusts.
    pub base: f32,
    /// Gust amplitude passed to the noise.
    pub amplitude: f32,
    /// Spatial frequency of the gust pattern (1/m).
    pub scale: f32,
    /// Speed at which the gust pattern travels (noise units per second).
    pub drift: f32,
    pub noise: Noise,
    pub position: Vec3,
    pub half_extent: Option<Vec3>,
}

impl Default for WindField {
    fn default() -> Self {
        Self {
            direction: Vec3::X,
            base: 0.0,
            amplitude: 1.0,
            scale: 0.5,
            drift: 1.0,
            noise: Noise::default(),
            position: Vec3::ZERO,
            half_extent: None,
        }
    }
}

impl WindField {
    pub fn new(direction: Vec3, amplitude: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            amplitude,
            ..Default::default()
        }
    }

    pub fn with_base(mut self, base: f32) -> Self {
        self.base = base;
        self
    }

    /// Gust pressure at world point `point` and time `time`.
    pub fn pressure(&self, point: Vec3, time: f32) -> f32 {
        let st = Vec2::new(point.x, point.z) * self.scale + Vec2::splat(self.drift * time);
        self.base + self.noise.fbm(st, self.amplitude)
    }

    fn exposure(body: &RigidBody) -> f32 {
        body.segment
            .map(|s| 2.0 * s.radius * s.length)
            .unwrap_or(1.0)
    }
}

impl PhysicsField for WindField {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn half_extent(&self) -> Option<Vec3> {
        self.half_extent
    }

    fn force(&self, body: &RigidBody, time: f32) -> Vec3 {
        self.direction * self.pressure(body.center_of_mass, time) * Self::exposure(body)
    }

    fn name(&self) -> &str {
        "wind"
    }
}
