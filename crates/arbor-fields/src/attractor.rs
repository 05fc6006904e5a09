//! Point attraction.

use arbor_math::Vec3;
use arbor_tree::RigidBody;
use serde::{Deserialize, Serialize};

use crate::field::PhysicsField;

/// Pulls bodies towards `position` with an inverse-square falloff.
///
/// `softening` keeps the force finite when a body sits on the attractor:
/// `F = strength · m · d / (|d|² + softening²)^{3/2}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttractorField {
    pub position: Vec3,
    pub strength: f32,
    pub softening: f32,
    pub half_extent: Option<Vec3>,
}

impl Default for AttractorField {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            strength: 1.0,
            softening: 0.05,
            half_extent: None,
        }
    }
}

impl AttractorField {
    pub fn new(position: Vec3, strength: f32) -> Self {
        Self {
            position,
            strength,
            ..Default::default()
        }
    }

    /// Restricts the field to a box of the given half-size around it.
    pub fn bounded(mut self, half_extent: Vec3) -> Self {
        self.half_extent = Some(half_extent);
        self
    }
}

impl PhysicsField for AttractorField {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn half_extent(&self) -> Option<Vec3> {
        self.half_extent
    }

    fn force(&self, body: &RigidBody, _time: f32) -> Vec3 {
        let delta = self.position - body.center_of_mass;
        let denom = (delta.length_squared() + self.softening * self.softening).powf(1.5);
        if denom <= 0.0 {
            return Vec3::ZERO;
        }
        self.strength * body.mass * delta / denom
    }

    fn name(&self) -> &str {
        "attractor"
    }
}
