//! Uniform gravity.

use arbor_math::Vec3;
use arbor_tree::RigidBody;
use arbor_types::constants::GRAVITY;
use serde::{Deserialize, Serialize};

use crate::field::PhysicsField;

/// Constant acceleration applied to every body's mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityField {
    pub acceleration: Vec3,
}

impl Default for GravityField {
    fn default() -> Self {
        Self {
            acceleration: Vec3::new(0.0, -GRAVITY, 0.0),
        }
    }
}

impl GravityField {
    pub fn new(acceleration: Vec3) -> Self {
        Self { acceleration }
    }
}

impl PhysicsField for GravityField {
    fn position(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn half_extent(&self) -> Option<Vec3> {
        None
    }

    fn force(&self, body: &RigidBody, _time: f32) -> Vec3 {
        body.mass * self.acceleration
    }

    fn name(&self) -> &str {
        "gravity"
    }
}
