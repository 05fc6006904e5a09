//! Composite bodies: the aggregate of a body's whole subtree.
//!
//! Children are folded in one at a time. Each step shifts the running
//! inertia tensor from the old combined centre of mass to the new one
//! (parallel-axis theorem), so no second pass over the subtree is needed.

use arbor_math::{skew, sqr, Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeBody {
    pub mass: f32,
    pub force: Vec3,
    /// Torque about `pivot`.
    pub torque: Vec3,
    pub center_of_mass: Vec3,
    /// Inertia about `center_of_mass`, world frame.
    pub inertia: Mat3,
    /// The owning body's pivot.
    pub pivot: Vec3,
}

impl Default for CompositeBody {
    fn default() -> Self {
        Self {
            mass: 0.0,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
            inertia: Mat3::ZERO,
            pivot: Vec3::ZERO,
        }
    }
}

impl CompositeBody {
    /// Starts the aggregate from the body's own contribution.
    pub fn of(body: &RigidBody) -> Self {
        Self {
            mass: body.mass,
            force: body.force,
            torque: body.torque,
            center_of_mass: body.center_of_mass,
            inertia: body.inertia,
            pivot: body.pivot,
        }
    }

    /// Folds in a child's finished composite, attached at the world point
    /// `joint_position`.
    pub fn accumulate(&mut self, joint_position: Vec3, child: &CompositeBody) {
        let prev_mass = self.mass;
        let prev_com = self.center_of_mass;

        self.mass += child.mass;
        self.force += child.force;
        self.torque += (joint_position - self.pivot).cross(child.force) + child.torque;

        if self.mass > 0.0 {
            self.center_of_mass =
                (prev_mass * prev_com + child.mass * child.center_of_mass) / self.mass;
        }

        self.inertia -= prev_mass * sqr(skew(prev_com - self.center_of_mass));
        self.inertia +=
            child.inertia - child.mass * sqr(skew(child.center_of_mass - self.center_of_mass));
    }
}
