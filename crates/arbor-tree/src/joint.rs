//! Rotational spring-damper joints.

use arbor_math::{Mat3, Quat, Vec3};
use arbor_types::constants::{DEFAULT_DAMPING, DEFAULT_STIFFNESS};
use arbor_types::BodyId;
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

/// Parameters for attaching a child body to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    /// Spring stiffness `k` (same on all three axes).
    pub stiffness: f32,
    /// Damping coefficient; the damping term is `damping · k · θ'`.
    pub damping: f32,
    /// Own-torque magnitude above which the child breaks off.
    pub torque_threshold: f32,
    /// Rest rotation of the joint relative to the parent body frame.
    pub local_orientation: Quat,
    /// Joint position relative to the parent's pivot, in the parent frame.
    pub local_position: Vec3,
}

impl Default for JointConfig {
    fn default() -> Self {
        Self {
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
            torque_threshold: f32::INFINITY,
            local_orientation: Quat::IDENTITY,
            local_position: Vec3::ZERO,
        }
    }
}

impl JointConfig {
    /// Unit stiffness and damping with no breaking threshold.
    pub fn unit() -> Self {
        Self {
            stiffness: 1.0,
            damping: 1.0,
            ..Default::default()
        }
    }

    pub fn at(mut self, local_position: Vec3) -> Self {
        self.local_position = local_position;
        self
    }

    pub fn rotated(mut self, local_orientation: Quat) -> Self {
        self.local_orientation = local_orientation;
        self
    }

    pub fn with_threshold(mut self, torque_threshold: f32) -> Self {
        self.torque_threshold = torque_threshold;
        self
    }
}

/// Joint state θ: one angle / velocity / acceleration value per local axis.
///
/// The angle vector is an axis-angle rotation in the joint frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub angle: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl JointState {
    /// Builds the state from the columns `[angle, velocity, acceleration]`.
    pub fn from_mat3(m: Mat3) -> Self {
        Self {
            angle: m.x_axis,
            velocity: m.y_axis,
            acceleration: m.z_axis,
        }
    }

    pub fn to_mat3(self) -> Mat3 {
        Mat3::from_cols(self.angle, self.velocity, self.acceleration)
    }

    pub fn is_finite(&self) -> bool {
        self.angle.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

/// The connection between a parent body and a child body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joint {
    pub parent: BodyId,
    pub child: BodyId,

    pub stiffness: f32,
    pub damping: f32,
    pub torque_threshold: f32,
    pub local_orientation: Quat,
    pub local_position: Vec3,

    /// Latest analytic solution.
    pub theta: JointState,

    // --- Derived world state ---
    pub orientation: Quat,
    pub position: Vec3,
    /// World acceleration of the joint point.
    pub acceleration: Vec3,
}

impl Joint {
    pub fn new(parent: BodyId, child: BodyId, config: &JointConfig) -> Self {
        Self {
            parent,
            child,
            stiffness: config.stiffness,
            damping: config.damping,
            torque_threshold: config.torque_threshold,
            local_orientation: config.local_orientation.normalize(),
            local_position: config.local_position,
            theta: JointState::default(),
            orientation: config.local_orientation.normalize(),
            position: config.local_position,
            acceleration: Vec3::ZERO,
        }
    }

    /// Places the joint on its (already updated) parent.
    pub fn update_transform(&mut self, parent: &RigidBody) {
        self.orientation = (parent.orientation * self.local_orientation).normalize();
        self.position = parent.pivot + parent.orientation * self.local_position;

        let r = self.position - parent.center_of_mass;
        self.acceleration = parent.acceleration
            + parent.angular_acceleration.cross(r)
            + parent.angular_velocity.cross(parent.angular_velocity.cross(r));
    }

    /// Rotates a world vector into the joint frame.
    #[inline]
    pub fn to_joint_space(&self, v: Vec3) -> Vec3 {
        self.orientation.inverse() * v
    }

    /// Rotates a world tensor into the joint frame: `Rᵀ·T·R`.
    #[inline]
    pub fn tensor_to_joint_space(&self, tensor: Mat3) -> Mat3 {
        let r = Mat3::from_quat(self.orientation);
        r.transpose() * tensor * r
    }

    pub fn is_finite(&self) -> bool {
        self.theta.is_finite()
            && self.orientation.is_finite()
            && self.position.is_finite()
            && self.acceleration.is_finite()
    }
}
