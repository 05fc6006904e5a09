//! Rigid bodies.
//!
//! A body's mass, local inertia tensor and local pivot never change after
//! construction. Everything else is simulation state that the solver
//! rewrites each tick.

use arbor_math::{rotate_tensor, Mat3, Quat, Vec3};
use arbor_types::constants::ANGLE_EPSILON;
use arbor_types::{ArborError, ArborResult, JointId};
use serde::{Deserialize, Serialize};

use crate::composite::CompositeBody;
use crate::joint::Joint;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// A root that never moves (e.g. the ground anchor of a tree).
    Static,
    /// A free root integrated explicitly each tick.
    Dynamic,
    /// A non-root body hanging from `parent_joint`.
    Articulated { parent_joint: JointId },
}

/// Cylinder dimensions of an internode, used to place forces along it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub length: f32,
    pub radius: f32,
}

/// A rigid segment of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub kind: BodyKind,

    // --- Invariants ---
    /// Mass (kg).
    pub mass: f32,
    /// Inertia tensor about the centre of mass, in the body frame.
    pub local_inertia: Mat3,
    /// Pivot position relative to the centre of mass, in the body frame.
    pub local_pivot: Vec3,
    /// Cylinder shape, if the body is an internode.
    pub segment: Option<Segment>,

    // --- State ---
    pub orientation: Quat,
    pub center_of_mass: Vec3,
    /// World position of the point where the body connects to its parent.
    pub pivot: Vec3,
    /// World-frame inertia tensor about the centre of mass.
    pub inertia: Mat3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub angular_acceleration: Vec3,
    pub angular_momentum: Vec3,

    // --- Accumulators ---
    /// Net force applied this tick.
    pub force: Vec3,
    /// Net torque this tick; about the pivot for articulated bodies and
    /// about the centre of mass otherwise.
    pub torque: Vec3,

    /// Subtree aggregate, rebuilt every tick.
    pub composite: CompositeBody,

    pub(crate) child_joints: Vec<JointId>,
}

impl RigidBody {
    /// Creates a body at rest at the origin.
    pub fn new(kind: BodyKind, mass: f32, local_inertia: Mat3, local_pivot: Vec3) -> Self {
        let mut body = Self {
            kind,
            mass,
            local_inertia,
            local_pivot,
            segment: None,
            orientation: Quat::IDENTITY,
            center_of_mass: Vec3::ZERO,
            pivot: local_pivot,
            inertia: local_inertia,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            angular_acceleration: Vec3::ZERO,
            angular_momentum: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            composite: CompositeBody::default(),
            child_joints: Vec::new(),
        };
        body.composite = CompositeBody::of(&body);
        body
    }

    /// A massless anchor that never moves.
    pub fn static_root() -> Self {
        Self::new(BodyKind::Static, 0.0, Mat3::ZERO, Vec3::ZERO)
    }

    /// A free root with the given mass properties.
    pub fn dynamic_root(mass: f32, local_inertia: Mat3) -> Self {
        Self::new(BodyKind::Dynamic, mass, local_inertia, Vec3::ZERO)
    }

    /// A solid cylindrical internode pointing along +Y from its pivot.
    ///
    /// `mass = π·r²·l·ρ`; the pivot sits at the base, half a length below
    /// the centre of mass.
    pub fn internode(length: f32, radius: f32, density: f32) -> Self {
        let mass = std::f32::consts::PI * radius * radius * length * density;
        let about_y = mass * length * length / 12.0;
        let about_x = mass * radius * radius / 4.0;
        let about_z = about_x;

        let local_inertia = Mat3::from_diagonal(Vec3::new(
            about_y + about_z,
            about_z + about_x,
            about_x + about_y,
        ));

        let mut body = Self::new(
            BodyKind::Dynamic,
            mass,
            local_inertia,
            Vec3::new(0.0, -length / 2.0, 0.0),
        );
        body.segment = Some(Segment { length, radius });
        body.refresh_pose();
        body
    }

    /// A thin square leaf blade of side `length` lying in the body XZ plane.
    pub fn leaf(length: f32, thickness: f32, density: f32) -> Self {
        let mass = length * length * thickness * density;
        let edge = mass * length * length / 12.0;
        let local_inertia = Mat3::from_diagonal(Vec3::new(edge, 2.0 * edge, edge));
        Self::new(BodyKind::Dynamic, mass, local_inertia, Vec3::ZERO)
    }

    /// Moves an unattached body so that its pivot lies at `pivot`.
    pub fn with_pivot_at(mut self, pivot: Vec3) -> Self {
        self.center_of_mass = pivot - self.orientation * self.local_pivot;
        self.refresh_pose();
        self
    }

    /// Sets the orientation of an unattached body, keeping its centre of mass.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self.refresh_pose();
        self
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        !matches!(self.kind, BodyKind::Articulated { .. })
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child_joints.is_empty()
    }

    /// The joint this body hangs from, if any.
    #[inline]
    pub fn parent_joint(&self) -> Option<JointId> {
        match self.kind {
            BodyKind::Articulated { parent_joint } => Some(parent_joint),
            _ => None,
        }
    }

    /// Joints to this body's children, in attachment order.
    #[inline]
    pub fn child_joints(&self) -> &[JointId] {
        &self.child_joints
    }

    /// Adds `force` through the centre of mass plus an extra `torque`.
    ///
    /// For articulated bodies the lever arm from the pivot to the centre
    /// of mass contributes `(com − pivot) × force`.
    pub fn apply_force(&mut self, force: Vec3, torque: Vec3) {
        let arm = self.lever_arm(Vec3::ZERO);
        self.force += force;
        self.torque += torque + arm.cross(force);
    }

    /// Adds `force` at normalized `distance` ∈ [0, 1] along the segment,
    /// measured from the pivot.
    pub fn apply_force_at(&mut self, force: Vec3, distance: f32) -> ArborResult<()> {
        if !(0.0..=1.0).contains(&distance) {
            return Err(ArborError::InvalidArgument(format!(
                "force distance {distance} outside [0, 1]"
            )));
        }
        let segment = self.segment.ok_or_else(|| {
            ArborError::InvalidArgument("body has no segment to apply a force along".into())
        })?;

        // Point in the body frame, relative to the centre of mass.
        let point = self.local_pivot + Vec3::new(0.0, distance * segment.length, 0.0);
        let arm = self.lever_arm(point);
        self.force += force;
        self.torque += arm.cross(force);
        Ok(())
    }

    /// World-frame arm from the torque reference point to the body-frame
    /// point `local` (relative to the centre of mass).
    fn lever_arm(&self, local: Vec3) -> Vec3 {
        match self.kind {
            BodyKind::Articulated { .. } => self.orientation * (local - self.local_pivot),
            _ => self.orientation * local,
        }
    }

    pub fn reset_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Re-derives the pose of an articulated body from its parent joint:
    /// orientation from the joint frame and θ angle, pivot at the joint,
    /// centre of mass hanging off the pivot.
    pub fn update_transform(&mut self, parent_joint: &Joint) {
        let angle = parent_joint.theta.angle;
        let magnitude = angle.length();
        let local_rotation = if magnitude < ANGLE_EPSILON {
            Quat::IDENTITY
        } else {
            Quat::from_axis_angle(angle / magnitude, magnitude)
        };

        self.orientation = (parent_joint.orientation * local_rotation).normalize();
        self.pivot = parent_joint.position;
        self.inertia = rotate_tensor(self.orientation, self.local_inertia);
        self.center_of_mass = self.pivot + self.orientation * -self.local_pivot;
    }

    /// Re-derives world inertia and pivot from orientation and centre of
    /// mass. Used for roots.
    pub fn refresh_pose(&mut self) {
        self.inertia = rotate_tensor(self.orientation, self.local_inertia);
        self.pivot = self.center_of_mass + self.orientation * self.local_pivot;
    }

    /// Total kinetic energy of this body alone.
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.length_squared()
            + 0.5 * self.angular_velocity.dot(self.inertia * self.angular_velocity)
    }

    pub fn is_finite(&self) -> bool {
        self.orientation.is_finite()
            && self.inertia.is_finite()
            && self.angular_velocity.is_finite()
            && self.angular_acceleration.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.center_of_mass.is_finite()
            && self.pivot.is_finite()
    }
}
