//! Flattened tree layout.
//!
//! A [`FlattenedTree`] is the world's simulated forest packed into flat
//! arrays of `Pod` records, indexed by `u32`:
//!
//! ```text
//! bodies: [ unit heads, level 0 | level 1 | ... ][ climbers, per unit ][ roots ]
//! joints: [ parent joint of body 0 | body 1 | ... ]   (one per non-root)
//! ```
//!
//! Every non-root body `i` owns joint `i`, so the joint table needs no
//! separate index. Children are stored as a CSR table of flat body
//! indices.

use std::collections::HashMap;

use arbor_math::{Mat3, Quat, Vec3};
use arbor_solver::PhysicsWorld;
use arbor_tree::{BodyKind, CompositeBody, Joint, JointState, LevelSchedule, RigidBody};
use arbor_types::{ArborError, ArborResult, BodyId, JointId};
use bytemuck::{Pod, Zeroable};

/// Parent index of a root.
pub const NO_PARENT: i32 = -1;

const KIND_STATIC: u32 = 0;
const KIND_DYNAMIC: u32 = 1;
const KIND_ARTICULATED: u32 = 2;

/// Subtree aggregate, flattened.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatComposite {
    pub mass: f32,
    pub force: [f32; 3],
    pub torque: [f32; 3],
    pub center_of_mass: [f32; 3],
    pub inertia: [f32; 9],
    pub pivot: [f32; 3],
}

impl FlatComposite {
    pub fn encode(c: &CompositeBody) -> Self {
        Self {
            mass: c.mass,
            force: c.force.to_array(),
            torque: c.torque.to_array(),
            center_of_mass: c.center_of_mass.to_array(),
            inertia: c.inertia.to_cols_array(),
            pivot: c.pivot.to_array(),
        }
    }

    pub fn decode(&self) -> CompositeBody {
        CompositeBody {
            mass: self.mass,
            force: Vec3::from_array(self.force),
            torque: Vec3::from_array(self.torque),
            center_of_mass: Vec3::from_array(self.center_of_mass),
            inertia: Mat3::from_cols_array(&self.inertia),
            pivot: Vec3::from_array(self.pivot),
        }
    }
}

/// One rigid body. Matrices are column-major, quaternions `xyzw`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatBody {
    pub kind: u32,
    /// Flat index of the parent body, or [`NO_PARENT`].
    pub parent: i32,
    pub mass: f32,
    pub local_pivot: [f32; 3],
    pub local_inertia: [f32; 9],
    pub orientation: [f32; 4],
    pub center_of_mass: [f32; 3],
    pub pivot: [f32; 3],
    pub inertia: [f32; 9],
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    pub angular_velocity: [f32; 3],
    pub angular_acceleration: [f32; 3],
    pub angular_momentum: [f32; 3],
    pub force: [f32; 3],
    pub torque: [f32; 3],
    pub composite: FlatComposite,
}

impl FlatBody {
    pub fn encode(body: &RigidBody, parent: i32) -> Self {
        let kind = match body.kind {
            BodyKind::Static => KIND_STATIC,
            BodyKind::Dynamic => KIND_DYNAMIC,
            BodyKind::Articulated { .. } => KIND_ARTICULATED,
        };
        Self {
            kind,
            parent,
            mass: body.mass,
            local_pivot: body.local_pivot.to_array(),
            local_inertia: body.local_inertia.to_cols_array(),
            orientation: body.orientation.to_array(),
            center_of_mass: body.center_of_mass.to_array(),
            pivot: body.pivot.to_array(),
            inertia: body.inertia.to_cols_array(),
            velocity: body.velocity.to_array(),
            acceleration: body.acceleration.to_array(),
            angular_velocity: body.angular_velocity.to_array(),
            angular_acceleration: body.angular_acceleration.to_array(),
            angular_momentum: body.angular_momentum.to_array(),
            force: body.force.to_array(),
            torque: body.torque.to_array(),
            composite: FlatComposite::encode(&body.composite),
        }
    }

    /// Rebuilds a detached [`RigidBody`] carrying this record's state.
    ///
    /// `index` is the record's own flat index; an articulated body gets
    /// it as its parent joint id, matching the joint table layout. The
    /// result has no child joints.
    pub fn decode(&self, index: usize) -> RigidBody {
        let kind = match self.kind {
            KIND_STATIC => BodyKind::Static,
            KIND_ARTICULATED => BodyKind::Articulated {
                parent_joint: JointId(index as u32),
            },
            _ => BodyKind::Dynamic,
        };
        let mut body = RigidBody::new(
            kind,
            self.mass,
            Mat3::from_cols_array(&self.local_inertia),
            Vec3::from_array(self.local_pivot),
        );
        self.store_into(&mut body);
        body
    }

    /// Copies the simulated state into `body`, leaving its kind, shape
    /// and topology alone.
    pub fn store_into(&self, body: &mut RigidBody) {
        body.orientation = Quat::from_array(self.orientation);
        body.center_of_mass = Vec3::from_array(self.center_of_mass);
        body.pivot = Vec3::from_array(self.pivot);
        body.inertia = Mat3::from_cols_array(&self.inertia);
        body.velocity = Vec3::from_array(self.velocity);
        body.acceleration = Vec3::from_array(self.acceleration);
        body.angular_velocity = Vec3::from_array(self.angular_velocity);
        body.angular_acceleration = Vec3::from_array(self.angular_acceleration);
        body.angular_momentum = Vec3::from_array(self.angular_momentum);
        body.force = Vec3::from_array(self.force);
        body.torque = Vec3::from_array(self.torque);
        body.composite = self.composite.decode();
    }

    /// The body's own contribution, starting point of its composite.
    pub fn own_composite(&self) -> CompositeBody {
        CompositeBody {
            mass: self.mass,
            force: Vec3::from_array(self.force),
            torque: Vec3::from_array(self.torque),
            center_of_mass: Vec3::from_array(self.center_of_mass),
            inertia: Mat3::from_cols_array(&self.inertia),
            pivot: Vec3::from_array(self.pivot),
        }
    }

    pub fn torque_magnitude(&self) -> f32 {
        Vec3::from_array(self.torque).length()
    }
}

/// One joint, owned by the body with the same flat index.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatJoint {
    pub parent: u32,
    pub child: u32,
    pub stiffness: f32,
    pub damping: f32,
    pub torque_threshold: f32,
    pub local_orientation: [f32; 4],
    pub local_position: [f32; 3],
    /// Angle, velocity, acceleration as columns.
    pub theta: [f32; 9],
    pub orientation: [f32; 4],
    pub position: [f32; 3],
    pub acceleration: [f32; 3],
}

impl FlatJoint {
    pub fn encode(joint: &Joint, parent: u32, child: u32) -> Self {
        Self {
            parent,
            child,
            stiffness: joint.stiffness,
            damping: joint.damping,
            torque_threshold: joint.torque_threshold,
            local_orientation: joint.local_orientation.to_array(),
            local_position: joint.local_position.to_array(),
            theta: joint.theta.to_mat3().to_cols_array(),
            orientation: joint.orientation.to_array(),
            position: joint.position.to_array(),
            acceleration: joint.acceleration.to_array(),
        }
    }

    /// Rebuilds a [`Joint`] whose endpoints are flat indices.
    pub fn decode(&self) -> Joint {
        Joint {
            parent: BodyId(self.parent),
            child: BodyId(self.child),
            stiffness: self.stiffness,
            damping: self.damping,
            torque_threshold: self.torque_threshold,
            local_orientation: Quat::from_array(self.local_orientation),
            local_position: Vec3::from_array(self.local_position),
            theta: self.state(),
            orientation: Quat::from_array(self.orientation),
            position: Vec3::from_array(self.position),
            acceleration: Vec3::from_array(self.acceleration),
        }
    }

    /// Copies θ and the joint's world placement into `joint`.
    pub fn store_into(&self, joint: &mut Joint) {
        joint.theta = self.state();
        joint.orientation = Quat::from_array(self.orientation);
        joint.position = Vec3::from_array(self.position);
        joint.acceleration = Vec3::from_array(self.acceleration);
    }

    pub fn state(&self) -> JointState {
        JointState::from_mat3(Mat3::from_cols_array(&self.theta))
    }

    pub fn set_state(&mut self, state: JointState) {
        self.theta = state.to_mat3().to_cols_array();
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// The simulated forest in buffer form.
#[derive(Debug, Clone, Default)]
pub struct FlattenedTree {
    pub bodies: Vec<FlatBody>,
    pub joints: Vec<FlatJoint>,
    /// Unit heads of each level, children-first, as `[start, end)`.
    pub level_ranges: Vec<[u32; 2]>,
    /// Climbers of each unit (indexed by the head), nearest first.
    pub climber_ranges: Vec<[u32; 2]>,
    /// `child_indices[child_offsets[i]..child_offsets[i + 1]]` are the
    /// children of body `i`.
    pub child_offsets: Vec<u32>,
    pub child_indices: Vec<u32>,
    /// Index of the first root; everything before it is articulated.
    pub root_start: u32,
    body_ids: Vec<BodyId>,
    joint_ids: Vec<JointId>,
}

impl FlattenedTree {
    /// Packs every body reachable from the world's roots.
    pub fn from_world(world: &PhysicsWorld) -> ArborResult<Self> {
        let arena = world.arena();
        let schedule = LevelSchedule::build(arena, world.roots().iter().copied())?;

        let mut body_ids = Vec::with_capacity(schedule.body_count() + world.roots().len());
        let mut level_ranges = Vec::with_capacity(schedule.len());
        for level in schedule.levels() {
            let start = body_ids.len() as u32;
            body_ids.extend(level.iter().map(|unit| unit.body));
            level_ranges.push([start, body_ids.len() as u32]);
        }
        let mut climber_ranges = Vec::with_capacity(schedule.unit_count());
        for unit in schedule.levels().iter().flatten() {
            let start = body_ids.len() as u32;
            body_ids.extend(unit.climbers.iter().copied());
            climber_ranges.push([start, body_ids.len() as u32]);
        }
        let root_start = body_ids.len() as u32;
        body_ids.extend(world.roots().iter().copied());

        let index: HashMap<BodyId, u32> = body_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i as u32))
            .collect();
        let flat_index = |id: BodyId| {
            index.get(&id).copied().ok_or_else(|| {
                ArborError::Topology(format!("{id} is not reachable from a root"))
            })
        };

        let mut bodies = Vec::with_capacity(body_ids.len());
        let mut joints = Vec::with_capacity(root_start as usize);
        let mut joint_ids = Vec::with_capacity(root_start as usize);
        let mut child_offsets = Vec::with_capacity(body_ids.len() + 1);
        let mut child_indices = Vec::new();

        for (i, &id) in body_ids.iter().enumerate() {
            let body = arena.body(id)?;
            let parent = match body.parent_joint() {
                Some(joint_id) if i < root_start as usize => {
                    let joint = arena.joint(joint_id)?;
                    let parent = flat_index(joint.parent)?;
                    joints.push(FlatJoint::encode(joint, parent, i as u32));
                    joint_ids.push(joint_id);
                    parent as i32
                }
                Some(_) => {
                    return Err(ArborError::Topology(format!(
                        "root {id} is still articulated"
                    )))
                }
                None if i < root_start as usize => {
                    return Err(ArborError::Topology(format!(
                        "scheduled body {id} has no parent joint"
                    )))
                }
                None => NO_PARENT,
            };
            bodies.push(FlatBody::encode(body, parent));

            child_offsets.push(child_indices.len() as u32);
            for &joint_id in body.child_joints() {
                child_indices.push(flat_index(arena.joint(joint_id)?.child)?);
            }
        }
        child_offsets.push(child_indices.len() as u32);

        Ok(Self {
            bodies,
            joints,
            level_ranges,
            climber_ranges,
            child_offsets,
            child_indices,
            root_start,
            body_ids,
            joint_ids,
        })
    }

    /// Copies every body and joint state back into `world`.
    pub fn write_back(&self, world: &mut PhysicsWorld) -> ArborResult<()> {
        let arena = world.arena_mut();
        for (flat, &id) in self.bodies.iter().zip(&self.body_ids) {
            flat.store_into(arena.body_mut(id)?);
        }
        for (flat, &id) in self.joints.iter().zip(&self.joint_ids) {
            flat.store_into(arena.joint_mut(id)?);
        }
        Ok(())
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn level_count(&self) -> usize {
        self.level_ranges.len()
    }

    /// Number of units, equal to the number of unit heads.
    pub fn unit_count(&self) -> usize {
        self.climber_ranges.len()
    }

    /// Flat indices of the roots.
    pub fn roots(&self) -> std::ops::Range<usize> {
        self.root_start as usize..self.bodies.len()
    }

    /// Flat indices of the unit heads of `level`.
    pub fn level(&self, level: usize) -> std::ops::Range<usize> {
        let [start, end] = self.level_ranges[level];
        start as usize..end as usize
    }

    /// Flat indices of the climbers above unit head `head`, nearest first.
    pub fn climbers(&self, head: usize) -> std::ops::Range<usize> {
        let [start, end] = self.climber_ranges[head];
        start as usize..end as usize
    }

    pub fn children(&self, body: usize) -> &[u32] {
        let start = self.child_offsets[body] as usize;
        let end = self.child_offsets[body + 1] as usize;
        &self.child_indices[start..end]
    }

    pub fn body_id(&self, index: usize) -> Option<BodyId> {
        self.body_ids.get(index).copied()
    }

    pub fn joint_id(&self, index: usize) -> Option<JointId> {
        self.joint_ids.get(index).copied()
    }

    /// Raw bytes of the body buffer, for upload.
    pub fn body_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bodies)
    }

    /// Raw bytes of the joint buffer, for upload.
    pub fn joint_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.joints)
    }
}
