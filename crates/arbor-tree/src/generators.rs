//! Procedural tree generators for benchmarks and testing.
//!
//! All generators are deterministic. Internodes grow along their local +Y
//! axis and each child is attached at the tip of its parent.

use arbor_math::{Quat, Vec3};
use arbor_types::constants::UNIT_DENSITY;
use arbor_types::{ArborError, ArborResult, BodyId};
use serde::{Deserialize, Serialize};

use crate::arena::BodyArena;
use crate::body::RigidBody;
use crate::joint::JointConfig;

/// Shape and joint parameters shared by all generated internodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchParams {
    /// Internode length (m).
    pub length: f32,
    /// Internode radius at the base of the tree (m).
    pub radius: f32,
    pub density: f32,
    /// Per-generation scale applied to length and radius.
    pub taper: f32,
    /// Angle between a branch and its parent's axis (rad).
    pub branch_angle: f32,
    pub joint: JointConfig,
}

impl Default for BranchParams {
    fn default() -> Self {
        Self {
            length: 1.0,
            radius: 0.1,
            density: UNIT_DENSITY * 100.0,
            taper: 0.8,
            branch_angle: std::f32::consts::FRAC_PI_6,
            joint: JointConfig::default(),
        }
    }
}

impl BranchParams {
    /// Unit cylinders of mass 1 on unit joints, no taper.
    pub fn unit() -> Self {
        Self {
            length: 1.0,
            radius: 1.0,
            density: UNIT_DENSITY,
            taper: 1.0,
            branch_angle: std::f32::consts::FRAC_PI_4,
            joint: JointConfig::unit(),
        }
    }

    /// The internode of the given generation, tapered from the base.
    pub fn internode(&self, generation: u32) -> RigidBody {
        let scale = self.taper.powi(generation as i32);
        RigidBody::internode(self.length * scale, self.radius * scale, self.density)
    }
}

/// Joint offset that places a child at the tip of `parent`.
pub fn tip_offset(parent: &RigidBody) -> Vec3 {
    parent
        .segment
        .map(|s| Vec3::new(0.0, s.length, 0.0))
        .unwrap_or(Vec3::ZERO)
}

/// Grows a straight chain of `count` internodes on top of `root`.
///
/// Returns the new bodies, base first.
pub fn chain(
    arena: &mut BodyArena,
    root: BodyId,
    count: usize,
    params: &BranchParams,
) -> ArborResult<Vec<BodyId>> {
    let mut bodies = Vec::with_capacity(count);
    let mut parent = root;
    for generation in 0..count {
        let child = arena.insert(params.internode(generation as u32));
        let offset = tip_offset(arena.body(parent)?);
        arena.attach(parent, child, &params.joint.at(offset))?;
        bodies.push(child);
        parent = child;
    }
    Ok(bodies)
}

/// Grows a full binary tree of the given `depth` on top of `root`.
///
/// A trunk internode is attached to `root`; every internode above it
/// splits into two branches tilted by `±branch_angle`, with the branching
/// plane turned a quarter turn per generation.
///
/// Returns the new bodies in breadth-first order (`2^(depth+1) − 1` of them).
pub fn binary_tree(
    arena: &mut BodyArena,
    root: BodyId,
    depth: u32,
    params: &BranchParams,
) -> ArborResult<Vec<BodyId>> {
    let trunk = arena.insert(params.internode(0));
    let offset = tip_offset(arena.body(root)?);
    arena.attach(root, trunk, &params.joint.at(offset))?;

    let mut bodies = vec![trunk];
    let mut generation_start = 0;
    for generation in 1..=depth {
        let generation_end = bodies.len();
        let plane = Quat::from_rotation_y(generation as f32 * std::f32::consts::FRAC_PI_2);
        for index in generation_start..generation_end {
            let parent = bodies[index];
            let offset = tip_offset(arena.body(parent)?);
            for side in [-1.0, 1.0] {
                let tilt = plane * Quat::from_rotation_z(side * params.branch_angle);
                let child = arena.insert(params.internode(generation));
                arena.attach(parent, child, &params.joint.at(offset).rotated(tilt))?;
                bodies.push(child);
            }
        }
        generation_start = generation_end;
    }
    Ok(bodies)
}

/// Builds an arbitrary tree from a parent table.
///
/// Body `i` hangs from `root` when `parents[i] == 0`, and from the body
/// created for entry `parents[i] − 1` otherwise. Entries must refer to
/// earlier bodies (`parents[i] <= i`).
pub fn from_parents(
    arena: &mut BodyArena,
    root: BodyId,
    parents: &[usize],
    params: &BranchParams,
) -> ArborResult<Vec<BodyId>> {
    let mut bodies: Vec<BodyId> = Vec::with_capacity(parents.len());
    for (i, &p) in parents.iter().enumerate() {
        if p > i {
            return Err(ArborError::InvalidArgument(format!(
                "parent entry {p} at index {i} refers to a later body"
            )));
        }
        let parent = if p == 0 { root } else { bodies[p - 1] };
        let child = arena.insert(params.internode(0));
        let offset = tip_offset(arena.body(parent)?);
        let sibling = arena.body(parent)?.child_joints().len() as f32;
        let tilt = Quat::from_rotation_y(sibling * 2.4) * Quat::from_rotation_z(params.branch_angle);
        let tilt = if sibling == 0.0 { Quat::IDENTITY } else { tilt };
        arena.attach(parent, child, &params.joint.at(offset).rotated(tilt))?;
        bodies.push(child);
    }
    Ok(bodies)
}
