//! World snapshots for replay and debugging.
//!
//! A snapshot records the dynamic state of every live body and joint,
//! keyed by id. It can be restored into any world with the same
//! topology, which is enough to resume a run or diff two runs.

use std::path::Path;

use arbor_math::{Quat, Vec3};
use arbor_solver::PhysicsWorld;
use arbor_tree::{BodyKind, JointState};
use arbor_types::{ArborError, ArborResult, BodyId, JointId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: BodyKind,
    pub orientation: Quat,
    pub center_of_mass: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub angular_acceleration: Vec3,
    pub angular_momentum: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSnapshot {
    pub id: JointId,
    pub parent: BodyId,
    pub child: BodyId,
    pub theta: JointState,
    pub orientation: Quat,
    pub position: Vec3,
    pub acceleration: Vec3,
}

/// Complete dynamic state of a world at one tick.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Ticks completed when the snapshot was taken.
    pub tick: u64,
    pub sim_time: f32,
    pub roots: Vec<BodyId>,
    pub bodies: Vec<BodySnapshot>,
    pub joints: Vec<JointSnapshot>,
}

/// Largest per-component differences between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotDiff {
    pub max_position: f32,
    pub max_velocity: f32,
    pub max_angle: f32,
    /// Bodies or joints present in only one of the snapshots.
    pub unmatched: usize,
}

impl SnapshotDiff {
    pub fn within(&self, tolerance: f32) -> bool {
        self.unmatched == 0
            && self.max_position <= tolerance
            && self.max_velocity <= tolerance
            && self.max_angle <= tolerance
    }
}

impl WorldSnapshot {
    /// Captures every live body and joint of `world`.
    pub fn capture(world: &PhysicsWorld, tick: u64, sim_time: f32) -> Self {
        let arena = world.arena();
        let bodies = arena
            .bodies()
            .map(|(id, b)| BodySnapshot {
                id,
                kind: b.kind,
                orientation: b.orientation,
                center_of_mass: b.center_of_mass,
                velocity: b.velocity,
                acceleration: b.acceleration,
                angular_velocity: b.angular_velocity,
                angular_acceleration: b.angular_acceleration,
                angular_momentum: b.angular_momentum,
            })
            .collect();
        let joints = arena
            .joints()
            .map(|(id, j)| JointSnapshot {
                id,
                parent: j.parent,
                child: j.child,
                theta: j.theta,
                orientation: j.orientation,
                position: j.position,
                acceleration: j.acceleration,
            })
            .collect();
        Self {
            tick,
            sim_time,
            roots: world.roots().iter().copied().collect(),
            bodies,
            joints,
        }
    }

    /// Writes the recorded state back into `world`.
    ///
    /// Fails without touching anything if a body or joint is missing, or
    /// if the topology no longer matches.
    pub fn restore(&self, world: &mut PhysicsWorld) -> ArborResult<()> {
        let arena = world.arena();
        for snap in &self.bodies {
            let body = arena.body(snap.id)?;
            if body.kind != snap.kind {
                return Err(ArborError::Topology(format!(
                    "{} is {:?}, snapshot has {:?}",
                    snap.id, body.kind, snap.kind
                )));
            }
        }
        for snap in &self.joints {
            let joint = arena.joint(snap.id)?;
            if (joint.parent, joint.child) != (snap.parent, snap.child) {
                return Err(ArborError::Topology(format!(
                    "joint {} connects {}→{}, snapshot has {}→{}",
                    snap.id, joint.parent, joint.child, snap.parent, snap.child
                )));
            }
        }

        let arena = world.arena_mut();
        for snap in &self.bodies {
            let body = arena.body_mut(snap.id)?;
            body.orientation = snap.orientation;
            body.center_of_mass = snap.center_of_mass;
            body.velocity = snap.velocity;
            body.acceleration = snap.acceleration;
            body.angular_velocity = snap.angular_velocity;
            body.angular_acceleration = snap.angular_acceleration;
            body.angular_momentum = snap.angular_momentum;
            body.reset_forces();
            body.refresh_pose();
        }
        for snap in &self.joints {
            let joint = arena.joint_mut(snap.id)?;
            joint.theta = snap.theta;
            joint.orientation = snap.orientation;
            joint.position = snap.position;
            joint.acceleration = snap.acceleration;
        }
        tracing::debug!(tick = self.tick, bodies = self.bodies.len(), "snapshot restored");
        Ok(())
    }

    /// Compares two snapshots body by body and joint by joint.
    pub fn diff(&self, other: &WorldSnapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for a in &self.bodies {
            match other.bodies.iter().find(|b| b.id == a.id) {
                Some(b) => {
                    diff.max_position = diff
                        .max_position
                        .max((a.center_of_mass - b.center_of_mass).abs().max_element());
                    diff.max_velocity = diff
                        .max_velocity
                        .max((a.velocity - b.velocity).abs().max_element());
                }
                None => diff.unmatched += 1,
            }
        }
        diff.unmatched += other
            .bodies
            .iter()
            .filter(|b| !self.bodies.iter().any(|a| a.id == b.id))
            .count();

        for a in &self.joints {
            match other.joints.iter().find(|b| b.id == a.id) {
                Some(b) => {
                    diff.max_angle = diff
                        .max_angle
                        .max((a.theta.angle - b.theta.angle).abs().max_element());
                }
                None => diff.unmatched += 1,
            }
        }
        diff.unmatched += other
            .joints
            .iter()
            .filter(|b| !self.joints.iter().any(|a| a.id == b.id))
            .count();
        diff
    }

    pub fn to_bytes(&self) -> ArborResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ArborError::Serialization(format!("snapshot encoding failed: {e}")))
    }

    pub fn from_bytes(data: &[u8]) -> ArborResult<Self> {
        bincode::deserialize(data)
            .map_err(|e| ArborError::Serialization(format!("snapshot decoding failed: {e}")))
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> ArborResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> ArborResult<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}
