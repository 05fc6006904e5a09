//! Arena storage for bodies and joints.
//!
//! Bodies and joints are addressed by dense integer handles assigned at
//! insertion. Handles are never reused; a removed slot stays empty.
//! Parent/child links live only in the joint records, so the hierarchy has
//! no back-pointers to keep consistent.

use std::collections::VecDeque;

use arbor_math::Vec3;
use arbor_types::{ArborError, ArborResult, BodyId, JointId};

use crate::body::{BodyKind, RigidBody};
use crate::joint::{Joint, JointConfig};

/// Owns every body and joint of a forest.
#[derive(Debug, Clone, Default)]
pub struct BodyArena {
    bodies: Vec<Option<RigidBody>>,
    joints: Vec<Option<Joint>>,
}

impl BodyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `body` and returns its handle.
    ///
    /// Articulated bodies can only be created through [`Self::attach`], so
    /// an `Articulated` kind is downgraded to `Dynamic` here.
    pub fn insert(&mut self, mut body: RigidBody) -> BodyId {
        if let BodyKind::Articulated { .. } = body.kind {
            body.kind = BodyKind::Dynamic;
        }
        body.child_joints.clear();
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Some(body));
        id
    }

    // ─── Access ──────────────────────────────────────────────

    /// The body with this id, if it is still alive.
    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.index()).and_then(Option::as_ref)
    }

    /// Whether `id` names a live body.
    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    /// Like [`Self::get`], failing with `UnknownBody`.
    pub fn body(&self, id: BodyId) -> ArborResult<&RigidBody> {
        self.get(id).ok_or(ArborError::UnknownBody(id))
    }

    /// Mutable counterpart of [`Self::body`].
    pub fn body_mut(&mut self, id: BodyId) -> ArborResult<&mut RigidBody> {
        self.bodies
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ArborError::UnknownBody(id))
    }

    /// The joint with this id, failing with `UnknownJoint`.
    pub fn joint(&self, id: JointId) -> ArborResult<&Joint> {
        self.joints
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(ArborError::UnknownJoint(id))
    }

    /// Mutable counterpart of [`Self::joint`].
    pub fn joint_mut(&mut self, id: JointId) -> ArborResult<&mut Joint> {
        self.joints
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ArborError::UnknownJoint(id))
    }

    /// Borrows a joint mutably together with its parent (shared) and its
    /// child (mutable).
    pub fn joint_and_bodies_mut(
        &mut self,
        id: JointId,
    ) -> ArborResult<(&mut Joint, &RigidBody, &mut RigidBody)> {
        let joint = self
            .joints
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ArborError::UnknownJoint(id))?;
        let (parent_id, child_id) = (joint.parent, joint.child);
        let (parent, child) = pair_mut(&mut self.bodies, parent_id, child_id)?;
        Ok((joint, parent, child))
    }

    /// Iterates over live bodies in handle order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (BodyId(i as u32), b)))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.bodies
            .iter_mut()
            .enumerate()
            .filter_map(|(i, b)| b.as_mut().map(|b| (BodyId(i as u32), b)))
    }

    /// Iterates over live joints in handle order.
    pub fn joints(&self) -> impl Iterator<Item = (JointId, &Joint)> {
        self.joints
            .iter()
            .enumerate()
            .filter_map(|(i, j)| j.as_ref().map(|j| (JointId(i as u32), j)))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    /// Upper bound (exclusive) on body handle indices.
    pub fn body_capacity(&self) -> usize {
        self.bodies.len()
    }

    // ─── Topology ────────────────────────────────────────────

    /// Attaches `child` below `parent` and returns the new joint.
    ///
    /// The child (and anything already hanging from it) is moved so that
    /// its pivot sits on the joint.
    pub fn attach(
        &mut self,
        parent: BodyId,
        child: BodyId,
        config: &JointConfig,
    ) -> ArborResult<JointId> {
        if parent == child {
            return Err(ArborError::Topology(format!(
                "cannot attach {child} to itself"
            )));
        }
        let child_body = self.body(child)?;
        match child_body.kind {
            BodyKind::Static => {
                return Err(ArborError::Topology(format!(
                    "static body {child} cannot be attached as a child"
                )))
            }
            BodyKind::Articulated { parent_joint } => {
                return Err(ArborError::Topology(format!(
                    "{child} already hangs from {parent_joint}"
                )))
            }
            BodyKind::Dynamic => {}
        }
        self.body(parent)?;
        if self.is_ancestor(child, parent) {
            return Err(ArborError::Topology(format!(
                "attaching {child} below {parent} would create a cycle"
            )));
        }

        let id = JointId(self.joints.len() as u32);
        self.joints.push(Some(Joint::new(parent, child, config)));

        self.body_mut(parent)?.child_joints.push(id);
        let child_body = self.body_mut(child)?;
        child_body.kind = BodyKind::Articulated { parent_joint: id };
        child_body.velocity = Vec3::ZERO;
        child_body.angular_velocity = Vec3::ZERO;
        child_body.angular_momentum = Vec3::ZERO;

        self.refresh_subtree_pose(child)?;
        Ok(id)
    }

    /// Removes `joint`; its child becomes a `Dynamic` root.
    ///
    /// The new root's angular momentum is seeded from its current spin and
    /// composite inertia so free integration continues smoothly.
    pub fn detach(&mut self, joint: JointId) -> ArborResult<BodyId> {
        let record = self
            .joints
            .get_mut(joint.index())
            .and_then(Option::take)
            .ok_or(ArborError::UnknownJoint(joint))?;

        if let Some(parent) = self.bodies.get_mut(record.parent.index()).and_then(Option::as_mut) {
            parent.child_joints.retain(|&j| j != joint);
        }

        let child = self.body_mut(record.child)?;
        child.kind = BodyKind::Dynamic;
        let inertia = if child.composite.mass > 0.0 {
            child.composite.inertia
        } else {
            child.inertia
        };
        child.angular_momentum = inertia * child.angular_velocity;

        tracing::debug!(%joint, parent = %record.parent, child = %record.child, "joint detached");
        Ok(record.child)
    }

    /// Deletes `root` and all of its descendants. `root` must not hang
    /// from a joint.
    pub fn remove_subtree(&mut self, root: BodyId) -> ArborResult<Vec<BodyId>> {
        if let Some(joint) = self.body(root)?.parent_joint() {
            return Err(ArborError::Topology(format!(
                "{root} hangs from {joint}; detach it before removal"
            )));
        }
        let removed = self.flattened(root)?;
        for &id in &removed {
            if let Some(body) = self.bodies.get_mut(id.index()).and_then(Option::take) {
                for joint in body.child_joints {
                    if let Some(slot) = self.joints.get_mut(joint.index()) {
                        *slot = None;
                    }
                }
            }
        }
        Ok(removed)
    }

    /// The parent of `id`, if it is articulated.
    pub fn parent(&self, id: BodyId) -> Option<BodyId> {
        let joint = self.get(id)?.parent_joint()?;
        self.joint(joint).ok().map(|j| j.parent)
    }

    /// Children of `id` in attachment order.
    pub fn children(&self, id: BodyId) -> Vec<BodyId> {
        self.get(id)
            .map(|body| {
                body.child_joints
                    .iter()
                    .filter_map(|&j| self.joint(j).ok().map(|j| j.child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walks up to the root of the tree containing `id`.
    pub fn root_of(&self, id: BodyId) -> ArborResult<BodyId> {
        self.body(id)?;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Ok(current)
    }

    /// True when `ancestor` lies on the path from `id` to its root
    /// (a body counts as its own ancestor).
    pub fn is_ancestor(&self, ancestor: BodyId, id: BodyId) -> bool {
        let mut current = Some(id);
        while let Some(body) = current {
            if body == ancestor {
                return true;
            }
            current = self.parent(body);
        }
        false
    }

    /// Breadth-first order of the subtree under `root`, root first.
    pub fn flattened(&self, root: BodyId) -> ArborResult<Vec<BodyId>> {
        self.body(root)?;
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id));
        }
        Ok(order)
    }

    /// Childless bodies of the subtree under `root`, in breadth-first order.
    pub fn leaves(&self, root: BodyId) -> ArborResult<Vec<BodyId>> {
        Ok(self
            .flattened(root)?
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(RigidBody::is_leaf))
            .collect())
    }

    /// Sum of the own masses of the subtree under `root`.
    pub fn subtree_mass(&self, root: BodyId) -> ArborResult<f32> {
        Ok(self
            .flattened(root)?
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(|b| b.mass)
            .sum())
    }

    /// Re-places every joint and body below `root` from the current poses
    /// and joint angles, parents first.
    pub fn refresh_subtree_pose(&mut self, root: BodyId) -> ArborResult<()> {
        for id in self.flattened(root)? {
            if let Some(joint) = self.body(id)?.parent_joint() {
                let (joint, parent, child) = self.joint_and_bodies_mut(joint)?;
                joint.update_transform(parent);
                child.update_transform(joint);
            }
        }
        Ok(())
    }
}

/// Splits the body storage into a shared borrow of `a` and a mutable
/// borrow of `b`.
fn pair_mut(
    bodies: &mut [Option<RigidBody>],
    a: BodyId,
    b: BodyId,
) -> ArborResult<(&RigidBody, &mut RigidBody)> {
    let (ia, ib) = (a.index(), b.index());
    if ia == ib {
        return Err(ArborError::Topology(format!("{a} is joined to itself")));
    }
    if ia >= bodies.len() {
        return Err(ArborError::UnknownBody(a));
    }
    if ib >= bodies.len() {
        return Err(ArborError::UnknownBody(b));
    }

    let (first, second) = if ia < ib {
        let (lo, hi) = bodies.split_at_mut(ib);
        (lo[ia].as_ref(), hi[0].as_mut())
    } else {
        let (lo, hi) = bodies.split_at_mut(ia);
        (hi[0].as_ref(), lo[ib].as_mut())
    };
    match (first, second) {
        (Some(pa), Some(pb)) => Ok((pa, pb)),
        (None, _) => Err(ArborError::UnknownBody(a)),
        (_, None) => Err(ArborError::UnknownBody(b)),
    }
}
