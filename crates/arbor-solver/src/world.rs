//! The physics world: every body, the roots being simulated, and the
//! active fields.

use std::collections::BTreeSet;

use arbor_fields::{FieldRegistry, GravityField, PhysicsField};
use arbor_math::Vec3;
use arbor_tree::{BodyArena, BodyKind, JointConfig, LevelSchedule, RigidBody};
use arbor_types::{ArborError, ArborResult, BodyId, FieldId, JointId};

use crate::free_bodies::update_free_bodies;

/// Arena + root set + field registry.
///
/// The level schedule is cached and rebuilt lazily after any topology
/// change. Topology may only change between ticks or during
/// de-articulation.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    arena: BodyArena,
    roots: BTreeSet<BodyId>,
    fields: FieldRegistry,
    schedule: LevelSchedule,
    schedule_dirty: bool,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a body without simulating it; it becomes part of the world
    /// once attached below a root.
    pub fn insert(&mut self, body: RigidBody) -> BodyId {
        self.arena.insert(body)
    }

    /// Stores a body and registers it as a simulated root.
    pub fn add_root(&mut self, body: RigidBody) -> BodyId {
        let id = self.arena.insert(body);
        self.roots.insert(id);
        self.schedule_dirty = true;
        id
    }

    /// Attaches `child` below `parent`. A child that was a root stops
    /// being one.
    pub fn attach(
        &mut self,
        parent: BodyId,
        child: BodyId,
        config: JointConfig,
    ) -> ArborResult<JointId> {
        let joint = self.arena.attach(parent, child, &config)?;
        self.roots.remove(&child);
        self.schedule_dirty = true;
        Ok(joint)
    }

    /// Deletes a root and its whole subtree.
    pub fn remove_root(&mut self, root: BodyId) -> ArborResult<Vec<BodyId>> {
        if !self.roots.contains(&root) {
            return Err(ArborError::Topology(format!("{root} is not a root")));
        }
        let removed = self.arena.remove_subtree(root)?;
        self.roots.remove(&root);
        self.schedule_dirty = true;
        Ok(removed)
    }

    /// Breaks `body` off its parent; it becomes a free `Dynamic` root.
    pub fn free(&mut self, body: BodyId) -> ArborResult<()> {
        let joint = self
            .arena
            .body(body)?
            .parent_joint()
            .ok_or_else(|| ArborError::Topology(format!("{body} is not articulated")))?;
        self.arena.detach(joint)?;
        self.roots.insert(body);
        self.schedule_dirty = true;
        Ok(())
    }

    pub fn add_field(&mut self, field: Box<dyn PhysicsField>) -> FieldId {
        self.fields.add(field)
    }

    pub fn remove_field(&mut self, id: FieldId) -> ArborResult<Box<dyn PhysicsField>> {
        self.fields.remove(id)
    }

    // ─── Access ──────────────────────────────────────────────

    pub fn arena(&self) -> &BodyArena {
        &self.arena
    }

    /// Mutable arena access for force application and state edits.
    /// Structural edits must go through the world so the root set and
    /// schedule stay consistent.
    pub fn arena_mut(&mut self) -> &mut BodyArena {
        &mut self.arena
    }

    pub fn body(&self, id: BodyId) -> ArborResult<&RigidBody> {
        self.arena.body(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> ArborResult<&mut RigidBody> {
        self.arena.body_mut(id)
    }

    pub fn roots(&self) -> &BTreeSet<BodyId> {
        &self.roots
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    /// Free roots, integrated explicitly each tick.
    pub fn free_bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.roots.iter().copied().filter(|&id| {
            self.arena
                .get(id)
                .is_some_and(|b| b.kind == BodyKind::Dynamic)
        })
    }

    /// Bodies reachable from the roots, in id order.
    pub fn simulated_bodies(&self) -> Vec<BodyId> {
        let mut bodies: Vec<BodyId> = self
            .roots
            .iter()
            .filter_map(|&r| self.arena.flattened(r).ok())
            .flatten()
            .collect();
        bodies.sort_unstable();
        bodies
    }

    /// Bodies reachable from the roots.
    pub fn simulated_body_count(&self) -> usize {
        self.roots
            .iter()
            .filter_map(|&r| self.arena.flattened(r).ok())
            .map(|bodies| bodies.len())
            .sum()
    }

    /// Total kinetic energy of every simulated body.
    pub fn kinetic_energy(&self) -> f32 {
        self.roots
            .iter()
            .filter_map(|&r| self.arena.flattened(r).ok())
            .flatten()
            .filter_map(|id| self.arena.get(id))
            .map(RigidBody::kinetic_energy)
            .sum()
    }

    // ─── Per-tick Steps ──────────────────────────────────────

    /// Applies every registered field, plus uniform `gravity` when it is
    /// non-zero, to the non-static simulated bodies. Returns the number of
    /// field-body interactions.
    pub fn apply_fields(&mut self, time: f32, gravity: Vec3) -> usize {
        let gravity = (gravity != Vec3::ZERO).then(|| GravityField::new(gravity));
        let mut applied = 0;
        for id in self.simulated_bodies() {
            let Ok(body) = self.arena.body_mut(id) else {
                continue;
            };
            if body.is_static() {
                continue;
            }
            applied += self.fields.apply_to(body, time);
            if let Some(field) = &gravity {
                field.apply(body, time);
            }
        }
        applied
    }

    /// Integrates every `Dynamic` root. Returns how many moved.
    pub fn integrate_free_bodies(&mut self, dt: f32) -> ArborResult<usize> {
        update_free_bodies(&mut self.arena, self.roots.iter().copied(), dt)
    }

    /// Clears the force and torque accumulators of every simulated body.
    pub fn reset_forces(&mut self) {
        for id in self.simulated_bodies() {
            if let Ok(body) = self.arena.body_mut(id) {
                body.reset_forces();
            }
        }
    }

    // ─── Schedule ────────────────────────────────────────────

    /// The level schedule for the current topology, rebuilding it if
    /// stale.
    pub fn schedule(&mut self) -> ArborResult<&LevelSchedule> {
        if self.schedule_dirty {
            self.rebuild_schedule()?;
        }
        Ok(&self.schedule)
    }

    pub fn schedule_is_stale(&self) -> bool {
        self.schedule_dirty
    }

    pub fn rebuild_schedule(&mut self) -> ArborResult<()> {
        self.schedule = LevelSchedule::build(&self.arena, self.roots.iter().copied())?;
        self.schedule_dirty = false;
        tracing::debug!(
            levels = self.schedule.len(),
            units = self.schedule.unit_count(),
            roots = self.roots.len(),
            "level schedule rebuilt"
        );
        Ok(())
    }

    /// Splits the world into the pieces one tick needs at the same time.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut BodyArena, &BTreeSet<BodyId>, &FieldRegistry, &LevelSchedule) {
        (&mut self.arena, &self.roots, &self.fields, &self.schedule)
    }
}
