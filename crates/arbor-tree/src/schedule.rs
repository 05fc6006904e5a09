//! Tree leveling.
//!
//! Partitions a forest into ordered levels of independent units of work.
//! Every unit in a level only depends on bodies committed by earlier
//! levels, so units of one level can be processed concurrently. Walking
//! the levels forwards gives a children-first order (composite
//! aggregation); walking them backwards gives parents-first (kinematics).
//!
//! Chains of single-child bodies are folded into one unit: starting from a
//! ready body, the walk climbs through every ancestor whose only child is
//! the body just visited. Roots are never part of a unit.

use std::collections::{BTreeSet, HashSet};

use arbor_types::{ArborError, ArborResult, BodyId};

use crate::arena::BodyArena;

/// A body plus the single-child ancestors climbed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    /// The body the climb started from.
    pub body: BodyId,
    /// Ancestors above `body`, nearest first. Never includes a root.
    pub climbers: Vec<BodyId>,
}

impl UnitOfWork {
    /// Children-first order: `body`, then climbers upwards.
    pub fn bottom_up(&self) -> impl Iterator<Item = BodyId> + '_ {
        std::iter::once(self.body).chain(self.climbers.iter().copied())
    }

    /// Parents-first order: climbers downwards, then `body`.
    pub fn top_down(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.climbers
            .iter()
            .rev()
            .copied()
            .chain(std::iter::once(self.body))
    }

    pub fn len(&self) -> usize {
        1 + self.climbers.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Ordered levels of units covering every non-root body of a forest
/// exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSchedule {
    levels: Vec<Vec<UnitOfWork>>,
}

impl LevelSchedule {
    /// Levels the trees under `roots`. Levels of different trees are
    /// merged index-wise.
    pub fn build(
        arena: &BodyArena,
        roots: impl IntoIterator<Item = BodyId>,
    ) -> ArborResult<Self> {
        let mut levels: Vec<Vec<UnitOfWork>> = Vec::new();
        for root in roots {
            let tree = level_tree(arena, root)?;
            if levels.len() < tree.len() {
                levels.resize_with(tree.len(), Vec::new);
            }
            for (merged, level) in levels.iter_mut().zip(tree) {
                merged.extend(level);
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Vec<UnitOfWork>] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn unit_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Number of bodies covered by all units.
    pub fn body_count(&self) -> usize {
        self.units_bottom_up().map(UnitOfWork::len).sum()
    }

    /// Units level by level, first level first.
    pub fn units_bottom_up(&self) -> impl Iterator<Item = &UnitOfWork> {
        self.levels.iter().flatten()
    }

    /// Bodies in children-first order.
    pub fn bodies_bottom_up(&self) -> Vec<BodyId> {
        self.units_bottom_up()
            .flat_map(UnitOfWork::bottom_up)
            .collect()
    }

    /// Bodies in parents-first order.
    pub fn bodies_top_down(&self) -> Vec<BodyId> {
        self.levels
            .iter()
            .rev()
            .flat_map(|level| level.iter().flat_map(UnitOfWork::top_down))
            .collect()
    }
}

fn level_tree(arena: &BodyArena, root: BodyId) -> ArborResult<Vec<Vec<UnitOfWork>>> {
    let mut levels = Vec::new();
    let mut committed: HashSet<BodyId> = HashSet::new();
    let mut frontier: BTreeSet<BodyId> = arena.leaves(root)?.into_iter().collect();

    while !frontier.is_empty() {
        let mut units = Vec::new();
        let mut claimed: HashSet<BodyId> = HashSet::new();
        let mut next: BTreeSet<BodyId> = BTreeSet::new();

        for body in frontier {
            if committed.contains(&body) || claimed.contains(&body) {
                continue;
            }
            let ready = arena
                .children(body)
                .iter()
                .all(|child| committed.contains(child));
            if !ready {
                next.insert(body);
                continue;
            }

            let mut climbers = Vec::new();
            let mut last = body;
            while let Some(parent) = arena.parent(last) {
                if arena.body(parent)?.child_joints().len() != 1 {
                    break;
                }
                claimed.insert(parent);
                if arena.parent(parent).is_some() {
                    climbers.push(parent);
                }
                last = parent;
            }

            claimed.insert(body);
            if arena.parent(body).is_some() {
                units.push(UnitOfWork { body, climbers });
            }
            if let Some(parent) = arena.parent(last) {
                next.insert(parent);
            }
        }

        if claimed.is_empty() && !next.is_empty() {
            return Err(ArborError::Topology(format!(
                "leveling of {root} stalled with {} pending bodies",
                next.len()
            )));
        }
        committed.extend(claimed);
        if !units.is_empty() {
            levels.push(units);
        }
        frontier = next;
    }

    Ok(levels)
}
