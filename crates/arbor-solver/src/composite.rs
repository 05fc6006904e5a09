//! Phase 2: composite bodies, children first.

use std::collections::BTreeSet;

use arbor_tree::{BodyArena, CompositeBody, LevelSchedule, UnitOfWork};
use arbor_types::{ArborResult, BodyId};
use rayon::prelude::*;

/// Builds the composite of `id` from its own state and the stored
/// composites of its children.
pub fn compose_body(arena: &BodyArena, id: BodyId) -> ArborResult<CompositeBody> {
    compose_with(arena, id, &[])
}

/// Like [`compose_body`], but children found in `fresh` take their
/// composite from there instead of the arena.
fn compose_with(
    arena: &BodyArena,
    id: BodyId,
    fresh: &[(BodyId, CompositeBody)],
) -> ArborResult<CompositeBody> {
    let body = arena.body(id)?;
    let mut composite = CompositeBody::of(body);
    for &joint_id in body.child_joints() {
        let joint = arena.joint(joint_id)?;
        let child = match fresh.iter().rev().find(|(c, _)| *c == joint.child) {
            Some((_, c)) => *c,
            None => arena.body(joint.child)?.composite,
        };
        composite.accumulate(joint.position, &child);
    }
    Ok(composite)
}

/// Composites for every body of `unit`, bottom-up, without touching the
/// arena.
pub fn compose_unit(
    arena: &BodyArena,
    unit: &UnitOfWork,
) -> ArborResult<Vec<(BodyId, CompositeBody)>> {
    let mut out: Vec<(BodyId, CompositeBody)> = Vec::with_capacity(unit.len());
    for id in unit.bottom_up() {
        let composite = compose_with(arena, id, &out)?;
        out.push((id, composite));
    }
    Ok(out)
}

/// Rebuilds every composite: scheduled units level by level, then the
/// roots.
pub fn update_composites(
    arena: &mut BodyArena,
    schedule: &LevelSchedule,
    roots: &BTreeSet<BodyId>,
    parallel: bool,
) -> ArborResult<()> {
    for level in schedule.levels() {
        if parallel {
            let shared: &BodyArena = arena;
            let results = level
                .par_iter()
                .map(|unit| compose_unit(shared, unit))
                .collect::<ArborResult<Vec<_>>>()?;
            for (id, composite) in results.into_iter().flatten() {
                arena.body_mut(id)?.composite = composite;
            }
        } else {
            for unit in level {
                for (id, composite) in compose_unit(arena, unit)? {
                    arena.body_mut(id)?.composite = composite;
                }
            }
        }
    }

    for &root in roots {
        let composite = compose_body(arena, root)?;
        arena.body_mut(root)?.composite = composite;
    }
    Ok(())
}
