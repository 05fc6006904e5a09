//! Phase 5: kinematic propagation, parents first.

use arbor_math::{skew, sqr};
use arbor_tree::{BodyArena, Joint, LevelSchedule, RigidBody, UnitOfWork};
use arbor_types::{ArborError, ArborResult, BodyId, JointId};
use rayon::prelude::*;

/// Places `joint` on its (already updated) parent, then derives the
/// child's pose and motion from the joint state.
///
/// # Panics
///
/// Panics if the joint or the child ends up with a non-finite value.
pub fn propagate(joint: &mut Joint, parent: &RigidBody, child: &mut RigidBody) {
    joint.update_transform(parent);
    assert!(joint.is_finite(), "joint {}→{} became non-finite", joint.parent, joint.child);

    child.update_transform(joint);

    let theta = joint.theta;
    child.angular_velocity = parent.angular_velocity + joint.orientation * theta.velocity;
    child.angular_acceleration = parent.angular_acceleration
        + joint.orientation * theta.acceleration
        + parent.angular_velocity.cross(child.angular_velocity);

    // Pivot relative to the child's centre of mass, world frame.
    let pivot_arm = child.pivot - child.center_of_mass;
    let joint_arm = joint.position - parent.center_of_mass;
    child.velocity = parent.velocity + parent.angular_velocity.cross(joint_arm)
        - child.angular_velocity.cross(pivot_arm);
    child.acceleration = joint.acceleration
        - (skew(child.angular_acceleration) + sqr(skew(child.angular_velocity))) * pivot_arm;

    assert!(child.is_finite(), "body {} became non-finite", joint.child);
}

type Propagated = (JointId, Joint, BodyId, RigidBody);

/// Propagates through `unit` on copies, parents first, leaving the arena
/// untouched.
pub fn propagate_unit(arena: &BodyArena, unit: &UnitOfWork) -> ArborResult<Vec<Propagated>> {
    let mut out: Vec<Propagated> = Vec::with_capacity(unit.len());
    for id in unit.top_down() {
        let mut child = arena.body(id)?.clone();
        let joint_id = child
            .parent_joint()
            .ok_or_else(|| ArborError::Topology(format!("scheduled body {id} has no parent joint")))?;
        let mut joint = arena.joint(joint_id)?.clone();

        let parent = match out.last() {
            Some((_, _, pid, p)) if *pid == joint.parent => p,
            _ => arena.body(joint.parent)?,
        };
        propagate(&mut joint, parent, &mut child);
        out.push((joint_id, joint, id, child));
    }
    Ok(out)
}

/// Updates every scheduled body, walking the levels from the top.
pub fn update_kinematics(
    arena: &mut BodyArena,
    schedule: &LevelSchedule,
    parallel: bool,
) -> ArborResult<()> {
    for level in schedule.levels().iter().rev() {
        if parallel {
            let shared: &BodyArena = arena;
            let results = level
                .par_iter()
                .map(|unit| propagate_unit(shared, unit))
                .collect::<ArborResult<Vec<_>>>()?;
            for (joint_id, joint, body_id, body) in results.into_iter().flatten() {
                *arena.joint_mut(joint_id)? = joint;
                *arena.body_mut(body_id)? = body;
            }
        } else {
            for unit in level {
                for id in unit.top_down() {
                    let joint_id = arena.body(id)?.parent_joint().ok_or_else(|| {
                        ArborError::Topology(format!("scheduled body {id} has no parent joint"))
                    })?;
                    let (joint, parent, child) = arena.joint_and_bodies_mut(joint_id)?;
                    propagate(joint, parent, child);
                }
            }
        }
    }
    Ok(())
}
