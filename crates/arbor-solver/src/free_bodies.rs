//! Phase 6: explicit integration of free roots.

use arbor_math::{Quat, Vec3};
use arbor_tree::{BodyArena, BodyKind, RigidBody};
use arbor_types::constants::EPSILON;
use arbor_types::{ArborResult, BodyId};

/// Semi-implicit Euler step of a `Dynamic` root.
///
/// A root that carries a subtree moves with its composite mass, force,
/// torque and inertia. Static and articulated bodies are left alone.
///
/// # Panics
///
/// Panics if the body ends up with a non-finite value.
pub fn integrate(body: &mut RigidBody, dt: f32) {
    if body.kind != BodyKind::Dynamic {
        return;
    }

    let (mass, force, torque, inertia) = if body.is_leaf() {
        (body.mass, body.force, body.torque, body.inertia)
    } else {
        let c = &body.composite;
        (c.mass, c.force, c.torque, c.inertia)
    };
    if mass <= 0.0 {
        return;
    }

    body.acceleration = force / mass;
    body.angular_momentum += dt * torque;
    body.velocity += dt * body.acceleration;
    body.angular_velocity = if inertia.determinant().abs() > EPSILON {
        inertia.inverse() * body.angular_momentum
    } else {
        Vec3::ZERO
    };

    body.center_of_mass += dt * body.velocity;
    let spin = Quat::from_xyzw(
        body.angular_velocity.x,
        body.angular_velocity.y,
        body.angular_velocity.z,
        0.0,
    );
    body.orientation = (body.orientation + spin * body.orientation * (dt / 2.0)).normalize();
    body.refresh_pose();

    assert!(body.is_finite(), "free body became non-finite");
}

/// Integrates every root in `roots`. Returns how many moved.
pub fn update_free_bodies(
    arena: &mut BodyArena,
    roots: impl IntoIterator<Item = BodyId>,
    dt: f32,
) -> ArborResult<usize> {
    let mut moved = 0;
    for id in roots {
        let body = arena.body_mut(id)?;
        if body.kind == BodyKind::Dynamic {
            integrate(body, dt);
            moved += 1;
        }
    }
    Ok(moved)
}
