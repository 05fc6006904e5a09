//! Phase 4: analytic joint solve.
//!
//! Each joint is a 3-DOF rotational spring-damper driven by the torque of
//! the subtree hanging from it:
//!
//! ```text
//! I·θ'' + β·k·θ' + k·θ = τ
//! ```
//!
//! `I` (the subtree inertia about the joint) couples the three axes. The
//! generalized eigendecomposition of `(k·Id, I)` decouples them into three
//! scalar ODEs with closed-form solutions, which are evaluated `dt` after
//! the joint's current state and mapped back.

use arbor_math::{
    cholesky, eigen_symmetric3x3, evaluate_differential, skew, sqr, EigenMethod, Mat3, Vec3,
};
use arbor_tree::{BodyArena, Joint, JointState, LevelSchedule, RigidBody};
use arbor_types::{ArborResult, JointId};
use rayon::prelude::*;

use crate::config::SimulatorConfig;

/// Outcome of solving one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSolution {
    pub state: JointState,
    /// Eigen path used for the decoupling.
    pub method: EigenMethod,
}

/// Joint-space dynamics of the subtree below a joint.
#[derive(Debug, Clone, Copy)]
pub struct JointSpace {
    /// Inertia about the joint point.
    pub inertia: Mat3,
    /// External plus fictitious torque.
    pub torque: Vec3,
}

/// Expresses the child's composite in the joint frame.
pub fn joint_space(
    joint: &Joint,
    parent: &RigidBody,
    child: &RigidBody,
    config: &SimulatorConfig,
) -> JointSpace {
    let composite = &child.composite;
    let pr = joint.to_joint_space(composite.center_of_mass - child.pivot);
    let inertia =
        joint.tensor_to_joint_space(composite.inertia) - composite.mass * sqr(skew(pr));
    let torque = joint.to_joint_space(composite.torque);

    let [m_i, m_ii, m_iii] = config.torque_fictitious_multipliers;
    let mut fictitious = Vec3::ZERO;
    if m_i != 0.0 {
        let linear = joint.to_joint_space(joint.acceleration);
        fictitious += m_i * (-composite.mass * (skew(pr) * linear));
    }
    if m_ii != 0.0 || m_iii != 0.0 {
        let parent_alpha = joint.to_joint_space(parent.angular_acceleration);
        let parent_omega = joint.to_joint_space(parent.angular_velocity);
        let child_omega = joint.to_joint_space(child.angular_velocity);
        if m_ii != 0.0 {
            fictitious += m_ii * -(inertia * (parent_alpha + parent_omega.cross(child_omega)));
        }
        if m_iii != 0.0 {
            fictitious += m_iii * -child_omega.cross(inertia * child_omega);
        }
    }

    JointSpace {
        inertia,
        torque: torque + fictitious,
    }
}

/// Advances one joint by `dt` from its current θ.
///
/// # Panics
///
/// Panics if the resulting state is not finite.
pub fn solve_joint(
    joint: &Joint,
    parent: &RigidBody,
    child: &RigidBody,
    config: &SimulatorConfig,
    dt: f32,
) -> ArborResult<JointSolution> {
    let JointSpace { inertia, torque } = joint_space(joint, parent, child, config);

    // Generalized eigenproblem K·x = λ·I·x, reduced with I = L·Lᵀ to the
    // symmetric A = L⁻¹·K·L⁻ᵀ.
    let l = cholesky(inertia)?;
    let l_inv = l.inverse();
    let l_inv_t = l_inv.transpose();
    let a = l_inv * (joint.stiffness * Mat3::IDENTITY) * l_inv_t;
    let eigen = eigen_symmetric3x3(a, config.max_eigen_sweeps)?;

    // Decoupled coordinates: θ = U·Θ.
    let u = l_inv_t * eigen.vectors;
    let u_inv = u.inverse();
    let torque_d = u.transpose() * torque;
    let angle_d = u_inv * joint.theta.angle;
    let velocity_d = u_inv * joint.theta.velocity;

    let mut rows = [Vec3::ZERO; 3];
    for (i, row) in rows.iter_mut().enumerate() {
        let lambda = eigen.values[i];
        *row = evaluate_differential(
            1.0,
            joint.damping * lambda,
            lambda,
            torque_d[i],
            angle_d[i],
            velocity_d[i],
            dt,
        )?;
    }
    // Row i holds (value, first, second derivative) of axis i; the state
    // matrix wants angle / velocity / acceleration as columns.
    let theta_d = Mat3::from_cols(rows[0], rows[1], rows[2]).transpose();
    let state = JointState::from_mat3(u * theta_d);

    assert!(state.is_finite(), "joint state became non-finite: {state:?}");
    Ok(JointSolution {
        state,
        method: eigen.method,
    })
}

/// Solves the parent joint of every scheduled body and commits the new θ
/// values.
///
/// Bodies outside the simulated forest are never touched. Nothing is
/// committed if any joint fails. Returns the number of joints solved and
/// how many needed the eigen fallback.
pub fn update_joints(
    arena: &mut BodyArena,
    schedule: &LevelSchedule,
    config: &SimulatorConfig,
    dt: f32,
) -> ArborResult<(usize, u32)> {
    let ids: Vec<JointId> = schedule
        .bodies_bottom_up()
        .into_iter()
        .filter_map(|body| arena.body(body).ok()?.parent_joint())
        .collect();

    let solve = |arena: &BodyArena, id: JointId| -> ArborResult<(JointId, JointSolution)> {
        let joint = arena.joint(id)?;
        let parent = arena.body(joint.parent)?;
        let child = arena.body(joint.child)?;
        solve_joint(joint, parent, child, config, dt)
            .map(|solution| (id, solution))
            .map_err(|e| e.in_joint(id))
    };

    let shared: &BodyArena = arena;
    let solutions = if config.parallel {
        ids.par_iter()
            .map(|&id| solve(shared, id))
            .collect::<ArborResult<Vec<_>>>()?
    } else {
        ids.iter()
            .map(|&id| solve(shared, id))
            .collect::<ArborResult<Vec<_>>>()?
    };

    let mut fallbacks = 0;
    for (id, solution) in &solutions {
        if solution.method == EigenMethod::QlFallback {
            fallbacks += 1;
            tracing::trace!(joint = %id, "eigen decomposition fell back to QL");
        }
        arena.joint_mut(*id)?.theta = solution.state;
    }

    Ok((solutions.len(), fallbacks))
}
