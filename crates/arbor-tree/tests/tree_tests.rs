//! Integration tests for arbor-tree.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_4, PI};

use arbor_math::{Mat3, Quat, Vec3};
use arbor_tree::generators::{binary_tree, chain, from_parents, BranchParams};
use arbor_tree::{
    BodyArena, BodyKind, CompositeBody, Joint, JointConfig, LevelSchedule, RigidBody,
};
use arbor_types::constants::UNIT_DENSITY;
use arbor_types::{ArborError, BodyId};
use proptest::prelude::*;

fn assert_vec3_near(actual: Vec3, expected: Vec3, tol: f32) {
    assert!(
        (actual - expected).abs().max_element() < tol,
        "expected {expected:?}, got {actual:?}"
    );
}

fn assert_mat3_near(actual: Mat3, expected: Mat3, tol: f32) {
    assert!(
        actual.abs_diff_eq(expected, tol),
        "expected {expected:?}, got {actual:?}"
    );
}

fn unit_internode() -> RigidBody {
    RigidBody::internode(1.0, 1.0, UNIT_DENSITY)
}

/// Static root carrying a straight chain of `n` unit internodes.
fn unit_chain(n: usize) -> (BodyArena, BodyId, Vec<BodyId>) {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let bodies = chain(&mut arena, root, n, &BranchParams::unit()).unwrap();
    (arena, root, bodies)
}

/// Children-first composite fold over the trees under `roots`.
fn compose(arena: &mut BodyArena, roots: &[BodyId]) {
    let schedule = LevelSchedule::build(arena, roots.iter().copied()).unwrap();
    let order: Vec<BodyId> = schedule
        .bodies_bottom_up()
        .into_iter()
        .chain(roots.iter().copied())
        .collect();
    for id in order {
        let mut composite = CompositeBody::of(arena.body(id).unwrap());
        for &j in arena.body(id).unwrap().child_joints() {
            let joint = arena.joint(j).unwrap();
            let child = arena.body(joint.child).unwrap();
            composite.accumulate(joint.position, &child.composite);
        }
        arena.body_mut(id).unwrap().composite = composite;
    }
}

// ─── Body Tests ───────────────────────────────────────────────

#[test]
fn internode_mass_properties() {
    let body = RigidBody::internode(2.0, 0.5, 3.0);
    let mass = PI * 0.25 * 2.0 * 3.0;
    assert!((body.mass - mass).abs() < 1e-5);

    let along = mass * 4.0 / 12.0;
    let across = mass * 0.25 / 4.0;
    let expected = Mat3::from_diagonal(Vec3::new(along + across, 2.0 * across, along + across));
    assert_mat3_near(body.local_inertia, expected, 1e-5);
    assert_eq!(body.local_pivot, Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(body.pivot, Vec3::new(0.0, -1.0, 0.0));
}

#[test]
fn unit_internode_has_unit_mass() {
    let body = unit_internode();
    assert!((body.mass - 1.0).abs() < 1e-6);
    assert!((body.local_inertia.z_axis.z - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn static_root_is_massless_root() {
    let root = RigidBody::static_root();
    assert!(root.is_static());
    assert!(root.is_root());
    assert!(root.is_leaf());
    assert_eq!(root.mass, 0.0);
    assert_eq!(root.parent_joint(), None);
}

#[test]
fn apply_force_on_root_has_no_lever_arm() {
    let mut body = RigidBody::dynamic_root(1.0, Mat3::IDENTITY);
    body.apply_force(Vec3::X, Vec3::Z);
    assert_eq!(body.force, Vec3::X);
    assert_eq!(body.torque, Vec3::Z);

    body.reset_forces();
    assert_eq!(body.force, Vec3::ZERO);
    assert_eq!(body.torque, Vec3::ZERO);
}

#[test]
fn apply_force_on_articulated_body_adds_pivot_torque() {
    let (mut arena, _, bodies) = unit_chain(1);
    let body = arena.body_mut(bodies[0]).unwrap();
    body.apply_force(Vec3::X, Vec3::ZERO);
    // Arm from pivot to COM is (0, 0.5, 0).
    assert_vec3_near(body.torque, Vec3::new(0.0, 0.0, -0.5), 1e-6);
}

#[test]
fn apply_force_at_tip_doubles_lever_arm() {
    let (mut arena, _, bodies) = unit_chain(1);
    let body = arena.body_mut(bodies[0]).unwrap();
    body.apply_force_at(Vec3::X, 1.0).unwrap();
    assert_vec3_near(body.torque, Vec3::new(0.0, 0.0, -1.0), 1e-6);

    body.reset_forces();
    body.apply_force_at(Vec3::X, 0.0).unwrap();
    assert_vec3_near(body.torque, Vec3::ZERO, 1e-6);
}

#[test]
fn apply_force_at_rejects_out_of_range_distance() {
    let mut body = unit_internode();
    assert!(matches!(
        body.apply_force_at(Vec3::X, 1.5),
        Err(ArborError::InvalidArgument(_))
    ));
    assert!(matches!(
        body.apply_force_at(Vec3::X, -0.1),
        Err(ArborError::InvalidArgument(_))
    ));
    assert_eq!(body.force, Vec3::ZERO);
}

#[test]
fn apply_force_at_requires_segment() {
    let mut body = RigidBody::dynamic_root(1.0, Mat3::IDENTITY);
    assert!(body.apply_force_at(Vec3::X, 0.5).is_err());
}

#[test]
fn with_pivot_at_moves_center_of_mass() {
    let body = unit_internode().with_pivot_at(Vec3::new(2.0, 0.0, 0.0));
    assert_vec3_near(body.pivot, Vec3::new(2.0, 0.0, 0.0), 1e-6);
    assert_vec3_near(body.center_of_mass, Vec3::new(2.0, 0.5, 0.0), 1e-6);
}

#[test]
fn kinetic_energy_of_spinning_body() {
    let mut body = RigidBody::dynamic_root(2.0, Mat3::from_diagonal(Vec3::splat(3.0)));
    body.velocity = Vec3::new(1.0, 0.0, 0.0);
    body.angular_velocity = Vec3::new(0.0, 2.0, 0.0);
    // 0.5·2·1 + 0.5·3·4
    assert!((body.kinetic_energy() - 7.0).abs() < 1e-6);
}

#[test]
fn rigid_body_serde_roundtrip() {
    let body = unit_internode();
    let json = serde_json::to_string(&body).unwrap();
    let back: RigidBody = serde_json::from_str(&json).unwrap();
    assert_eq!(back.mass, body.mass);
    assert_eq!(back.local_pivot, body.local_pivot);
    assert_eq!(back.kind, body.kind);
}

// ─── Joint Tests ──────────────────────────────────────────────

#[test]
fn joint_config_defaults_never_break() {
    let config = JointConfig::default();
    assert!(config.torque_threshold.is_infinite());
    assert_eq!(config.local_orientation, Quat::IDENTITY);
    assert_eq!(config.local_position, Vec3::ZERO);
}

#[test]
fn joint_transform_follows_parent() {
    let mut parent = unit_internode().with_orientation(Quat::from_rotation_z(PI / 2.0));
    parent.angular_velocity = Vec3::new(0.0, 0.0, 2.0);
    let config = JointConfig::unit().at(Vec3::new(0.0, 1.0, 0.0));
    let mut joint = Joint::new(BodyId(0), BodyId(1), &config);
    joint.update_transform(&parent);

    // Tip of a segment rotated a quarter turn about z points along −x.
    assert_vec3_near(joint.position, parent.pivot + Vec3::new(-1.0, 0.0, 0.0), 1e-6);
    // Centripetal acceleration towards the parent's COM: ω²·r.
    let r = joint.position - parent.center_of_mass;
    assert_vec3_near(joint.acceleration, -4.0 * r, 1e-5);
}

#[test]
fn joint_space_transforms_invert_orientation() {
    let config = JointConfig::unit().rotated(Quat::from_rotation_z(FRAC_PI_4));
    let joint = Joint::new(BodyId(0), BodyId(1), &config);
    let world = joint.orientation * Vec3::X;
    assert_vec3_near(joint.to_joint_space(world), Vec3::X, 1e-6);

    let tensor = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
    let r = Mat3::from_quat(joint.orientation);
    let rotated = r * tensor * r.transpose();
    assert_mat3_near(joint.tensor_to_joint_space(rotated), tensor, 1e-5);
}

// ─── Arena Tests ──────────────────────────────────────────────

#[test]
fn insert_assigns_dense_ids() {
    let mut arena = BodyArena::new();
    let a = arena.insert(RigidBody::static_root());
    let b = arena.insert(unit_internode());
    assert_eq!(a, BodyId(0));
    assert_eq!(b, BodyId(1));
    assert_eq!(arena.body_count(), 2);
}

#[test]
fn attach_places_child_on_parent_tip() {
    let (arena, root, bodies) = unit_chain(2);
    let b0 = arena.body(bodies[0]).unwrap();
    let b1 = arena.body(bodies[1]).unwrap();

    assert_vec3_near(b0.pivot, Vec3::ZERO, 1e-6);
    assert_vec3_near(b0.center_of_mass, Vec3::new(0.0, 0.5, 0.0), 1e-6);
    assert_vec3_near(b1.pivot, Vec3::new(0.0, 1.0, 0.0), 1e-6);
    assert_vec3_near(b1.center_of_mass, Vec3::new(0.0, 1.5, 0.0), 1e-6);

    assert_eq!(arena.parent(bodies[1]), Some(bodies[0]));
    assert_eq!(arena.parent(bodies[0]), Some(root));
    assert_eq!(arena.children(root), vec![bodies[0]]);
    assert!(matches!(b1.kind, BodyKind::Articulated { .. }));
    assert_eq!(arena.joint_count(), 2);
}

#[test]
fn attach_with_rest_rotation_tilts_child() {
    let (mut arena, _, bodies) = unit_chain(1);
    let child = arena.insert(unit_internode());
    let rest = Quat::from_rotation_z(-FRAC_PI_4);
    arena
        .attach(bodies[0], child, &JointConfig::unit().at(Vec3::Y).rotated(rest))
        .unwrap();

    let body = arena.body(child).unwrap();
    assert_vec3_near(body.pivot, Vec3::Y, 1e-6);
    assert_vec3_near(body.center_of_mass, Vec3::Y + rest * Vec3::new(0.0, 0.5, 0.0), 1e-6);
}

#[test]
fn attach_rejects_self_and_cycles() {
    let (mut arena, root, bodies) = unit_chain(2);
    let free = arena.insert(unit_internode());
    assert!(matches!(
        arena.attach(free, free, &JointConfig::default()),
        Err(ArborError::Topology(_))
    ));

    // bodies[1] is already articulated.
    assert!(matches!(
        arena.attach(free, bodies[1], &JointConfig::default()),
        Err(ArborError::Topology(_))
    ));
    // Static roots never become children.
    assert!(matches!(
        arena.attach(bodies[1], root, &JointConfig::default()),
        Err(ArborError::Topology(_))
    ));

    // A free subtree cannot be hung below its own descendant.
    let top = arena.insert(unit_internode());
    let below = arena.insert(unit_internode());
    arena.attach(top, below, &JointConfig::default()).unwrap();
    assert!(matches!(
        arena.attach(below, top, &JointConfig::default()),
        Err(ArborError::Topology(_))
    ));
}

#[test]
fn attach_unknown_body_fails() {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    assert!(matches!(
        arena.attach(root, BodyId(9), &JointConfig::default()),
        Err(ArborError::UnknownBody(BodyId(9)))
    ));
}

#[test]
fn detach_turns_child_into_dynamic_root() {
    let (mut arena, _, bodies) = unit_chain(3);
    let joint = arena.body(bodies[1]).unwrap().parent_joint().unwrap();
    arena.body_mut(bodies[1]).unwrap().angular_velocity = Vec3::Z;

    let freed = arena.detach(joint).unwrap();
    assert_eq!(freed, bodies[1]);
    let body = arena.body(freed).unwrap();
    assert_eq!(body.kind, BodyKind::Dynamic);
    assert!(body.angular_momentum.z > 0.0);
    assert!(arena.children(bodies[0]).is_empty());
    assert_eq!(arena.children(bodies[1]), vec![bodies[2]]);
    assert!(matches!(arena.joint(joint), Err(ArborError::UnknownJoint(_))));
    assert_eq!(arena.root_of(bodies[2]).unwrap(), bodies[1]);
}

#[test]
fn remove_subtree_drops_bodies_and_joints() {
    let (mut arena, root, _) = unit_chain(3);
    let removed = arena.remove_subtree(root).unwrap();
    assert_eq!(removed.len(), 4);
    assert_eq!(arena.body_count(), 0);
    assert_eq!(arena.joint_count(), 0);
}

#[test]
fn remove_subtree_requires_root() {
    let (mut arena, _, bodies) = unit_chain(2);
    assert!(matches!(
        arena.remove_subtree(bodies[1]),
        Err(ArborError::Topology(_))
    ));
}

#[test]
fn flattened_is_breadth_first() {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let bodies = binary_tree(&mut arena, root, 2, &BranchParams::unit()).unwrap();
    assert_eq!(bodies.len(), 7);

    let order = arena.flattened(root).unwrap();
    assert_eq!(order[0], root);
    assert_eq!(&order[1..], &bodies[..]);

    let leaves = arena.leaves(root).unwrap();
    assert_eq!(leaves, bodies[3..].to_vec());
}

#[test]
fn is_ancestor_walks_parents() {
    let (arena, root, bodies) = unit_chain(3);
    assert!(arena.is_ancestor(root, bodies[2]));
    assert!(arena.is_ancestor(bodies[1], bodies[2]));
    assert!(arena.is_ancestor(bodies[2], bodies[2]));
    assert!(!arena.is_ancestor(bodies[2], bodies[0]));
}

#[test]
fn joint_and_bodies_mut_splits_borrows() {
    let (mut arena, _, bodies) = unit_chain(2);
    let joint = arena.body(bodies[1]).unwrap().parent_joint().unwrap();
    let (joint, parent, child) = arena.joint_and_bodies_mut(joint).unwrap();
    assert_eq!(joint.child, bodies[1]);
    assert_vec3_near(parent.pivot, Vec3::ZERO, 1e-6);
    child.angular_velocity = Vec3::X;
    assert_eq!(arena.body(bodies[1]).unwrap().angular_velocity, Vec3::X);
}

// ─── Composite Tests ──────────────────────────────────────────

#[test]
fn composite_of_leaf_is_its_own_state() {
    let body = unit_internode();
    let composite = CompositeBody::of(&body);
    assert_eq!(composite.mass, body.mass);
    assert_eq!(composite.center_of_mass, body.center_of_mass);
    assert_eq!(composite.pivot, body.pivot);
}

#[test]
fn composite_of_two_segment_chain() {
    let (mut arena, root, bodies) = unit_chain(2);
    arena
        .body_mut(bodies[1])
        .unwrap()
        .apply_force(Vec3::X, Vec3::ZERO);
    compose(&mut arena, &[root]);

    let c0 = arena.body(bodies[0]).unwrap().composite;
    assert!((c0.mass - 2.0).abs() < 1e-6);
    assert_vec3_near(c0.center_of_mass, Vec3::new(0.0, 1.0, 0.0), 1e-6);
    assert_vec3_near(c0.force, Vec3::X, 1e-6);
    // (b1.com − b0.pivot) × F
    assert_vec3_near(c0.torque, Vec3::new(0.0, 0.0, -1.5), 1e-6);

    // Parallel axis: each segment contributes 1/3 + 0.5².
    let expected = Mat3::from_diagonal(Vec3::new(7.0 / 6.0, 1.0, 7.0 / 6.0));
    assert_mat3_near(c0.inertia, expected, 1e-5);

    let c_root = arena.body(root).unwrap().composite;
    assert!((c_root.mass - 2.0).abs() < 1e-6);
}

#[test]
fn composite_of_massless_root_has_child_center() {
    let mut root = CompositeBody::of(&RigidBody::static_root());
    let child = CompositeBody::of(&unit_internode().with_pivot_at(Vec3::ZERO));
    root.accumulate(Vec3::ZERO, &child);
    assert_vec3_near(root.center_of_mass, child.center_of_mass, 1e-6);
    assert_mat3_near(root.inertia, child.inertia, 1e-6);
}

// ─── Schedule Tests ───────────────────────────────────────────

#[test]
fn chain_levels_into_single_unit() {
    let (arena, root, bodies) = unit_chain(3);
    let schedule = LevelSchedule::build(&arena, [root]).unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule.unit_count(), 1);
    assert_eq!(schedule.body_count(), 3);

    let unit = &schedule.levels()[0][0];
    assert_eq!(unit.body, bodies[2]);
    assert_eq!(unit.climbers, vec![bodies[1], bodies[0]]);
    assert_eq!(schedule.bodies_top_down(), bodies);
}

#[test]
fn binary_tree_levels_by_height() {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let bodies = binary_tree(&mut arena, root, 1, &BranchParams::unit()).unwrap();
    let schedule = LevelSchedule::build(&arena, [root]).unwrap();

    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule.levels()[0].len(), 2);
    assert_eq!(schedule.levels()[1].len(), 1);
    assert_eq!(schedule.levels()[1][0].body, bodies[0]);
    assert!(schedule.levels()[1][0].climbers.is_empty());
}

#[test]
fn uneven_subtrees_wait_for_deeper_branch() {
    // root ─ a ┬ b
    //          └ c ┬ d
    //              └ e
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let bodies = from_parents(&mut arena, root, &[0, 1, 1, 3, 3], &BranchParams::unit()).unwrap();
    let (a, c) = (bodies[0], bodies[2]);

    let schedule = LevelSchedule::build(&arena, [root]).unwrap();
    assert_eq!(schedule.len(), 3);
    assert_eq!(schedule.levels()[1][0].body, c);
    assert_eq!(schedule.levels()[2][0].body, a);
    assert_eq!(schedule.body_count(), 5);
}

#[test]
fn forest_levels_merge_index_wise() {
    let (mut arena, root_a, _) = unit_chain(2);
    let root_b = arena.insert(RigidBody::static_root());
    binary_tree(&mut arena, root_b, 1, &BranchParams::unit()).unwrap();

    let schedule = LevelSchedule::build(&arena, [root_a, root_b]).unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule.levels()[0].len(), 3);
    assert_eq!(schedule.levels()[1].len(), 1);
    assert_eq!(schedule.body_count(), 5);
}

#[test]
fn lone_root_yields_empty_schedule() {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let schedule = LevelSchedule::build(&arena, [root]).unwrap();
    assert!(schedule.is_empty());
    assert_eq!(schedule.unit_count(), 0);
}

// ─── Property Tests ───────────────────────────────────────────

fn parent_table() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 1..40)
        .prop_map(|raw| raw.iter().enumerate().map(|(i, r)| r % (i + 1)).collect())
}

proptest! {
    #[test]
    fn prop_schedule_visits_once_children_first(parents in parent_table()) {
        let mut arena = BodyArena::new();
        let root = arena.insert(RigidBody::static_root());
        let bodies = from_parents(&mut arena, root, &parents, &BranchParams::unit()).unwrap();
        let schedule = LevelSchedule::build(&arena, [root]).unwrap();

        // Position of every scheduled body: (level, unit, index in unit).
        let mut placed: HashMap<BodyId, (usize, usize, usize)> = HashMap::new();
        for (level, units) in schedule.levels().iter().enumerate() {
            for (u, unit) in units.iter().enumerate() {
                for (k, body) in unit.bottom_up().enumerate() {
                    prop_assert!(placed.insert(body, (level, u, k)).is_none());
                }
            }
        }
        prop_assert_eq!(placed.len(), bodies.len());
        prop_assert!(!placed.contains_key(&root));

        for (&body, &(level, unit, k)) in &placed {
            for child in arena.children(body) {
                let (cl, cu, ck) = placed[&child];
                let same_unit_below = cl == level && cu == unit && ck < k;
                prop_assert!(cl < level || same_unit_below);
            }
        }
    }

    #[test]
    fn prop_composite_mass_equals_subtree_mass(parents in parent_table()) {
        let mut arena = BodyArena::new();
        let root = arena.insert(RigidBody::static_root());
        let bodies = from_parents(&mut arena, root, &parents, &BranchParams::unit()).unwrap();
        compose(&mut arena, &[root]);

        for id in std::iter::once(root).chain(bodies) {
            let expected = arena.subtree_mass(id).unwrap();
            let actual = arena.body(id).unwrap().composite.mass;
            prop_assert!((actual - expected).abs() <= 1e-4 * expected.max(1.0));
        }
    }
}
