//! Integration tests for arbor-fields.

use arbor_fields::{
    AttractorField, FieldRegistry, GravityField, Noise, PhysicsField, WindField,
};
use arbor_math::{Mat3, Vec2, Vec3};
use arbor_tree::generators::{chain, BranchParams};
use arbor_tree::{BodyArena, RigidBody};
use arbor_types::constants::{GRAVITY, UNIT_DENSITY};
use arbor_types::{ArborError, FieldId};
use proptest::prelude::*;

fn assert_vec3_near(actual: Vec3, expected: Vec3, tol: f32) {
    assert!(
        (actual - expected).abs().max_element() < tol,
        "expected {expected:?}, got {actual:?}"
    );
}

fn point_mass(mass: f32, at: Vec3) -> RigidBody {
    RigidBody::dynamic_root(mass, Mat3::IDENTITY).with_pivot_at(at)
}

// ─── Gravity Tests ────────────────────────────────────────────

#[test]
fn gravity_scales_with_mass() {
    let field = GravityField::default();
    let body = point_mass(2.0, Vec3::ZERO);
    assert_vec3_near(field.force(&body, 0.0), Vec3::new(0.0, -2.0 * GRAVITY, 0.0), 1e-5);
    assert!(field.torque(&body, 0.0).is_none());
    assert!(field.applies_to(Vec3::splat(1.0e6)));
}

#[test]
fn gravity_on_segment_adds_pivot_torque() {
    let mut arena = BodyArena::new();
    let root = arena.insert(RigidBody::static_root());
    let bodies = chain(&mut arena, root, 1, &BranchParams::unit()).unwrap();
    let field = GravityField::new(Vec3::new(-1.0, 0.0, 0.0));

    let body = arena.body_mut(bodies[0]).unwrap();
    field.apply(body, 0.0);
    assert_vec3_near(body.force, Vec3::new(-1.0, 0.0, 0.0), 1e-5);
    // (0, 0.5, 0) × (−1, 0, 0)
    assert_vec3_near(body.torque, Vec3::new(0.0, 0.0, 0.5), 1e-5);
}

// ─── Attractor Tests ──────────────────────────────────────────

#[test]
fn attractor_pulls_towards_position() {
    let field = AttractorField::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
    let body = point_mass(1.0, Vec3::ZERO);
    let force = field.force(&body, 0.0);
    assert!(force.x > 0.0);
    assert!(force.y.abs() < 1e-6 && force.z.abs() < 1e-6);
}

#[test]
fn attractor_is_finite_at_its_centre() {
    let field = AttractorField::new(Vec3::ZERO, 10.0);
    let body = point_mass(1.0, Vec3::ZERO);
    let force = field.force(&body, 0.0);
    assert!(force.is_finite());
    assert_eq!(force, Vec3::ZERO);
}

#[test]
fn attractor_falls_off_with_distance() {
    let field = AttractorField {
        softening: 0.0,
        ..AttractorField::new(Vec3::ZERO, 1.0)
    };
    let near = field.force(&point_mass(1.0, Vec3::X), 0.0).length();
    let far = field.force(&point_mass(1.0, 2.0 * Vec3::X), 0.0).length();
    assert!((near / far - 4.0).abs() < 1e-4);
}

#[test]
fn bounded_field_region_is_inclusive() {
    let field = AttractorField::new(Vec3::ZERO, 1.0).bounded(Vec3::splat(1.0));
    assert!(field.applies_to(Vec3::ZERO));
    assert!(field.applies_to(Vec3::new(1.0, -1.0, 1.0)));
    assert!(!field.applies_to(Vec3::new(1.01, 0.0, 0.0)));
}

// ─── Noise & Wind Tests ───────────────────────────────────────

#[test]
fn noise_is_deterministic() {
    let noise = Noise::default();
    let st = Vec2::new(0.3, 7.1);
    assert_eq!(noise.fbm(st, 1.0), noise.fbm(st, 1.0));
    assert_eq!(Noise::random(1.0), 1.0f32.sin().fract());
}

#[test]
fn noise_value_matches_corner_hashes() {
    let corner = Vec2::new(3.0, -2.0);
    assert_eq!(Noise::value(corner), Noise::random2(corner));
}

#[test]
fn wind_blows_along_direction() {
    let field = WindField::new(Vec3::new(0.0, 0.0, 2.0), 0.0).with_base(3.0);
    assert_vec3_near(field.direction, Vec3::Z, 1e-6);

    let body = RigidBody::internode(2.0, 0.25, UNIT_DENSITY);
    // Exposure = 2·r·l = 1.
    assert_vec3_near(field.force(&body, 5.0), Vec3::new(0.0, 0.0, 3.0), 1e-5);
}

#[test]
fn wind_gusts_change_over_time() {
    let field = WindField::new(Vec3::X, 1.0);
    let samples: Vec<f32> = (0..8).map(|i| field.pressure(Vec3::ZERO, i as f32 * 0.37)).collect();
    assert!(samples.windows(2).any(|w| w[0] != w[1]));
}

// ─── Registry Tests ───────────────────────────────────────────

#[test]
fn registry_add_remove() {
    let mut registry = FieldRegistry::new();
    let g = registry.add(Box::new(GravityField::default()));
    let w = registry.add(Box::new(WindField::default()));
    assert_eq!(g, FieldId(0));
    assert_eq!(w, FieldId(1));
    assert_eq!(registry.get(w).unwrap().name(), "wind");

    registry.remove(g).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(matches!(registry.remove(g), Err(ArborError::UnknownField(_))));
}

#[test]
fn registry_skips_out_of_range_bodies() {
    let mut inside = point_mass(1.0, Vec3::ZERO);
    let mut outside = point_mass(1.0, Vec3::new(10.0, 0.0, 0.0));

    let mut registry = FieldRegistry::new();
    registry.add(Box::new(
        AttractorField::new(Vec3::new(0.5, 0.0, 0.0), 1.0).bounded(Vec3::splat(2.0)),
    ));
    registry.add(Box::new(GravityField::default()));

    assert_eq!(registry.apply_to(&mut inside, 0.0), 2);
    assert_eq!(registry.apply_to(&mut outside, 0.0), 1);
    assert!(inside.force.x > 0.0);
    assert_eq!(outside.force.x, 0.0);
    assert!(outside.force.y < 0.0);
}

#[test]
fn field_config_serde_roundtrip() {
    let wind = WindField::new(Vec3::Y, 2.5).with_base(0.5);
    let json = serde_json::to_string(&wind).unwrap();
    let back: WindField = serde_json::from_str(&json).unwrap();
    assert_eq!(back, wind);
}

// ─── Property Tests ───────────────────────────────────────────

proptest! {
    #[test]
    fn prop_fbm_within_bound(x in -100.0f32..100.0, y in -100.0f32..100.0, amp in 0.0f32..5.0) {
        let noise = Noise::default();
        let value = noise.fbm(Vec2::new(x, y), amp);
        prop_assert!(value.is_finite());
        prop_assert!(value.abs() <= noise.bound(amp) + 1e-4);
    }
}
