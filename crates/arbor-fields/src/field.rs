//! Field trait: the abstraction every force source implements.

use arbor_math::Vec3;
use arbor_tree::RigidBody;

/// A source of external force.
///
/// Fields are queried once per body per tick, before composite bodies are
/// aggregated. Implementations must be pure functions of the body state
/// and `time` so that parallel evaluation stays deterministic.
pub trait PhysicsField: Send + Sync {
    /// Centre of the field's region of influence.
    fn position(&self) -> Vec3;

    /// Half-size of the axis-aligned region of influence; `None` means
    /// the field is unbounded.
    fn half_extent(&self) -> Option<Vec3>;

    /// Force acting through the body's centre of mass.
    fn force(&self, body: &RigidBody, time: f32) -> Vec3;

    /// Additional torque, if the field produces one.
    fn torque(&self, _body: &RigidBody, _time: f32) -> Option<Vec3> {
        None
    }

    fn name(&self) -> &str;

    /// Whether `point` lies inside the region of influence (bounds
    /// inclusive).
    fn applies_to(&self, point: Vec3) -> bool {
        match self.half_extent() {
            None => true,
            Some(half) => {
                let min = self.position() - half;
                let max = self.position() + half;
                point.cmpge(min).all() && point.cmple(max).all()
            }
        }
    }

    /// Accumulates this field's force and torque on `body`.
    fn apply(&self, body: &mut RigidBody, time: f32) {
        let force = self.force(body, time);
        let torque = self.torque(body, time).unwrap_or(Vec3::ZERO);
        body.apply_force(force, torque);
    }
}
