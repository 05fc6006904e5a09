//! Physical constants and simulation defaults.

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f32 = 9.81;

/// Default simulation timestep (seconds). 1/60th of a second.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Default bound on QL sweeps per off-diagonal element in the
/// iterative eigensolver fallback.
pub const DEFAULT_EIGEN_SWEEPS: u32 = 30;

/// Below this magnitude a joint angle vector is treated as "no rotation".
pub const ANGLE_EPSILON: f32 = 1.0e-9;

/// Epsilon for floating-point comparisons.
pub const EPSILON: f32 = 1.0e-7;

/// Density that gives a unit-length, unit-radius internode a mass of 1.
pub const UNIT_DENSITY: f32 = 1.0 / std::f32::consts::PI;

/// Default joint stiffness used by the procedural generators.
pub const DEFAULT_STIFFNESS: f32 = 100.0;

/// Default joint damping used by the procedural generators.
pub const DEFAULT_DAMPING: f32 = 0.2;
