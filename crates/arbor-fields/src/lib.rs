//! # arbor-fields
//!
//! External force fields acting on the bodies of a tree.
//!
//! ## Design
//!
//! The [`PhysicsField`] trait turns a body's state and the elapsed
//! simulation time into a force (and optionally an extra torque). A field
//! may be bounded by an axis-aligned box; bodies whose centre of mass lies
//! outside it are skipped. The [`FieldRegistry`] owns the active fields
//! and applies all of them to an arena once per tick.

pub mod attractor;
pub mod field;
pub mod gravity;
pub mod noise;
pub mod registry;
pub mod wind;

pub use attractor::AttractorField;
pub use field::PhysicsField;
pub use gravity::GravityField;
pub use noise::Noise;
pub use registry::FieldRegistry;
pub use wind::WindField;
