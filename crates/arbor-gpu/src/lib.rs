//! # arbor-gpu
//!
//! Compute backend abstraction for the arbor tick.
//!
//! The middle of a tick (composites, de-articulation, joints, kinematics)
//! runs over a [`FlattenedTree`]: plain `Pod` records laid out level by
//! level, ready to be uploaded as storage buffers. A [`ComputeBackend`]
//! executes those phases; [`BackendDriver`] wraps a backend into a full
//! tick over a [`arbor_solver::PhysicsWorld`].
//!
//! Two backends ship:
//! - [`CpuFallback`]: Sequential reference (always available)
//! - [`RayonBackend`]: Units of one level dispatched on a rayon pool

pub mod backend;
pub mod buffers;
pub mod driver;

pub use backend::{ComputeBackend, CpuFallback, RayonBackend, StepOutput, StepParams};
pub use buffers::{FlatBody, FlatComposite, FlatJoint, FlattenedTree};
pub use driver::BackendDriver;
