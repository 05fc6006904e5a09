//! # arbor-types
//!
//! Shared types, identifiers, error types, and physical constants
//! for the arbor articulated tree-physics solver.
//!
//! This crate has zero domain logic: it defines the vocabulary
//! that all other arbor crates share.

pub mod constants;
pub mod error;
pub mod ids;
pub mod scalar;

pub use error::{ArborError, ArborResult};
pub use ids::{BodyId, FieldId, JointId};
pub use scalar::Scalar;
