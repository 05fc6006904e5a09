//! Error types for the arbor solver.
//!
//! All crates return `ArborResult<T>` from fallible operations.

use thiserror::Error;

use crate::ids::{BodyId, FieldId, JointId};

/// Unified error type for the arbor solver.
#[derive(Debug, Error)]
pub enum ArborError {
    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An argument was rejected at the call site (e.g. a force applied
    /// outside the [0, 1] segment range).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The body handle does not refer to a live body.
    #[error("Unknown body {0}")]
    UnknownBody(BodyId),

    /// The joint handle does not refer to a live joint.
    #[error("Unknown joint {0}")]
    UnknownJoint(JointId),

    /// The field handle does not refer to a registered field.
    #[error("Unknown field {0}")]
    UnknownField(FieldId),

    /// A structural edit would break the forest invariant.
    #[error("Topology error: {0}")]
    Topology(String),

    /// The iterative eigensolver exceeded its sweep bound.
    #[error("Eigensolver did not converge within {sweeps} sweeps")]
    EigenDivergence {
        sweeps: u32,
    },

    /// A second-order ODE had no restoring term (`c = 0`).
    #[error("Degenerate differential equation: {0}")]
    DegenerateDifferential(String),

    /// A Cholesky factorization hit a non-positive pivot.
    #[error("Matrix is not positive definite: {0}")]
    NotPositiveDefinite(String),

    /// Numeric failure while solving one joint; fails the whole tick.
    #[error("Joint {joint} failed to solve: {source}")]
    JointSolve {
        joint: JointId,
        #[source]
        source: Box<ArborError>,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ArborError {
    /// Wraps a numeric failure with the joint it happened in.
    pub fn in_joint(self, joint: JointId) -> Self {
        ArborError::JointSolve {
            joint,
            source: Box::new(self),
        }
    }
}

/// Convenience alias for `Result<T, ArborError>`.
pub type ArborResult<T> = Result<T, ArborError>;
