//! # arbor-math
//!
//! Numeric kernels for the arbor tree-physics solver.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, `Mat3`, `Quat`, etc.)
//! - Numerically stable quadratic roots
//! - Closed-form solutions of `a·y'' + b·y' + c·y = g`
//! - Symmetric 3×3 eigendecomposition (Cardano with a QL fallback)
//! - Cholesky factorization and tensor helpers

pub mod decomposition;
pub mod differential;
pub mod eigen;
pub mod quadratic;

pub use decomposition::{cholesky, rotate_tensor, skew, sqr};
pub use differential::{evaluate_differential, solve_differential, DifferentialSolution};
pub use eigen::{eigen_symmetric3x3, Eigen, EigenMethod};
pub use quadratic::{solve_quadratic, QuadraticSolution};

// Re-export glam types as the canonical math types for arbor.
pub use glam::{DMat3, DVec3, Mat3, Quat, Vec2, Vec3};
