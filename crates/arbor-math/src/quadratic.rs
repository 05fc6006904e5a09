//! Roots of `a·x² + b·x + c = 0`.

use serde::{Deserialize, Serialize};

/// Roots of a real quadratic, tagged by the sign of the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuadraticSolution {
    /// Zero discriminant: one repeated real root.
    Real(f32),
    /// Positive discriminant: two distinct real roots.
    RealDistinct(f32, f32),
    /// Negative discriminant: the conjugate pair `re ± i·im`.
    Complex { re: f32, im: f32 },
}

/// Solves `a·x² + b·x + c = 0` for `a ≠ 0`.
///
/// In the distinct-root case the larger-magnitude root is computed first
/// as `q / a` with `q = -(b + sign(b)·√Δ) / 2` and the other as `c / q`,
/// which avoids cancellation when `b² ≫ 4ac`. The pair is returned as
/// `(c / q, q / a)`.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> QuadraticSolution {
    let discriminant = b * b - 4.0 * a * c;

    if discriminant == 0.0 {
        QuadraticSolution::Real(-b / (2.0 * a))
    } else if discriminant > 0.0 {
        let sign = if b >= 0.0 { 1.0 } else { -1.0 };
        let q = -0.5 * (b + sign * discriminant.sqrt());
        QuadraticSolution::RealDistinct(c / q, q / a)
    } else {
        QuadraticSolution::Complex {
            re: -b / (2.0 * a),
            im: (-discriminant).sqrt() / (2.0 * a),
        }
    }
}
