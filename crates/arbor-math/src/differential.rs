//! Closed-form solutions of the linear second-order ODE
//! `a·y'' + b·y' + c·y = g` with constant coefficients.
//!
//! The homogeneous part is classified by the roots of the characteristic
//! polynomial `a·r² + b·r + c`; the constant forcing adds the steady-state
//! offset `k = g / c`. Each family is evaluated analytically, including the
//! first and second derivatives.

use arbor_types::{ArborError, ArborResult};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::quadratic::{solve_quadratic, QuadraticSolution};

/// A parametrized solution of `a·y'' + b·y' + c·y = g`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DifferentialSolution {
    /// Repeated root: `y = (c1 + c2·t)·e^{r·t} + k`.
    Real { c1: f32, c2: f32, r: f32, k: f32 },
    /// Distinct roots: `y = c1·e^{r1·t} + c2·e^{r2·t} + k`.
    RealDistinct {
        c1: f32,
        c2: f32,
        r1: f32,
        r2: f32,
        k: f32,
    },
    /// Complex pair `λ ± iμ`: `y = e^{λt}·(c1·cos μt + c2·sin μt) + k`.
    Complex {
        c1: f32,
        c2: f32,
        lambda: f32,
        mu: f32,
        k: f32,
    },
}

/// Fits the solution family to the initial conditions `y(0) = y0`,
/// `y'(0) = dy0`.
///
/// Fails when `c = 0` (no restoring term, so no steady state exists) or
/// when `a = 0` (the equation is not second order).
pub fn solve_differential(
    a: f32,
    b: f32,
    c: f32,
    g: f32,
    y0: f32,
    dy0: f32,
) -> ArborResult<DifferentialSolution> {
    if c == 0.0 {
        return Err(ArborError::DegenerateDifferential(format!(
            "c = 0 in {a}·y'' + {b}·y' + c·y = {g}"
        )));
    }
    if a == 0.0 {
        return Err(ArborError::DegenerateDifferential(format!(
            "leading coefficient is zero in 0·y'' + {b}·y' + {c}·y = {g}"
        )));
    }

    let k = g / c;
    let y0k = y0 - k;

    let solution = match solve_quadratic(a, b, c) {
        QuadraticSolution::Complex { re: lambda, im: mu } => {
            let c1 = y0k;
            let c2 = (dy0 - lambda * c1) / mu;
            DifferentialSolution::Complex {
                c1,
                c2,
                lambda,
                mu,
                k,
            }
        }
        QuadraticSolution::Real(r) => {
            let c1 = y0k;
            let c2 = dy0 - r * c1;
            DifferentialSolution::Real { c1, c2, r, k }
        }
        QuadraticSolution::RealDistinct(r1, r2) => {
            // c1 + c2 = y0k, r1·c1 + r2·c2 = dy0
            let c1 = (dy0 - r2 * y0k) / (r1 - r2);
            let c2 = y0k - c1;
            DifferentialSolution::RealDistinct { c1, c2, r1, r2, k }
        }
    };

    Ok(solution)
}

impl DifferentialSolution {
    /// Returns `(y(t), y'(t), y''(t))`.
    pub fn evaluate(&self, t: f32) -> Vec3 {
        match *self {
            DifferentialSolution::Complex {
                c1,
                c2,
                lambda,
                mu,
                k,
            } => {
                let e = (lambda * t).exp();
                let (sin, cos) = (mu * t).sin_cos();
                // y' = e·(p·cos + q·sin), y'' = e·((λp + μq)·cos + (λq − μp)·sin)
                let p = lambda * c1 + mu * c2;
                let q = lambda * c2 - mu * c1;
                Vec3::new(
                    e * (c1 * cos + c2 * sin) + k,
                    e * (p * cos + q * sin),
                    e * ((lambda * p + mu * q) * cos + (lambda * q - mu * p) * sin),
                )
            }
            DifferentialSolution::Real { c1, c2, r, k } => {
                let e = (r * t).exp();
                Vec3::new(
                    (c1 + c2 * t) * e + k,
                    (r * c1 + c2 + r * c2 * t) * e,
                    (r * r * c1 + 2.0 * r * c2 + r * r * c2 * t) * e,
                )
            }
            DifferentialSolution::RealDistinct { c1, c2, r1, r2, k } => {
                let e1 = (r1 * t).exp();
                let e2 = (r2 * t).exp();
                Vec3::new(
                    c1 * e1 + c2 * e2 + k,
                    r1 * c1 * e1 + r2 * c2 * e2,
                    r1 * r1 * c1 * e1 + r2 * r2 * c2 * e2,
                )
            }
        }
    }

    /// The steady-state offset `g / c`.
    pub fn steady_state(&self) -> f32 {
        match *self {
            DifferentialSolution::Real { k, .. }
            | DifferentialSolution::RealDistinct { k, .. }
            | DifferentialSolution::Complex { k, .. } => k,
        }
    }
}

/// Solves and evaluates in one call.
pub fn evaluate_differential(
    a: f32,
    b: f32,
    c: f32,
    g: f32,
    y0: f32,
    dy0: f32,
    t: f32,
) -> ArborResult<Vec3> {
    Ok(solve_differential(a, b, c, g, y0, dy0)?.evaluate(t))
}
