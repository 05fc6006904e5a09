//! Eigendecomposition of symmetric 3×3 matrices.
//!
//! The primary path computes eigenvalues with Cardano's formula for the
//! characteristic cubic and eigenvectors as cross products of columns of
//! `A − λI`. When such a cross product is too short to normalize reliably
//! (repeated or nearly repeated eigenvalues, or heavy cancellation), the
//! matrix is reduced to tridiagonal form with a Householder reflection and
//! diagonalized with implicit-shift QL iteration.
//!
//! Both paths run in `f64`; inputs and outputs are `f32`.

use arbor_types::{ArborError, ArborResult};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

type M3 = [[f64; 3]; 3];

/// Which algorithm produced an [`Eigen`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EigenMethod {
    /// Cardano eigenvalues with cross-product eigenvectors.
    Analytic,
    /// Householder tridiagonalization followed by QL iteration.
    QlFallback,
}

/// Eigenvalues and matching unit eigenvectors of a symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen {
    /// Eigenvalues; `values[i]` belongs to `vectors.col(i)`.
    pub values: Vec3,
    /// Orthonormal eigenvectors stored as columns.
    pub vectors: Mat3,
    /// The path that produced this result.
    pub method: EigenMethod,
}

impl Eigen {
    /// Returns `true` if the QL fallback had to be used.
    pub fn used_fallback(&self) -> bool {
        self.method == EigenMethod::QlFallback
    }
}

/// Tridiagonal form `A = Q · T · Qᵀ` of a symmetric matrix, where `T` has
/// diagonal `d` and off-diagonal `e`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tridiagonal {
    pub q: [[f64; 3]; 3],
    pub d: [f64; 3],
    pub e: [f64; 2],
}

/// Diagonalizes a symmetric 3×3 matrix.
///
/// `max_sweeps` bounds the QL iterations spent on each off-diagonal
/// element if the fallback is taken; running out is reported as
/// [`ArborError::EigenDivergence`].
pub fn eigen_symmetric3x3(m: Mat3, max_sweeps: u32) -> ArborResult<Eigen> {
    let a = to_rows(&m);
    let w = eigenvalues_cardano(&a);

    let t = w.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    let u = if t < 1.0 { t } else { t * t };
    let error = 256.0 * f64::EPSILON * u * u;

    // v = (A − w·I)·e1 × (A − w·I)·e2
    let column_cross = |w: f64| -> [f64; 3] {
        let c0 = [a[0][0] - w, a[1][0], a[2][0]];
        let c1 = [a[0][1], a[1][1] - w, a[2][1]];
        cross(c0, c1)
    };

    let mut v0 = column_cross(w[0]);
    let norm0 = dot(v0, v0);
    if norm0 <= error {
        return eigen_ql(m, max_sweeps);
    }
    scale(&mut v0, 1.0 / norm0.sqrt());

    let mut v1 = column_cross(w[1]);
    let norm1 = dot(v1, v1);
    if norm1 <= error {
        return eigen_ql(m, max_sweeps);
    }
    scale(&mut v1, 1.0 / norm1.sqrt());

    let v2 = cross(v0, v1);

    Ok(Eigen {
        values: Vec3::new(w[0] as f32, w[1] as f32, w[2] as f32),
        vectors: Mat3::from_cols(to_vec3(v0), to_vec3(v1), to_vec3(v2)),
        method: EigenMethod::Analytic,
    })
}

/// Diagonalizes a symmetric 3×3 matrix with Householder reduction and
/// implicit-shift QL, skipping the analytic path.
pub fn eigen_ql(m: Mat3, max_sweeps: u32) -> ArborResult<Eigen> {
    let Tridiagonal { mut q, d, e } = tridiagonalize(&to_rows(&m));
    let mut w = d;
    let mut e = [e[0], e[1], 0.0];

    for l in 0..2 {
        let mut sweeps = 0;
        loop {
            // Find the first negligible off-diagonal element at or after l.
            let mut m_idx = l;
            while m_idx <= 1 {
                let g = w[m_idx].abs() + w[m_idx + 1].abs();
                if e[m_idx].abs() + g == g {
                    break;
                }
                m_idx += 1;
            }
            if m_idx == l {
                break;
            }

            if sweeps >= max_sweeps {
                return Err(ArborError::EigenDivergence { sweeps: max_sweeps });
            }
            sweeps += 1;

            // Wilkinson-style shift
            let mut g = (w[l + 1] - w[l]) / (e[l] + e[l]);
            let mut r = (g * g + 1.0).sqrt();
            g = if g > 0.0 {
                w[m_idx] - w[l] + e[l] / (g + r)
            } else {
                w[m_idx] - w[l] + e[l] / (g - r)
            };

            let mut s = 1.0;
            let mut c = 1.0;
            let mut p = 0.0;

            for i in (l..m_idx).rev() {
                let f = s * e[i];
                let b = c * e[i];
                if f.abs() > g.abs() {
                    c = g / f;
                    r = (c * c + 1.0).sqrt();
                    e[i + 1] = f * r;
                    s = 1.0 / r;
                    c *= s;
                } else {
                    s = f / g;
                    r = (s * s + 1.0).sqrt();
                    e[i + 1] = g * r;
                    c = 1.0 / r;
                    s *= c;
                }

                g = w[i + 1] - p;
                r = (w[i] - g) * s + 2.0 * c * b;
                p = s * r;
                w[i + 1] = g + p;
                g = c * r - b;

                for row in q.iter_mut() {
                    let t = row[i + 1];
                    row[i + 1] = s * row[i] + c * t;
                    row[i] = c * row[i] - s * t;
                }
            }

            w[l] -= p;
            e[l] = g;
            e[m_idx] = 0.0;
        }
    }

    let column = |j: usize| Vec3::new(q[0][j] as f32, q[1][j] as f32, q[2][j] as f32);
    Ok(Eigen {
        values: Vec3::new(w[0] as f32, w[1] as f32, w[2] as f32),
        vectors: Mat3::from_cols(column(0), column(1), column(2)),
        method: EigenMethod::QlFallback,
    })
}

/// Reduces a symmetric matrix to tridiagonal form with a single
/// Householder reflection. Reads only the upper triangle.
pub fn tridiagonalize(a: &M3) -> Tridiagonal {
    let mut q = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut d = [0.0; 3];
    let mut e = [0.0; 2];
    let mut u = [0.0; 3];
    let mut qv = [0.0; 3];

    let h = a[0][1] * a[0][1] + a[0][2] * a[0][2];
    let g = if a[0][1] > 0.0 { -h.sqrt() } else { h.sqrt() };
    e[0] = g;
    let f = g * a[0][1];
    u[1] = a[0][1] - g;
    u[2] = a[0][2];

    let mut omega = h - f;
    if omega > 0.0 {
        omega = 1.0 / omega;
        let mut k = 0.0;
        for i in 1..3 {
            let f = a[1][i] * u[1] + a[i][2] * u[2];
            qv[i] = omega * f;
            k += u[i] * f;
        }
        k *= 0.5 * omega * omega;

        for i in 1..3 {
            qv[i] -= k * u[i];
        }

        d[0] = a[0][0];
        d[1] = a[1][1] - 2.0 * qv[1] * u[1];
        d[2] = a[2][2] - 2.0 * qv[2] * u[2];

        for j in 1..3 {
            let f = omega * u[j];
            for i in 1..3 {
                q[j][i] -= f * u[i];
            }
        }

        e[1] = a[1][2] - qv[1] * u[2] - u[1] * qv[2];
    } else {
        for i in 0..3 {
            d[i] = a[i][i];
        }
        e[1] = a[1][2];
    }

    Tridiagonal { q, d, e }
}

/// Roots of the characteristic cubic via Cardano's trigonometric form,
/// ordered `[largest, smallest, middle]`.
fn eigenvalues_cardano(a: &M3) -> [f64; 3] {
    let de = a[0][1] * a[1][2];
    let dd = a[0][1] * a[0][1];
    let ee = a[1][2] * a[1][2];
    let ff = a[0][2] * a[0][2];
    let m = a[0][0] + a[1][1] + a[2][2];
    let c1 = (a[0][0] * a[1][1] + a[0][0] * a[2][2] + a[1][1] * a[2][2]) - (dd + ee + ff);
    let c0 = a[2][2] * dd + a[0][0] * ee + a[1][1] * ff
        - a[0][0] * a[1][1] * a[2][2]
        - 2.0 * a[0][2] * de;

    let p = m * m - 3.0 * c1;
    let q = m * (p - 1.5 * c1) - 13.5 * c0;
    let sqrt_p = p.abs().sqrt();

    let phi = 27.0 * (0.25 * c1 * c1 * (p - c1) + c0 * (q + 6.75 * c0));
    let phi = (1.0 / 3.0) * phi.abs().sqrt().atan2(q);

    let c = sqrt_p * phi.cos();
    let s = sqrt_p * phi.sin() / 3.0_f64.sqrt();

    let w1 = (m - c) / 3.0;
    [w1 + c, w1 - s, w1 + s]
}

fn to_rows(m: &Mat3) -> M3 {
    let mut rows = [[0.0; 3]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = m.col(c)[r] as f64;
        }
    }
    rows
}

fn to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn scale(v: &mut [f64; 3], s: f64) {
    for x in v.iter_mut() {
        *x *= s;
    }
}
