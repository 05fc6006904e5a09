//! Matrix decompositions and tensor helpers used by the joint solver.

use arbor_types::{ArborError, ArborResult};
use glam::{Mat3, Quat, Vec3};

/// The cross-product matrix of `v`: `skew(v) * w == v.cross(w)`.
#[inline]
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// `m · m`.
#[inline]
pub fn sqr(m: Mat3) -> Mat3 {
    m * m
}

/// Expresses a body-frame tensor in the frame rotated by `q`: `R·T·Rᵀ`.
#[inline]
pub fn rotate_tensor(q: Quat, tensor: Mat3) -> Mat3 {
    let r = Mat3::from_quat(q);
    r * tensor * r.transpose()
}

/// Element `(row, col)` of a column-major `Mat3`.
#[inline]
fn at(m: &Mat3, row: usize, col: usize) -> f32 {
    m.col(col)[row]
}

/// Lower-triangular Cholesky factor `L` with `m = L·Lᵀ`.
///
/// Only the lower triangle of `m` is read. Fails with
/// [`ArborError::NotPositiveDefinite`] when a pivot is not strictly
/// positive.
pub fn cholesky(m: Mat3) -> ArborResult<Mat3> {
    let pivot = |index: usize, value: f32| -> ArborResult<f32> {
        if value > 0.0 && value.is_finite() {
            Ok(value.sqrt())
        } else {
            Err(ArborError::NotPositiveDefinite(format!(
                "pivot {index} is {value}"
            )))
        }
    };

    let l00 = pivot(0, at(&m, 0, 0))?;
    let l10 = at(&m, 1, 0) / l00;
    let l20 = at(&m, 2, 0) / l00;

    let l11 = pivot(1, at(&m, 1, 1) - l10 * l10)?;
    let l21 = (at(&m, 2, 1) - l20 * l10) / l11;

    let l22 = pivot(2, at(&m, 2, 2) - l20 * l20 - l21 * l21)?;

    Ok(Mat3::from_cols(
        Vec3::new(l00, l10, l20),
        Vec3::new(0.0, l11, l21),
        Vec3::new(0.0, 0.0, l22),
    ))
}
