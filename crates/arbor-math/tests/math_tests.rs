//! Integration tests for arbor-math.

use arbor_math::eigen::{eigen_ql, tridiagonalize};
use arbor_math::{
    cholesky, eigen_symmetric3x3, evaluate_differential, rotate_tensor, skew, solve_differential,
    solve_quadratic, sqr, DifferentialSolution, EigenMethod, Mat3, Quat, QuadraticSolution, Vec3,
};
use arbor_types::ArborError;
use proptest::prelude::*;

fn assert_vec3_near(actual: Vec3, expected: Vec3, tol: f32) {
    assert!(
        (actual - expected).abs().max_element() < tol,
        "expected {expected:?}, got {actual:?}"
    );
}

fn sorted(v: Vec3) -> [f32; 3] {
    let mut values = v.to_array();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values
}

/// Largest off-diagonal magnitude of `Qᵀ·M·Q`, and its diagonal.
fn diagonalization_residual(m: Mat3, q: Mat3) -> (f32, Vec3) {
    let d = q.transpose() * m * q;
    let off = [
        d.col(1)[0], d.col(2)[0], d.col(0)[1],
        d.col(2)[1], d.col(0)[2], d.col(1)[2],
    ]
    .iter()
    .fold(0.0_f32, |acc, x| acc.max(x.abs()));
    (off, Vec3::new(d.col(0)[0], d.col(1)[1], d.col(2)[2]))
}

// ─── Quadratic Tests ──────────────────────────────────────────

#[test]
fn quadratic_distinct_real_roots() {
    assert_eq!(
        solve_quadratic(1.0, 11.0, 24.0),
        QuadraticSolution::RealDistinct(-3.0, -8.0)
    );
}

#[test]
fn quadratic_repeated_root() {
    assert_eq!(solve_quadratic(1.0, -4.0, 4.0), QuadraticSolution::Real(2.0));
}

#[test]
fn quadratic_complex_pair() {
    match solve_quadratic(1.0, -4.0, 9.0) {
        QuadraticSolution::Complex { re, im } => {
            assert!((re - 2.0).abs() < 1e-6);
            assert!((im - 5.0_f32.sqrt()).abs() < 1e-6);
        }
        other => panic!("expected complex roots, got {other:?}"),
    }
}

#[test]
fn quadratic_avoids_cancellation() {
    // Roots ≈ -1e4 and -1e-4; the naive formula loses the small one.
    match solve_quadratic(1.0, 1.0e4, 1.0) {
        QuadraticSolution::RealDistinct(small, large) => {
            assert!((small + 1.0e-4).abs() < 1e-9, "small root = {small}");
            assert!((large + 1.0e4).abs() < 1.0, "large root = {large}");
        }
        other => panic!("expected real roots, got {other:?}"),
    }
}

// ─── Differential Tests ───────────────────────────────────────

#[test]
fn differential_distinct_real() {
    let solution = solve_differential(1.0, 11.0, 24.0, 0.0, 0.0, -7.0).unwrap();
    match solution {
        DifferentialSolution::RealDistinct { c1, c2, r1, r2, k } => {
            assert!((c1 + 7.0 / 5.0).abs() < 1e-5);
            assert!((c2 - 7.0 / 5.0).abs() < 1e-5);
            assert_eq!((r1, r2), (-3.0, -8.0));
            assert_eq!(k, 0.0);
        }
        other => panic!("unexpected family {other:?}"),
    }
    assert_vec3_near(solution.evaluate(0.0), Vec3::new(0.0, -7.0, 77.0), 1e-4);
}

#[test]
fn differential_repeated_real() {
    let solution = solve_differential(1.0, -4.0, 4.0, 0.0, 12.0, -3.0).unwrap();
    assert_eq!(
        solution,
        DifferentialSolution::Real {
            c1: 12.0,
            c2: -27.0,
            r: 2.0,
            k: 0.0
        }
    );
    assert_vec3_near(solution.evaluate(0.0), Vec3::new(12.0, -3.0, -60.0), 1e-4);
}

#[test]
fn differential_complex() {
    let solution = solve_differential(1.0, -4.0, 9.0, 0.0, 0.0, -8.0).unwrap();
    match solution {
        DifferentialSolution::Complex {
            c1,
            c2,
            lambda,
            mu,
            ..
        } => {
            assert_eq!(c1, 0.0);
            assert!((c2 + 8.0 / 5.0_f32.sqrt()).abs() < 1e-5);
            assert!((lambda - 2.0).abs() < 1e-6);
            assert!((mu - 5.0_f32.sqrt()).abs() < 1e-6);
        }
        other => panic!("unexpected family {other:?}"),
    }
    assert_vec3_near(solution.evaluate(0.0), Vec3::new(0.0, -8.0, -32.0), 1e-4);
}

#[test]
fn differential_settles_to_steady_state() {
    // Overdamped with constant forcing: y → g / c.
    let solution = solve_differential(1.0, 5.0, 4.0, 2.0, 0.0, 0.0).unwrap();
    assert!((solution.steady_state() - 0.5).abs() < 1e-6);
    let late = solution.evaluate(20.0);
    assert!((late.x - 0.5).abs() < 1e-4);
    assert!(late.y.abs() < 1e-4);
}

#[test]
fn differential_closed_form_matches_finite_difference() {
    let solution = solve_differential(0.5, 0.3, 2.0, 1.0, 0.2, -0.4).unwrap();
    let h = 1e-3;
    let t = 0.7;
    let y = solution.evaluate(t);
    let ahead = solution.evaluate(t + h);
    let behind = solution.evaluate(t - h);
    assert!(((ahead.x - behind.x) / (2.0 * h) - y.y).abs() < 1e-2);
    assert!(((ahead.y - behind.y) / (2.0 * h) - y.z).abs() < 1e-2);
}

#[test]
fn differential_rejects_zero_stiffness() {
    let err = solve_differential(1.0, 1.0, 0.0, 1.0, 0.0, 0.0).unwrap_err();
    assert!(matches!(err, ArborError::DegenerateDifferential(_)));
    assert!(evaluate_differential(1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0).is_err());
}

// ─── Decomposition Tests ──────────────────────────────────────

#[test]
fn cholesky_reference_factorization() {
    let m = Mat3::from_cols(
        Vec3::new(4.0, 12.0, -16.0),
        Vec3::new(12.0, 37.0, -43.0),
        Vec3::new(-16.0, -43.0, 98.0),
    );
    let l = cholesky(m).unwrap();
    assert_vec3_near(l.col(0), Vec3::new(2.0, 6.0, -8.0), 1e-5);
    assert_vec3_near(l.col(1), Vec3::new(0.0, 1.0, 5.0), 1e-5);
    assert_vec3_near(l.col(2), Vec3::new(0.0, 0.0, 3.0), 1e-5);

    let back = l * l.transpose();
    for c in 0..3 {
        assert_vec3_near(back.col(c), m.col(c), 1e-4);
    }
}

#[test]
fn cholesky_rejects_indefinite() {
    let m = Mat3::from_diagonal(Vec3::new(1.0, -1.0, 1.0));
    assert!(matches!(cholesky(m), Err(ArborError::NotPositiveDefinite(_))));
}

#[test]
fn skew_is_cross_product() {
    let v = Vec3::new(1.0, -2.0, 0.5);
    let w = Vec3::new(0.3, 4.0, -1.0);
    assert_vec3_near(skew(v) * w, v.cross(w), 1e-6);
}

#[test]
fn sqr_skew_is_parallel_axis_term() {
    // -sqr(skew(r)) = |r|²·I − r·rᵀ
    let r = Vec3::new(0.0, 0.5, 0.0);
    let shift = -sqr(skew(r));
    assert_vec3_near(shift.col(0), Vec3::new(0.25, 0.0, 0.0), 1e-6);
    assert_vec3_near(shift.col(1), Vec3::ZERO, 1e-6);
    assert_vec3_near(shift.col(2), Vec3::new(0.0, 0.0, 0.25), 1e-6);
}

#[test]
fn rotate_tensor_quarter_turn_swaps_axes() {
    let tensor = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
    let rotated = rotate_tensor(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), tensor);
    assert_vec3_near(
        Vec3::new(rotated.col(0)[0], rotated.col(1)[1], rotated.col(2)[2]),
        Vec3::new(2.0, 1.0, 3.0),
        1e-5,
    );
}

// ─── Eigen Tests ──────────────────────────────────────────────

#[test]
fn eigen_tridiagonal_matrix() {
    let m = Mat3::from_cols(
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(1.0, 2.0, 1.0),
        Vec3::new(0.0, 1.0, 2.0),
    );
    let eigen = eigen_symmetric3x3(m, 30).unwrap();
    assert_eq!(eigen.method, EigenMethod::Analytic);

    let s2 = 2.0_f32.sqrt();
    let values = sorted(eigen.values);
    assert!((values[0] - (2.0 - s2)).abs() < 1e-5);
    assert!((values[1] - 2.0).abs() < 1e-5);
    assert!((values[2] - (2.0 + s2)).abs() < 1e-5);

    let (off, diag) = diagonalization_residual(m, eigen.vectors);
    assert!(off < 1e-5, "off-diagonal residual {off}");
    assert_vec3_near(diag, eigen.values, 1e-5);
}

#[test]
fn eigen_diagonal_matrix_falls_back() {
    let m = Mat3::from_diagonal(Vec3::new(3.0, 1.0, 2.0));
    let eigen = eigen_symmetric3x3(m, 30).unwrap();
    assert!(eigen.used_fallback());
    assert_eq!(sorted(eigen.values), [1.0, 2.0, 3.0]);
}

#[test]
fn eigen_repeated_eigenvalues_use_ql() {
    // I + 2·v·vᵀ with v = (1, 1, 0)/√2: eigenvalues 3, 1, 1.
    let m = Mat3::from_cols(
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(1.0, 2.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    );

    let eigen = eigen_symmetric3x3(m, 30).unwrap();
    assert_eq!(eigen.method, EigenMethod::QlFallback);

    let values = sorted(eigen.values);
    assert!((values[0] - 1.0).abs() < 1e-5);
    assert!((values[1] - 1.0).abs() < 1e-5);
    assert!((values[2] - 3.0).abs() < 1e-5);

    let (off, _) = diagonalization_residual(m, eigen.vectors);
    assert!(off < 1e-5, "off-diagonal residual {off}");
}

#[test]
fn eigen_ql_respects_sweep_bound() {
    let q = Mat3::from_quat(Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 0.7));
    let m = q * Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0)) * q.transpose();

    match eigen_ql(m, 0) {
        Err(ArborError::EigenDivergence { sweeps }) => assert_eq!(sweeps, 0),
        other => panic!("expected divergence, got {other:?}"),
    }
    assert!(eigen_ql(m, 30).is_ok());
}

#[test]
fn tridiagonalize_preserves_trace() {
    let a = [[4.0, 1.0, -2.0], [1.0, 2.0, 0.5], [-2.0, 0.5, 3.0]];
    let t = tridiagonalize(&a);
    let trace: f64 = t.d.iter().sum();
    assert!((trace - 9.0).abs() < 1e-12);
}

#[test]
fn eigen_zero_matrix() {
    let eigen = eigen_symmetric3x3(Mat3::ZERO, 30).unwrap();
    assert_eq!(eigen.values, Vec3::ZERO);
    assert!(eigen.vectors.is_finite());
}

// ─── Property Tests ───────────────────────────────────────────

proptest! {
    #[test]
    fn prop_eigen_diagonalizes_symmetric(
        ax in -1.0f32..1.0, ay in -1.0f32..1.0, az in 0.1f32..1.0,
        angle in 0.0f32..std::f32::consts::TAU,
        base in -5.0f32..5.0,
        gap0 in 0.5f32..4.0,
        gap1 in 0.5f32..4.0,
    ) {
        let q = Mat3::from_quat(Quat::from_axis_angle(Vec3::new(ax, ay, az).normalize(), angle));
        let lambda = Vec3::new(base, base + gap0, base + gap0 + gap1);
        let m = q * Mat3::from_diagonal(lambda) * q.transpose();

        let eigen = eigen_symmetric3x3(m, 30).unwrap();
        let scale = lambda.abs().max_element().max(1.0);

        let (off, diag) = diagonalization_residual(m, eigen.vectors);
        prop_assert!(off / scale < 1e-4, "off-diagonal {} for {:?}", off, m);
        prop_assert!(((diag - eigen.values).abs().max_element()) / scale < 1e-4);

        let expected = sorted(lambda);
        let got = sorted(eigen.values);
        for i in 0..3 {
            prop_assert!((expected[i] - got[i]).abs() / scale < 1e-4);
        }
    }

    #[test]
    fn prop_differential_matches_initial_conditions(
        a in 0.5f32..5.0,
        b in 0.0f32..10.0,
        c in 0.5f32..10.0,
        g in -5.0f32..5.0,
        y0 in -5.0f32..5.0,
        dy0 in -5.0f32..5.0,
    ) {
        let at_zero = solve_differential(a, b, c, g, y0, dy0).unwrap().evaluate(0.0);
        let ddy0 = (g - b * dy0 - c * y0) / a;

        prop_assert!((at_zero.x - y0).abs() < 1e-3 * (1.0 + y0.abs()));
        prop_assert!((at_zero.y - dy0).abs() < 1e-3 * (1.0 + dy0.abs()));
        prop_assert!((at_zero.z - ddy0).abs() < 1e-3 * (1.0 + ddy0.abs()));
    }
}
