//! Integration tests for arbor-types.

use arbor_types::{ArborError, BodyId, FieldId, JointId};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn body_id_index() {
    let id = BodyId(42);
    assert_eq!(id.index(), 42);
}

#[test]
fn joint_id_index() {
    let id = JointId(7);
    assert_eq!(id.index(), 7);
}

#[test]
fn ids_display_with_kind_prefix() {
    assert_eq!(BodyId(3).to_string(), "body#3");
    assert_eq!(JointId(4).to_string(), "joint#4");
    assert_eq!(FieldId(5).to_string(), "field#5");
}

#[test]
fn ids_order_by_insertion_index() {
    let mut ids = vec![BodyId(9), BodyId(1), BodyId(4)];
    ids.sort();
    assert_eq!(ids, vec![BodyId(1), BodyId(4), BodyId(9)]);
}

#[test]
fn ids_are_serializable() {
    let id = BodyId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: BodyId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn error_display() {
    let err = ArborError::InvalidArgument("distance 1.5 outside [0, 1]".into());
    assert!(err.to_string().contains("outside [0, 1]"));
}

#[test]
fn eigen_divergence_display() {
    let err = ArborError::EigenDivergence { sweeps: 30 };
    assert!(err.to_string().contains("30"));
}

#[test]
fn joint_solve_names_joint_and_cause() {
    let err = ArborError::NotPositiveDefinite("pivot 0 is -1".into()).in_joint(JointId(12));
    let msg = err.to_string();
    assert!(msg.contains("joint#12"));
    assert!(msg.contains("not positive definite"));

    let source = std::error::Error::source(&err).expect("source is kept");
    assert!(source.to_string().contains("pivot 0"));
}
