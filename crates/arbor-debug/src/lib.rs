//! # arbor-debug
//!
//! Inspection hooks and world snapshots for debugging simulation issues.
//! Snapshots serialize the full dynamic state of a world to binary so a
//! run can be compared against, or resumed from, an earlier point.

pub mod hooks;
pub mod snapshot;

pub use hooks::{run_with_hooks, InspectionHook, InvariantHook, TelemetryHook};
pub use snapshot::{BodySnapshot, JointSnapshot, SnapshotDiff, WorldSnapshot};
