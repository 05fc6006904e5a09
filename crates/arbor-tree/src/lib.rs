//! # arbor-tree
//!
//! The articulated-body model of a branching tree.
//!
//! ## Key Types
//!
//! - [`RigidBody`]: A segment's invariant mass properties and its
//!   per-tick kinematic state, tagged by [`BodyKind`].
//! - [`Joint`]: The rotational spring-damper between a parent and a
//!   child body, carrying the analytic joint state θ.
//! - [`CompositeBody`]: Aggregated mass, force, torque and inertia of a
//!   body's whole subtree.
//! - [`BodyArena`]: Owns bodies and joints; all links are integer handles.
//! - [`LevelSchedule`]: Partitions a forest into batches of independent
//!   units of work.
//! - Procedural generators for chains and branching test trees.

pub mod arena;
pub mod body;
pub mod composite;
pub mod generators;
pub mod joint;
pub mod schedule;

pub use arena::BodyArena;
pub use body::{BodyKind, RigidBody, Segment};
pub use composite::CompositeBody;
pub use joint::{Joint, JointConfig, JointState};
pub use schedule::{LevelSchedule, UnitOfWork};
