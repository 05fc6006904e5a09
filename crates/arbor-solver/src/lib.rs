//! # arbor-solver
//!
//! The physics world and the per-tick simulation pipeline.
//!
//! ## Key Types
//!
//! - [`PhysicsWorld`]: Arena, root set, field registry and the cached
//!   level schedule.
//! - [`Simulator`]: Runs the seven tick phases over a world.
//! - [`SimulatorConfig`]: Fictitious-torque multipliers, eigen sweep
//!   bound, gravity, parallel execution.
//! - [`TickReport`]: What happened during one tick.
//!
//! The phase kernels ([`composite`], [`joints`], [`kinematics`],
//! [`free_bodies`]) are public so alternative backends can reuse them.

pub mod composite;
pub mod config;
pub mod free_bodies;
pub mod joints;
pub mod kinematics;
pub mod simulator;
pub mod world;

pub use config::SimulatorConfig;
pub use joints::JointSolution;
pub use simulator::{Simulator, TickReport};
pub use world::PhysicsWorld;
