//! # arbor-bench
//!
//! Benchmark suite for the arbor solver.
//!
//! Provides 6 procedural scenarios, metric collection, and CSV/JSON
//! export for regression tracking. Scenarios run either through the
//! [`arbor_solver::Simulator`] or through any
//! [`arbor_gpu::ComputeBackend`].

pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use metrics::BenchmarkMetrics;
pub use runner::BenchmarkRunner;
pub use scenarios::{Scenario, ScenarioKind};
