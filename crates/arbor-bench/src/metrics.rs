//! Benchmark metrics collected during a scenario run.

use arbor_types::{ArborError, ArborResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub scenario: String,
    /// Name of the execution path ("simulator" or a backend name).
    pub backend: String,
    /// Bodies reachable from a root at the start of the run.
    pub body_count: usize,
    /// Joints at the start of the run.
    pub joint_count: usize,
    /// Levels in the first tick's schedule.
    pub levels: usize,
    pub timesteps: u32,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Average wall-clock time per tick (seconds).
    pub avg_step_time: f64,
    pub min_step_time: f64,
    pub max_step_time: f64,
    pub final_kinetic_energy: f64,
    /// Largest centre-of-mass displacement of any body from its start.
    pub max_displacement: f32,
    /// Bodies that broke off during the run.
    pub dearticulated: usize,
    /// Joints that needed the QL fallback, summed over all ticks.
    pub eigen_fallbacks: u32,
}

impl BenchmarkMetrics {
    pub fn to_csv_header() -> String {
        "scenario,backend,body_count,joint_count,levels,timesteps,total_wall_time_s,avg_step_ms,min_step_ms,max_step_ms,final_ke,max_displacement,dearticulated,eigen_fallbacks".to_string()
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{:.6},{:.4},{:.4},{:.4},{:.6e},{:.6},{},{}",
            self.scenario,
            self.backend,
            self.body_count,
            self.joint_count,
            self.levels,
            self.timesteps,
            self.total_wall_time,
            self.avg_step_time * 1000.0,
            self.min_step_time * 1000.0,
            self.max_step_time * 1000.0,
            self.final_kinetic_energy,
            self.max_displacement,
            self.dearticulated,
            self.eigen_fallbacks,
        )
    }

    /// Header plus one row per run.
    pub fn to_csv(metrics: &[BenchmarkMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }

    pub fn to_json(metrics: &[BenchmarkMetrics]) -> ArborResult<String> {
        serde_json::to_string_pretty(metrics)
            .map_err(|e| ArborError::Serialization(format!("metrics encoding failed: {e}")))
    }
}
