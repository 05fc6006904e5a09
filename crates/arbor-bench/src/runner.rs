//! Benchmark runner: executes scenarios and collects metrics.

use std::collections::HashMap;
use std::time::Instant;

use arbor_gpu::{BackendDriver, ComputeBackend};
use arbor_math::Vec3;
use arbor_solver::{PhysicsWorld, Simulator, TickReport};
use arbor_types::{ArborResult, BodyId};

use crate::metrics::BenchmarkMetrics;
use crate::scenarios::{Scenario, ScenarioKind};

/// Runs benchmark scenarios and collects metrics.
pub struct BenchmarkRunner;

struct RunStart {
    positions: HashMap<BodyId, Vec3>,
    body_count: usize,
    joint_count: usize,
}

impl RunStart {
    fn record(world: &PhysicsWorld) -> Self {
        Self {
            positions: world
                .arena()
                .bodies()
                .map(|(id, b)| (id, b.center_of_mass))
                .collect(),
            body_count: world.simulated_body_count(),
            joint_count: world.arena().joint_count(),
        }
    }

    fn finish(
        self,
        kind: ScenarioKind,
        backend: &str,
        world: &PhysicsWorld,
        reports: &[TickReport],
        total_wall_time: f64,
    ) -> BenchmarkMetrics {
        let max_displacement = world
            .arena()
            .bodies()
            .filter_map(|(id, b)| {
                let start = self.positions.get(&id)?;
                Some((b.center_of_mass - *start).length())
            })
            .fold(0.0f32, f32::max);

        let step_times: Vec<f64> = reports.iter().map(|r| r.wall_time).collect();
        let avg_step = if step_times.is_empty() {
            0.0
        } else {
            step_times.iter().sum::<f64>() / step_times.len() as f64
        };
        let min_step = step_times.iter().copied().fold(f64::MAX, f64::min);
        let max_step = step_times.iter().copied().fold(0.0, f64::max);

        BenchmarkMetrics {
            scenario: kind.name().to_string(),
            backend: backend.to_string(),
            body_count: self.body_count,
            joint_count: self.joint_count,
            levels: reports.first().map_or(0, |r| r.levels),
            timesteps: reports.len() as u32,
            total_wall_time,
            avg_step_time: avg_step,
            min_step_time: if step_times.is_empty() { 0.0 } else { min_step },
            max_step_time: max_step,
            final_kinetic_energy: f64::from(world.kinetic_energy()),
            max_displacement,
            dearticulated: reports.iter().map(|r| r.dearticulated.len()).sum(),
            eigen_fallbacks: reports.iter().map(|r| r.eigen_fallbacks).sum(),
        }
    }
}

impl BenchmarkRunner {
    /// Runs a scenario through the [`Simulator`].
    pub fn run(scenario: Scenario) -> ArborResult<BenchmarkMetrics> {
        let Scenario {
            kind,
            world,
            config,
            timesteps,
            dt,
        } = scenario;
        let start = RunStart::record(&world);
        let mut sim = Simulator::new(config, world);

        let total_start = Instant::now();
        let reports = sim.run(timesteps as usize, dt)?;
        let total_wall_time = total_start.elapsed().as_secs_f64();

        let metrics = start.finish(kind, "simulator", sim.world(), &reports, total_wall_time);
        tracing::info!(
            scenario = kind.name(),
            ticks = metrics.timesteps,
            avg_step_ms = metrics.avg_step_time * 1000.0,
            "benchmark finished"
        );
        Ok(metrics)
    }

    /// Runs a scenario through a compute backend.
    pub fn run_with_backend(
        scenario: Scenario,
        backend: Box<dyn ComputeBackend>,
    ) -> ArborResult<BenchmarkMetrics> {
        let Scenario {
            kind,
            mut world,
            config,
            timesteps,
            dt,
        } = scenario;
        let start = RunStart::record(&world);
        let mut driver = BackendDriver::new(backend, config)?;

        let total_start = Instant::now();
        let reports = driver.run(&mut world, timesteps as usize, dt)?;
        let total_wall_time = total_start.elapsed().as_secs_f64();

        let metrics = start.finish(kind, driver.backend_name(), &world, &reports, total_wall_time);
        tracing::info!(
            scenario = kind.name(),
            backend = driver.backend_name(),
            ticks = metrics.timesteps,
            avg_step_ms = metrics.avg_step_time * 1000.0,
            "benchmark finished"
        );
        Ok(metrics)
    }

    /// Runs every scenario through the [`Simulator`].
    pub fn run_all() -> ArborResult<Vec<BenchmarkMetrics>> {
        ScenarioKind::all()
            .iter()
            .map(|&kind| Self::run(Scenario::from_kind(kind)?))
            .collect()
    }
}
