//! Full ticks through a [`ComputeBackend`].
//!
//! Fields, free-body integration and the force reset stay on the world;
//! everything between them goes through the backend on a freshly
//! flattened tree.

use std::time::Instant;

use arbor_math::Vec3;
use arbor_solver::{PhysicsWorld, SimulatorConfig, TickReport};
use arbor_types::{ArborError, ArborResult, BodyId};

use crate::backend::{ComputeBackend, StepParams};
use crate::buffers::FlattenedTree;

/// Ticks a world with a pluggable backend.
pub struct BackendDriver {
    backend: Box<dyn ComputeBackend>,
    config: SimulatorConfig,
    tick: u64,
    sim_time: f32,
}

impl BackendDriver {
    /// Validates `config` and initializes `backend`.
    pub fn new(mut backend: Box<dyn ComputeBackend>, config: SimulatorConfig) -> ArborResult<Self> {
        config.validate()?;
        backend.init()?;
        tracing::info!(backend = backend.name(), "compute backend ready");
        Ok(Self {
            backend,
            config,
            tick: 0,
            sim_time: 0.0,
        })
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Configuration the backend was built with.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Accumulated simulation time (seconds).
    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    /// Runs one tick of length `dt` on `world`.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f32) -> ArborResult<TickReport> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ArborError::InvalidArgument(format!(
                "timestep must be positive and finite, got {dt}"
            )));
        }
        let start = Instant::now();
        let mut report = TickReport {
            tick: self.tick,
            sim_time: self.sim_time,
            ..Default::default()
        };

        report.field_applications =
            world.apply_fields(self.sim_time, Vec3::from_array(self.config.gravity));

        let mut tree = FlattenedTree::from_world(world)?;
        let params = StepParams {
            dt,
            config: self.config.clone(),
        };
        let output = self.backend.step(&mut tree, &params).inspect_err(|e| {
            tracing::warn!(tick = self.tick, backend = self.backend.name(), error = %e, "backend step failed");
        })?;
        tree.write_back(world)?;

        let mut broken: Vec<BodyId> = output
            .overloaded
            .iter()
            .filter_map(|&i| tree.body_id(i))
            .collect();
        broken.sort();
        for &body in &broken {
            world.free(body)?;
            tracing::debug!(%body, tick = self.tick, "body broke off its parent");
        }

        report.dearticulated = broken;
        report.joints_solved = output.joints_solved;
        report.eigen_fallbacks = output.eigen_fallbacks;
        report.levels = tree.level_count();
        report.units = tree.unit_count();
        report.free_bodies = world.integrate_free_bodies(dt)?;
        world.reset_forces();

        self.tick += 1;
        self.sim_time += dt;
        report.wall_time = start.elapsed().as_secs_f64();
        Ok(report)
    }

    /// Runs `steps` ticks, stopping at the first failure.
    pub fn run(
        &mut self,
        world: &mut PhysicsWorld,
        steps: usize,
        dt: f32,
    ) -> ArborResult<Vec<TickReport>> {
        (0..steps).map(|_| self.update(world, dt)).collect()
    }
}
