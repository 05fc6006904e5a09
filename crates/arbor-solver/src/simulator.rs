//! The tick pipeline.
//!
//! Every call to [`Simulator::update`] runs, in order:
//! 1. **Fields**: forces and torques from registered fields and gravity
//! 2. **Composites**: subtree aggregates, children first
//! 3. **De-articulation**: overloaded joints break; the schedule is
//!    rebuilt if anything broke
//! 4. **Joints**: analytic solve of every scheduled joint
//! 5. **Kinematics**: poses and motion, parents first
//! 6. **Free bodies**: explicit integration of `Dynamic` roots
//! 7. **Reset**: force and torque accumulators cleared

use std::time::Instant;

use arbor_math::Vec3;
use arbor_types::{ArborError, ArborResult, BodyId};
use serde::{Deserialize, Serialize};

use crate::composite::update_composites;
use crate::config::SimulatorConfig;
use crate::joints::update_joints;
use crate::kinematics::update_kinematics;
use crate::world::PhysicsWorld;

/// Result of one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Index of the tick, starting at 0.
    pub tick: u64,
    /// Simulation time at the start of the tick (seconds).
    pub sim_time: f32,
    /// Bodies that broke off their parent this tick.
    pub dearticulated: Vec<BodyId>,
    /// Joints whose eigendecomposition needed the QL fallback.
    pub eigen_fallbacks: u32,
    /// Levels in the schedule used for joints and kinematics.
    pub levels: usize,
    /// Units of work in that schedule.
    pub units: usize,
    pub joints_solved: usize,
    /// Field-body interactions applied in phase 1.
    pub field_applications: usize,
    /// Free roots integrated in phase 6.
    pub free_bodies: usize,
    /// Wall-clock time for this tick (seconds).
    pub wall_time: f64,
}

/// Advances a [`PhysicsWorld`] one tick at a time.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    world: PhysicsWorld,
    tick: u64,
    sim_time: f32,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, world: PhysicsWorld) -> Self {
        Self {
            config,
            world,
            tick: 0,
            sim_time: 0.0,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn into_world(self) -> PhysicsWorld {
        self.world
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Accumulated simulation time (seconds).
    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    /// Runs one full tick of length `dt`.
    ///
    /// Only bodies reachable from the world's roots take part. A numeric
    /// failure in any joint aborts the tick with [`ArborError::JointSolve`]
    /// before any joint state is committed.
    pub fn update(&mut self, dt: f32) -> ArborResult<TickReport> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ArborError::InvalidArgument(format!(
                "timestep must be positive and finite, got {dt}"
            )));
        }

        let result = self.run_phases(dt);
        match &result {
            Ok(report) => {
                self.tick += 1;
                self.sim_time += dt;
                tracing::trace!(
                    tick = report.tick,
                    joints = report.joints_solved,
                    wall_time = report.wall_time,
                    "tick complete"
                );
            }
            Err(e) => tracing::warn!(tick = self.tick, error = %e, "tick failed"),
        }
        result
    }

    /// Runs `steps` ticks, stopping at the first failure.
    pub fn run(&mut self, steps: usize, dt: f32) -> ArborResult<Vec<TickReport>> {
        (0..steps).map(|_| self.update(dt)).collect()
    }

    fn run_phases(&mut self, dt: f32) -> ArborResult<TickReport> {
        let start = Instant::now();
        let parallel = self.config.parallel;
        let time = self.sim_time;
        let mut report = TickReport {
            tick: self.tick,
            sim_time: time,
            ..Default::default()
        };

        // 1. Fields
        report.field_applications = self
            .world
            .apply_fields(time, Vec3::from_array(self.config.gravity));

        // 2. Composites
        if self.world.schedule_is_stale() {
            self.world.rebuild_schedule()?;
        }
        {
            let (arena, roots, _, schedule) = self.world.parts_mut();
            update_composites(arena, schedule, roots, parallel)?;
        }

        // 3. De-articulation
        report.dearticulated = self.overloaded_bodies();
        for &body in &report.dearticulated {
            self.world.free(body)?;
            tracing::debug!(%body, tick = self.tick, "body broke off its parent");
        }
        if self.world.schedule_is_stale() {
            self.world.rebuild_schedule()?;
        }

        // 4. Joints
        let (joints_solved, fallbacks) = {
            let (arena, _, _, schedule) = self.world.parts_mut();
            update_joints(arena, schedule, &self.config, dt)?
        };
        report.joints_solved = joints_solved;
        report.eigen_fallbacks = fallbacks;

        // 5. Kinematics
        {
            let (arena, _, _, schedule) = self.world.parts_mut();
            report.levels = schedule.len();
            report.units = schedule.unit_count();
            update_kinematics(arena, schedule, parallel)?;
        }

        // 6. Free bodies
        report.free_bodies = self.world.integrate_free_bodies(dt)?;

        // 7. Reset
        self.world.reset_forces();

        report.wall_time = start.elapsed().as_secs_f64();
        Ok(report)
    }

    /// Articulated simulated bodies whose own torque exceeds their joint's
    /// capacity.
    fn overloaded_bodies(&self) -> Vec<BodyId> {
        let arena = self.world.arena();
        self.world
            .simulated_bodies()
            .into_iter()
            .filter(|&id| {
                arena
                    .get(id)
                    .and_then(|body| {
                        let joint = arena.joint(body.parent_joint()?).ok()?;
                        Some(body.torque.length() > joint.torque_threshold)
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}
