//! Inspection hooks for live debugging.
//!
//! Hooks observe a [`Simulator`] from the outside: they are called around
//! every tick and see the report and the resulting world, but never the
//! intermediate phases.

use arbor_solver::{PhysicsWorld, Simulator, TickReport};
use arbor_telemetry::{EventKind, SimulationEvent};
use arbor_types::ArborResult;

/// Trait for simulation inspection hooks.
///
/// # Lifecycle
///
/// ```text
/// for each tick:
///   hook.on_tick_begin(...)
///   hook.on_tick_end(...)
/// hook.on_simulation_end()
/// ```
pub trait InspectionHook: Send {
    fn on_tick_begin(&mut self, tick: u64, sim_time: f32) {
        let _ = (tick, sim_time);
    }

    /// Called after a successful tick with its report and the new state.
    fn on_tick_end(&mut self, report: &TickReport, world: &PhysicsWorld) {
        let _ = (report, world);
    }

    fn on_simulation_end(&mut self) {}

    fn name(&self) -> &str;
}

/// Runs `steps` ticks, calling every hook around each one.
///
/// Stops at the first failed tick; `on_simulation_end` is still called.
pub fn run_with_hooks(
    sim: &mut Simulator,
    steps: usize,
    dt: f32,
    hooks: &mut [Box<dyn InspectionHook>],
) -> ArborResult<Vec<TickReport>> {
    let mut reports = Vec::with_capacity(steps);
    let mut outcome = Ok(());
    for _ in 0..steps {
        for hook in hooks.iter_mut() {
            hook.on_tick_begin(sim.tick(), sim.sim_time());
        }
        match sim.update(dt) {
            Ok(report) => {
                for hook in hooks.iter_mut() {
                    hook.on_tick_end(&report, sim.world());
                }
                reports.push(report);
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    for hook in hooks.iter_mut() {
        hook.on_simulation_end();
    }
    outcome.map(|()| reports)
}

/// Hook that bridges to the telemetry event bus.
///
/// Translates tick lifecycle calls into telemetry events; drain them and
/// hand them to an [`arbor_telemetry::EventBus`].
#[derive(Debug, Default)]
pub struct TelemetryHook {
    events: Vec<SimulationEvent>,
}

impl TelemetryHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl InspectionHook for TelemetryHook {
    fn on_tick_begin(&mut self, tick: u64, sim_time: f32) {
        self.events
            .push(SimulationEvent::new(tick, EventKind::TickBegin { sim_time }));
    }

    fn on_tick_end(&mut self, report: &TickReport, world: &PhysicsWorld) {
        let mut events = SimulationEvent::from_report(report);
        events.retain(|e| !matches!(e.kind, EventKind::TickBegin { .. }));
        let energy = SimulationEvent::new(
            report.tick,
            EventKind::Energy {
                kinetic: f64::from(world.kinetic_energy()),
            },
        );
        // Energy goes right before the closing TickEnd.
        let end = events.len().saturating_sub(1);
        events.insert(end, energy);
        self.events.extend(events);
    }

    fn name(&self) -> &str {
        "telemetry_hook"
    }
}

/// Checks world invariants after every tick and records violations.
#[derive(Debug, Clone)]
pub struct InvariantHook {
    /// Relative tolerance of the composite-mass check.
    pub mass_tolerance: f32,
    /// Allowed deviation of a quaternion norm from 1.
    pub orientation_tolerance: f32,
    violations: Vec<String>,
}

impl Default for InvariantHook {
    fn default() -> Self {
        Self {
            mass_tolerance: 1e-4,
            orientation_tolerance: 1e-3,
            violations: Vec::new(),
        }
    }
}

impl InvariantHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Checks `world` as it stands after `tick`.
    ///
    /// The composite-mass check is skipped on ticks where a body broke
    /// off, since root composites were built before the break.
    pub fn check(&mut self, tick: u64, world: &PhysicsWorld, topology_changed: bool) {
        let arena = world.arena();
        for &root in world.roots() {
            let Ok(bodies) = arena.flattened(root) else {
                self.record(tick, format!("root {root} cannot be traversed"));
                continue;
            };
            for id in bodies {
                let Some(body) = arena.get(id) else { continue };
                if !body.is_finite() {
                    self.record(tick, format!("{id} has non-finite state"));
                }
                let norm = body.orientation.length();
                if (norm - 1.0).abs() > self.orientation_tolerance {
                    self.record(tick, format!("{id} orientation norm is {norm}"));
                }
            }

            if topology_changed {
                continue;
            }
            let (Ok(expected), Some(body)) = (arena.subtree_mass(root), arena.get(root)) else {
                continue;
            };
            let actual = body.composite.mass;
            if (actual - expected).abs() > self.mass_tolerance * expected.abs().max(1.0) {
                self.record(
                    tick,
                    format!("{root} composite mass {actual} differs from subtree mass {expected}"),
                );
            }
        }
    }

    fn record(&mut self, tick: u64, message: String) {
        tracing::error!(tick, %message, "invariant violated");
        self.violations.push(format!("tick {tick}: {message}"));
    }
}

impl InspectionHook for InvariantHook {
    fn on_tick_end(&mut self, report: &TickReport, world: &PhysicsWorld) {
        self.check(report.tick, world, !report.dearticulated.is_empty());
    }

    fn name(&self) -> &str {
        "invariant_hook"
    }
}
