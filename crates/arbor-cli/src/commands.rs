//! CLI command implementations.

use std::fs::File;
use std::io::BufWriter;

use arbor_bench::metrics::BenchmarkMetrics;
use arbor_bench::runner::BenchmarkRunner;
use arbor_bench::scenarios::{Scenario, ScenarioKind};
use arbor_debug::hooks::{InspectionHook, InvariantHook, TelemetryHook};
use arbor_debug::snapshot::WorldSnapshot;
use arbor_gpu::{BackendDriver, ComputeBackend, CpuFallback, RayonBackend};
use arbor_solver::{PhysicsWorld, Simulator, SimulatorConfig, TickReport};
use arbor_telemetry::{EventBus, JsonLinesSink, TracingSink};
use arbor_tree::BodyKind;
use arbor_types::ArborResult;
use serde::Deserialize;

use crate::Backend;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Contents of a simulation file.
///
/// ```toml
/// scenario = "windy_tree"
/// steps = 240
/// dt = 0.008333
///
/// [simulator]
/// parallel = true
/// torque_fictitious_multipliers = [1.0, 1.0, 0.5]
/// ```
///
/// Missing keys fall back to the scenario's own settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SimulationFile {
    scenario: Option<String>,
    steps: Option<u32>,
    dt: Option<f32>,
    simulator: Option<SimulatorConfig>,
}

impl SimulationFile {
    fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn check(&self) -> ArborResult<()> {
        if let Some(name) = &self.scenario {
            ScenarioKind::from_name(name)?;
        }
        if let Some(dt) = self.dt {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(arbor_types::ArborError::InvalidConfig(format!(
                    "dt must be positive and finite, got {dt}"
                )));
            }
        }
        if self.steps == Some(0) {
            return Err(arbor_types::ArborError::InvalidConfig(
                "steps must be at least 1".into(),
            ));
        }
        match &self.simulator {
            Some(config) => config.validate(),
            None => Ok(()),
        }
    }
}

fn make_backend(backend: Backend) -> Option<Box<dyn ComputeBackend>> {
    match backend {
        Backend::Simulator => None,
        Backend::Cpu => Some(Box::new(CpuFallback::new())),
        Backend::Rayon => Some(Box::new(RayonBackend::new())),
    }
}

/// Either execution path, behind one tick interface.
enum Stepper {
    Simulator(Simulator),
    Driver(BackendDriver, PhysicsWorld),
}

impl Stepper {
    fn new(backend: Backend, config: SimulatorConfig, world: PhysicsWorld) -> ArborResult<Self> {
        match make_backend(backend) {
            None => {
                config.validate()?;
                Ok(Self::Simulator(Simulator::new(config, world)))
            }
            Some(backend) => Ok(Self::Driver(BackendDriver::new(backend, config)?, world)),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Simulator(_) => "simulator",
            Self::Driver(driver, _) => driver.backend_name(),
        }
    }

    fn tick(&self) -> u64 {
        match self {
            Self::Simulator(sim) => sim.tick(),
            Self::Driver(driver, _) => driver.tick(),
        }
    }

    fn sim_time(&self) -> f32 {
        match self {
            Self::Simulator(sim) => sim.sim_time(),
            Self::Driver(driver, _) => driver.sim_time(),
        }
    }

    fn world(&self) -> &PhysicsWorld {
        match self {
            Self::Simulator(sim) => sim.world(),
            Self::Driver(_, world) => world,
        }
    }

    fn update(&mut self, dt: f32) -> ArborResult<TickReport> {
        match self {
            Self::Simulator(sim) => sim.update(dt),
            Self::Driver(driver, world) => driver.update(world, dt),
        }
    }
}

/// Arguments of `arbor simulate`.
pub struct SimulateArgs<'a> {
    pub config: Option<&'a str>,
    pub scenario: Option<&'a str>,
    pub steps: Option<u32>,
    pub backend: Backend,
    pub snapshot: Option<&'a str>,
    pub events: Option<&'a str>,
}

/// Run a scenario, streaming telemetry and checking invariants each tick.
pub fn simulate(args: SimulateArgs<'_>) -> CliResult {
    println!("Arbor Simulation");
    println!("────────────────");

    let file = match args.config {
        Some(path) => {
            println!("Config:    {path}");
            let file = SimulationFile::load(path)?;
            file.check()?;
            file
        }
        None => SimulationFile::default(),
    };

    let name = args
        .scenario
        .or(file.scenario.as_deref())
        .unwrap_or(ScenarioKind::WindyTree.name());
    let mut scenario = Scenario::from_kind(ScenarioKind::from_name(name)?)?;
    if let Some(config) = file.simulator {
        scenario.config = config;
    }
    if let Some(dt) = file.dt {
        scenario.dt = dt;
    }
    if let Some(steps) = args.steps.or(file.steps) {
        scenario.timesteps = steps;
    }

    let Scenario {
        world,
        config,
        timesteps,
        dt,
        ..
    } = scenario;
    let mut stepper = Stepper::new(args.backend, config, world)?;

    println!("Scenario:  {name}");
    println!("Backend:   {}", stepper.name());
    println!(
        "Bodies:    {} ({} free)",
        stepper.world().simulated_body_count(),
        stepper.world().free_bodies().count()
    );
    println!("Steps:     {timesteps} × {dt:.5}s");
    println!();

    tracing::info!(scenario = name, backend = stepper.name(), timesteps, "simulation starting");

    let mut bus = EventBus::new();
    bus.add_sink(Box::new(TracingSink::default()));
    if let Some(path) = args.events {
        let writer = BufWriter::new(File::create(path)?);
        bus.add_sink(Box::new(JsonLinesSink::new(writer)));
    }

    let mut telemetry = TelemetryHook::new();
    let mut invariants = InvariantHook::new();
    let mut dearticulated = 0;
    let mut eigen_fallbacks = 0;
    let mut wall_time = 0.0;

    for _ in 0..timesteps {
        telemetry.on_tick_begin(stepper.tick(), stepper.sim_time());
        let report = stepper.update(dt)?;
        telemetry.on_tick_end(&report, stepper.world());
        invariants.on_tick_end(&report, stepper.world());

        dearticulated += report.dearticulated.len();
        eigen_fallbacks += report.eigen_fallbacks;
        wall_time += report.wall_time;

        bus.emit_all(telemetry.drain_events());
        bus.flush();
    }
    telemetry.on_simulation_end();
    invariants.on_simulation_end();
    bus.finalize();

    println!("  Wall time:       {wall_time:.3}s");
    println!("  Sim time:        {:.3}s", stepper.sim_time());
    println!("  Final KE:        {:.6e}", stepper.world().kinetic_energy());
    println!("  Dearticulated:   {dearticulated}");
    println!("  Eigen fallbacks: {eigen_fallbacks}");
    println!("  Violations:      {}", invariants.violations().len());
    for violation in invariants.violations().iter().take(5) {
        println!("    {violation}");
    }

    if let Some(path) = args.events {
        println!("Events written to: {path}");
    }
    if let Some(path) = args.snapshot {
        WorldSnapshot::capture(stepper.world(), stepper.tick(), stepper.sim_time())
            .write_to(path)?;
        println!("Snapshot written to: {path}");
    }

    if !invariants.is_clean() {
        return Err(format!("{} invariant violations", invariants.violations().len()).into());
    }
    Ok(())
}

/// Run benchmark suite.
pub fn benchmark(
    scenario_name: &str,
    backend: Backend,
    output_path: Option<&str>,
    json: bool,
) -> CliResult {
    println!("Arbor Benchmark Suite");
    println!("═════════════════════");
    println!();

    let scenarios: Vec<ScenarioKind> = if scenario_name == "all" {
        ScenarioKind::all().to_vec()
    } else {
        match ScenarioKind::from_name(scenario_name) {
            Ok(kind) => vec![kind],
            Err(e) => {
                let available: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
                eprintln!("Available: {}, all", available.join(", "));
                return Err(e.into());
            }
        }
    };

    let mut all_metrics = Vec::new();

    for &kind in &scenarios {
        let scenario = Scenario::from_kind(kind)?;

        println!(
            "Running: {} ({} bodies, {} joints, {} steps)",
            kind.name(),
            scenario.world.simulated_body_count(),
            scenario.world.arena().joint_count(),
            scenario.timesteps,
        );

        let metrics = match make_backend(backend) {
            None => BenchmarkRunner::run(scenario),
            Some(backend) => BenchmarkRunner::run_with_backend(scenario, backend),
        }
        .map_err(|e| format!("Benchmark failed: {e}"))?;

        println!("  Wall time:     {:.3}s", metrics.total_wall_time);
        println!("  Avg step:      {:.3}ms", metrics.avg_step_time * 1000.0);
        println!("  Final KE:      {:.6e}", metrics.final_kinetic_energy);
        println!("  Max displace:  {:.4}m", metrics.max_displacement);
        println!("  Broken off:    {}", metrics.dearticulated);
        println!();

        all_metrics.push(metrics);
    }

    let rendered = if json {
        BenchmarkMetrics::to_json(&all_metrics)?
    } else {
        BenchmarkMetrics::to_csv(&all_metrics)
    };

    if let Some(path) = output_path {
        std::fs::write(path, &rendered)?;
        println!("Results written to: {path}");
    } else {
        println!("{}", if json { "JSON Output:" } else { "CSV Output:" });
        println!("{rendered}");
    }

    Ok(())
}

/// Inspect a world snapshot.
pub fn inspect(path: &str) -> CliResult {
    println!("Arbor Snapshot Inspector");
    println!("────────────────────────");
    println!();

    let snapshot = WorldSnapshot::read_from(path)
        .map_err(|e| format!("Failed to read snapshot: {e}"))?;

    let articulated = snapshot
        .bodies
        .iter()
        .filter(|b| matches!(b.kind, BodyKind::Articulated { .. }))
        .count();
    let free = snapshot
        .bodies
        .iter()
        .filter(|b| b.kind == BodyKind::Dynamic)
        .count();

    println!("Tick:         {}", snapshot.tick);
    println!("Sim time:     {:.4}s", snapshot.sim_time);
    println!("Roots:        {}", snapshot.roots.len());
    println!(
        "Bodies:       {} ({articulated} articulated, {free} free)",
        snapshot.bodies.len()
    );
    println!("Joints:       {}", snapshot.joints.len());

    if !snapshot.bodies.is_empty() {
        let min_y = snapshot
            .bodies
            .iter()
            .map(|b| b.center_of_mass.y)
            .fold(f32::INFINITY, f32::min);
        let max_y = snapshot
            .bodies
            .iter()
            .map(|b| b.center_of_mass.y)
            .fold(f32::NEG_INFINITY, f32::max);
        let max_speed = snapshot
            .bodies
            .iter()
            .map(|b| b.velocity.length())
            .fold(0.0_f32, f32::max);
        println!("Y range:      [{min_y:.4}, {max_y:.4}]");
        println!("Max speed:    {max_speed:.4}m/s");
    }
    if !snapshot.joints.is_empty() {
        let max_angle = snapshot
            .joints
            .iter()
            .map(|j| j.theta.angle.abs().max_element())
            .fold(0.0_f32, f32::max);
        println!("Max angle:    {max_angle:.4}rad");
    }

    Ok(())
}

/// Validate a simulation file.
pub fn validate(path: &str) -> CliResult {
    println!("Arbor Validator");
    println!("───────────────");
    println!();

    if !path.ends_with(".toml") {
        return Err(format!("Unsupported file type: {path}").into());
    }

    println!("Validating simulation file: {path}");
    let file = SimulationFile::load(path)?;
    file.check()?;
    println!("✅ Simulation file is valid.");
    if let Some(name) = &file.scenario {
        println!("   Scenario: {name}");
    }
    if let Some(config) = &file.simulator {
        println!("   Fictitious torques: {:?}", config.torque_fictitious_multipliers);
        println!("   Parallel: {}", config.parallel);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_file_parses_partial_tables() {
        let file: SimulationFile = toml::from_str(
            r#"
            scenario = "binary_tree"
            steps = 10

            [simulator]
            parallel = true
            "#,
        )
        .unwrap();
        assert_eq!(file.scenario.as_deref(), Some("binary_tree"));
        assert_eq!(file.steps, Some(10));
        let config = file.simulator.clone().unwrap();
        assert!(config.parallel);
        assert_eq!(config.max_eigen_sweeps, SimulatorConfig::default().max_eigen_sweeps);
        file.check().unwrap();
    }

    #[test]
    fn simulation_file_rejects_bad_values() {
        let unknown: SimulationFile = toml::from_str("scenario = \"no_such_scenario\"").unwrap();
        assert!(unknown.check().is_err());

        let zero_sweeps: SimulationFile =
            toml::from_str("[simulator]\nmax_eigen_sweeps = 0").unwrap();
        assert!(zero_sweeps.check().is_err());

        let negative_dt: SimulationFile = toml::from_str("dt = -0.1").unwrap();
        assert!(negative_dt.check().is_err());

        assert!(toml::from_str::<SimulationFile>("gravity = [0.0, -9.8, 0.0]").is_err());
    }

    #[test]
    fn steppers_agree_on_one_tick() {
        let mut a = Stepper::new(
            Backend::Simulator,
            Scenario::single_segment().unwrap().config,
            Scenario::single_segment().unwrap().world,
        )
        .unwrap();
        let mut b = Stepper::new(
            Backend::Cpu,
            Scenario::single_segment().unwrap().config,
            Scenario::single_segment().unwrap().world,
        )
        .unwrap();
        assert_eq!(b.name(), "cpu_fallback");
        a.update(1.0 / 60.0).unwrap();
        b.update(1.0 / 60.0).unwrap();
        assert_eq!(a.tick(), b.tick());
        let ka = a.world().kinetic_energy();
        let kb = b.world().kinetic_energy();
        assert!((ka - kb).abs() <= 1e-5 * ka.max(1.0));
    }
}
