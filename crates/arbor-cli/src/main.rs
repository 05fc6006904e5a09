//! Arbor CLI: simulation, benchmarking, and debugging.

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(version, about = "Arbor: articulated tree physics solver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Execution path for the middle of each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The in-place simulator pipeline.
    Simulator,
    /// Flattened buffers, sequential reference backend.
    Cpu,
    /// Flattened buffers, level-parallel rayon backend.
    Rayon,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario, optionally from a simulation file.
    Simulate {
        /// Simulation file (TOML). Its scenario, steps and dt are used
        /// unless overridden below.
        #[arg(short, long)]
        config: Option<String>,

        /// Scenario to simulate (see `benchmark` for the list).
        #[arg(short, long)]
        scenario: Option<String>,

        /// Number of ticks.
        #[arg(long)]
        steps: Option<u32>,

        #[arg(long, value_enum, default_value = "simulator")]
        backend: Backend,

        /// Write the final world state to this snapshot file.
        #[arg(long)]
        snapshot: Option<String>,

        /// Write telemetry events as JSON lines to this file.
        #[arg(long)]
        events: Option<String>,
    },

    /// Run benchmark suite.
    Benchmark {
        /// Which scenario to run (single_segment, two_segment_chain,
        /// binary_tree, windy_tree, overload_break, falling_leaves, all).
        #[arg(short, long, default_value = "all")]
        scenario: String,

        #[arg(long, value_enum, default_value = "simulator")]
        backend: Backend,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<String>,

        /// Print JSON instead of CSV.
        #[arg(long)]
        json: bool,
    },

    /// Inspect a world snapshot file.
    Inspect {
        /// Path to snapshot file.
        path: String,
    },

    /// Validate a simulation file.
    Validate {
        /// Path to the TOML file.
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            config,
            scenario,
            steps,
            backend,
            snapshot,
            events,
        } => commands::simulate(commands::SimulateArgs {
            config: config.as_deref(),
            scenario: scenario.as_deref(),
            steps,
            backend,
            snapshot: snapshot.as_deref(),
            events: events.as_deref(),
        }),
        Commands::Benchmark {
            scenario,
            backend,
            output,
            json,
        } => commands::benchmark(&scenario, backend, output.as_deref(), json),
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
