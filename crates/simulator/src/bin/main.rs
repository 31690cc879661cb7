//! Orphan Buffer Simulator CLI
//!
//! Deliver a generated event DAG to an orphan buffer in shuffled order and
//! report how the buffer coped.
//!
//! # Example
//!
//! ```bash
//! # Reproducible run with a fixed seed
//! orphan-sim --seed 42 -c 8 -e 20000 --window-every 200
//!
//! # Birth-round mode with a random seed, dumping Prometheus metrics
//! orphan-sim -c 4 -e 5000 --window-every 100 --mode birth-round --metrics
//! ```

use clap::{Parser, ValueEnum};
use hashgraph_simulator::{Simulator, SimulatorConfig, DEFAULT_GENERATIONS_NON_ANCIENT};
use hashgraph_types::AncientMode;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Generation,
    BirthRound,
}

impl From<Mode> for AncientMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Generation => AncientMode::GenerationThreshold,
            Mode::BirthRound => AncientMode::BirthRoundThreshold,
        }
    }
}

/// Orphan Buffer Simulator
///
/// Single-threaded and reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "orphan-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of event creators
    #[arg(short = 'c', long, default_value = "4")]
    creators: usize,

    /// Number of events to generate and deliver
    #[arg(short = 'e', long, default_value = "10000")]
    events: usize,

    /// Maximum other-parents per event
    #[arg(long, default_value = "2")]
    max_other_parents: usize,

    /// Advance the ancient window after this many deliveries (0 = never)
    #[arg(short = 'w', long, default_value = "0")]
    window_every: usize,

    /// Indicator compared against the ancient threshold
    #[arg(long, value_enum, default_value = "generation")]
    mode: Mode,

    /// How far the ancient threshold trails the highest emitted indicator
    #[arg(long, default_value_t = DEFAULT_GENERATIONS_NON_ANCIENT)]
    generations_non_ancient: u64,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Install the Prometheus recorder and print its metrics at the end
    #[arg(long)]
    metrics: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,hashgraph_simulator=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    if args.metrics {
        hashgraph_metrics_prometheus::install();
    }

    let config = SimulatorConfig::new(args.creators, args.events)
        .with_seed(seed)
        .with_max_other_parents(args.max_other_parents)
        .with_window_every(args.window_every)
        .with_ancient_mode(args.mode.into())
        .with_generations_non_ancient(args.generations_non_ancient);

    info!(
        seed,
        creators = config.creators,
        events = config.events,
        max_other_parents = config.max_other_parents,
        window_every = config.window_every,
        mode = %config.ancient_mode,
        "Starting simulation"
    );

    let report = match Simulator::new(config).and_then(Simulator::run) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            return ExitCode::FAILURE;
        }
    };

    report.log();
    report.print();

    if args.metrics {
        match hashgraph_metrics_prometheus::encode_metrics() {
            Ok((_, body)) => println!("\n{}", String::from_utf8_lossy(&body)),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    if report.is_settled() {
        ExitCode::SUCCESS
    } else {
        warn!("Simulation finished with events unaccounted for");
        ExitCode::FAILURE
    }
}
