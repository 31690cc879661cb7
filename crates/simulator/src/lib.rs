//! Orphan buffer simulator.
//!
//! Generates a seeded event DAG, delivers it to an
//! [`OrphanBuffer`](hashgraph_orphan::OrphanBuffer) in shuffled order the way
//! gossip would, and advances the ancient window as consensus would. The run
//! is single-threaded and reproducible from its seed.
//!
//! # Example
//!
//! ```
//! use hashgraph_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(4, 500).with_seed(7).with_window_every(50);
//! let report = Simulator::new(config).unwrap().run().unwrap();
//!
//! assert_eq!(report.delivered, 500);
//! assert_eq!(report.final_orphan_count, 0);
//! ```

mod config;
mod error;
mod report;
mod runner;

pub use config::{SimulatorConfig, DEFAULT_GENERATIONS_NON_ANCIENT};
pub use error::SimulatorError;
pub use report::SimulationReport;
pub use runner::Simulator;
