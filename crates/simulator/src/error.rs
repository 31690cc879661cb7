use hashgraph_orphan::OrphanBufferError;
use hashgraph_types::EventWindowError;
use thiserror::Error;

/// Errors from setting up or running a simulation.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Window construction failed: {0}")]
    Window(#[from] EventWindowError),

    #[error("Orphan buffer rejected input: {0}")]
    Buffer(#[from] OrphanBufferError),
}
