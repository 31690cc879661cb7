//! Simulator configuration.

use crate::SimulatorError;
use hashgraph_types::AncientMode;
use serde::{Deserialize, Serialize};

/// Default distance, in ancient indicator units, between the highest emitted
/// event and the ancient threshold.
pub const DEFAULT_GENERATIONS_NON_ANCIENT: u64 = 26;

/// Parameters of one simulated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seed for DAG generation and delivery order.
    pub seed: u64,
    /// Number of event creators.
    pub creators: usize,
    /// Number of events to generate and deliver.
    pub events: usize,
    /// Upper bound on other-parents per event.
    #[serde(default = "default_max_other_parents")]
    pub max_other_parents: usize,
    /// Advance the window after this many deliveries. Zero never advances it.
    #[serde(default)]
    pub window_every: usize,
    #[serde(default = "default_ancient_mode")]
    pub ancient_mode: AncientMode,
    /// How far the ancient threshold trails the highest emitted indicator.
    /// Counted in generations or birth rounds, per `ancient_mode`.
    #[serde(default = "default_generations_non_ancient")]
    pub generations_non_ancient: u64,
}

fn default_max_other_parents() -> usize {
    2
}

fn default_ancient_mode() -> AncientMode {
    AncientMode::GenerationThreshold
}

fn default_generations_non_ancient() -> u64 {
    DEFAULT_GENERATIONS_NON_ANCIENT
}

impl SimulatorConfig {
    /// A run of `events` events from `creators` creators with seed 0 and no
    /// window advances.
    pub fn new(creators: usize, events: usize) -> Self {
        Self {
            seed: 0,
            creators,
            events,
            max_other_parents: default_max_other_parents(),
            window_every: 0,
            ancient_mode: default_ancient_mode(),
            generations_non_ancient: default_generations_non_ancient(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_other_parents(mut self, max_other_parents: usize) -> Self {
        self.max_other_parents = max_other_parents;
        self
    }

    pub fn with_window_every(mut self, window_every: usize) -> Self {
        self.window_every = window_every;
        self
    }

    pub fn with_ancient_mode(mut self, ancient_mode: AncientMode) -> Self {
        self.ancient_mode = ancient_mode;
        self
    }

    pub fn with_generations_non_ancient(mut self, generations_non_ancient: u64) -> Self {
        self.generations_non_ancient = generations_non_ancient;
        self
    }

    /// Check the parameters describe a runnable simulation.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.creators == 0 {
            return Err(SimulatorError::InvalidConfig(
                "creators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SimulatorConfig::new(5, 100)
            .with_seed(9)
            .with_window_every(10)
            .with_ancient_mode(AncientMode::BirthRoundThreshold)
            .with_generations_non_ancient(3);

        assert_eq!(config.seed, 9);
        assert_eq!(config.window_every, 10);
        assert_eq!(config.ancient_mode, AncientMode::BirthRoundThreshold);
        assert_eq!(config.generations_non_ancient, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(SimulatorConfig::new(0, 10).validate().is_err());
        assert!(SimulatorConfig::new(1, 0).validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: SimulatorConfig =
            serde_json::from_str(r#"{"seed": 1, "creators": 4, "events": 50}"#).unwrap();
        assert_eq!(config, SimulatorConfig::new(4, 50).with_seed(1));
    }
}
