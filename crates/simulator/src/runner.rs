//! Simulation runner.

use crate::{SimulationReport, SimulatorConfig, SimulatorError};
use hashgraph_orphan::{
    DefaultIntakeEventCounter, IntakeEventCounter, OrphanBuffer, OrphanBufferConfig,
};
use hashgraph_test_helpers::EventGenerator;
use hashgraph_types::{EventWindow, NodeId, PlatformEvent};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Drives one orphan buffer through a shuffled delivery of a generated DAG.
///
/// Plays both neighbours of the buffer: gossip upstream, delivering events
/// in a seeded random order, and consensus downstream, consuming released
/// events and advancing the ancient window behind the highest one released.
pub struct Simulator {
    config: SimulatorConfig,
    buffer: OrphanBuffer,
    counter: Arc<DefaultIntakeEventCounter>,
    generator: EventGenerator,
    report: SimulationReport,
    highest_emitted: u64,
    consensus_round: u64,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .field("report", &self.report)
            .finish()
    }
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;

        let counter = Arc::new(DefaultIntakeEventCounter::new());
        let buffer = OrphanBuffer::new(
            OrphanBufferConfig::default(),
            EventWindow::genesis(config.ancient_mode),
            Arc::clone(&counter) as Arc<dyn IntakeEventCounter>,
        );
        let generator = EventGenerator::new(config.creators, config.seed)
            .with_max_other_parents(config.max_other_parents);

        Ok(Self {
            highest_emitted: config.ancient_mode.genesis_indicator(),
            config,
            buffer,
            counter,
            generator,
            report: SimulationReport::default(),
            consensus_round: 0,
        })
    }

    /// Generate, shuffle and deliver every event, then report.
    #[instrument(level = "info", skip(self), fields(seed = self.config.seed))]
    pub fn run(mut self) -> Result<SimulationReport, SimulatorError> {
        let mut events = self.generator.generate(self.config.events);
        self.generator.shuffle(&mut events);
        info!(
            events = events.len(),
            creators = self.config.creators,
            mode = %self.config.ancient_mode,
            "Delivering shuffled events"
        );

        for (delivered, event) in events.into_iter().enumerate() {
            self.deliver(event)?;
            let every = self.config.window_every;
            if every > 0 && (delivered + 1) % every == 0 {
                self.advance_window()?;
            }
        }

        let mut report = self.report;
        report.final_orphan_count = self.buffer.current_orphan_count();
        report.discarded = self.buffer.stats().ancient_discarded;
        report.final_ancient_threshold = self.buffer.event_window().ancient_threshold();
        report.creators_with_unprocessed_events = (0..self.config.creators as u64)
            .filter(|id| self.counter.has_unprocessed_events(NodeId(*id)))
            .count();
        Ok(report)
    }

    fn deliver(&mut self, event: Arc<PlatformEvent>) -> Result<(), SimulatorError> {
        self.counter.event_entered_intake_pipeline(event.descriptor());
        self.report.delivered += 1;
        let released = self.buffer.handle_event(event)?;
        self.consume(released);
        Ok(())
    }

    /// Move the ancient threshold up behind the highest emitted indicator.
    /// Does nothing if that would not raise it.
    fn advance_window(&mut self) -> Result<(), SimulatorError> {
        let current = *self.buffer.event_window();
        let threshold = self
            .highest_emitted
            .saturating_sub(self.config.generations_non_ancient)
            .max(current.ancient_threshold());
        if threshold == current.ancient_threshold() {
            return Ok(());
        }

        self.consensus_round += 1;
        let expired = threshold
            .saturating_sub(self.config.generations_non_ancient)
            .max(self.config.ancient_mode.genesis_indicator());
        let window = EventWindow::new(
            self.consensus_round,
            threshold,
            expired,
            self.config.ancient_mode,
        )?;
        debug!(round = self.consensus_round, threshold, "Advancing window");

        let released = self.buffer.set_event_window(window)?;
        self.report.window_advances += 1;
        self.consume(released);
        Ok(())
    }

    /// Hand released events to the imaginary consumer.
    fn consume(&mut self, released: Vec<Arc<PlatformEvent>>) {
        let mode = self.config.ancient_mode;
        for event in released {
            self.highest_emitted = self.highest_emitted.max(event.descriptor().indicator(mode));
            self.counter.event_exited_intake_pipeline(event.descriptor());
            self.report.emitted += 1;
        }
        self.report.max_orphan_count = self
            .report
            .max_orphan_count
            .max(self.buffer.current_orphan_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashgraph_types::AncientMode;
    use tracing_test::traced_test;

    #[test]
    fn test_run_without_windows_emits_everything() {
        let report = Simulator::new(SimulatorConfig::new(4, 1_000).with_seed(3))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.delivered, 1_000);
        assert_eq!(report.emitted, 1_000);
        assert_eq!(report.discarded, 0);
        assert_eq!(report.window_advances, 0);
        assert!(report.max_orphan_count > 0);
        assert!(report.is_settled());
    }

    #[traced_test]
    #[test]
    fn test_run_with_windows_settles() {
        let config = SimulatorConfig::new(6, 3_000)
            .with_seed(21)
            .with_window_every(100)
            .with_generations_non_ancient(10);
        let report = Simulator::new(config).unwrap().run().unwrap();

        assert!(report.window_advances > 0);
        let genesis = AncientMode::GenerationThreshold.genesis_indicator();
        assert!(report.final_ancient_threshold > genesis);
        assert!(report.is_settled(), "{report:?}");
        assert!(logs_contain("Delivering shuffled events"));
    }

    #[test]
    fn test_birth_round_mode_settles() {
        let config = SimulatorConfig::new(4, 2_000)
            .with_seed(5)
            .with_window_every(50)
            .with_ancient_mode(AncientMode::BirthRoundThreshold)
            .with_generations_non_ancient(2);
        let report = Simulator::new(config).unwrap().run().unwrap();

        assert!(report.window_advances > 0);
        assert!(report.is_settled(), "{report:?}");
    }

    #[test]
    fn test_rejects_zero_creators() {
        assert!(matches!(
            Simulator::new(SimulatorConfig::new(0, 10)),
            Err(SimulatorError::InvalidConfig(_))
        ));
    }
}
