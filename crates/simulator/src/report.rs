use serde::Serialize;
use tracing::info;

/// Outcome of a [`Simulator`](crate::Simulator) run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SimulationReport {
    /// Events handed to the buffer.
    pub delivered: u64,
    /// Events the buffer released downstream.
    pub emitted: u64,
    /// Events dropped on arrival because they were already ancient.
    pub discarded: u64,
    /// Events still buffered when delivery finished.
    pub final_orphan_count: usize,
    /// Largest orphan count seen after any single call.
    pub max_orphan_count: usize,
    /// Windows installed during the run.
    pub window_advances: u64,
    /// Ancient threshold of the last installed window.
    pub final_ancient_threshold: u64,
    /// Creators whose events entered intake but never left it.
    pub creators_with_unprocessed_events: usize,
}

impl SimulationReport {
    /// Every delivered event either came out of the buffer or was dropped as
    /// ancient, and the intake counter is balanced.
    pub fn is_settled(&self) -> bool {
        self.final_orphan_count == 0
            && self.emitted + self.discarded == self.delivered
            && self.creators_with_unprocessed_events == 0
    }

    /// Emit the report as a structured log line.
    pub fn log(&self) {
        info!(
            delivered = self.delivered,
            emitted = self.emitted,
            discarded = self.discarded,
            final_orphan_count = self.final_orphan_count,
            max_orphan_count = self.max_orphan_count,
            window_advances = self.window_advances,
            final_ancient_threshold = self.final_ancient_threshold,
            creators_with_unprocessed_events = self.creators_with_unprocessed_events,
            settled = self.is_settled(),
            "Simulation report"
        );
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("\n=== Orphan Buffer Simulation ===");
        println!("Delivered: {}", self.delivered);
        println!("Emitted: {}", self.emitted);
        println!("Discarded (ancient): {}", self.discarded);
        println!("Final orphan count: {}", self.final_orphan_count);
        println!("Max orphan count: {}", self.max_orphan_count);
        println!("Window advances: {}", self.window_advances);
        println!("Final ancient threshold: {}", self.final_ancient_threshold);
        println!(
            "Creators with unprocessed events: {}",
            self.creators_with_unprocessed_events
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled() {
        let report = SimulationReport {
            delivered: 10,
            emitted: 7,
            discarded: 3,
            ..Default::default()
        };
        assert!(report.is_settled());

        let leaking = SimulationReport {
            final_orphan_count: 1,
            ..report.clone()
        };
        assert!(!leaking.is_settled());
    }
}
