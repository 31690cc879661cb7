//! Scheduler configuration.

use serde::Deserialize;
use std::time::Duration;

/// Default number of unhandled tasks before `put` starts waiting.
pub const DEFAULT_UNHANDLED_TASK_CAPACITY: usize = 500;

/// Default pause between capacity checks in `put` and `flush`.
pub const DEFAULT_SLEEP_DURATION: Duration = Duration::from_millis(1);

/// Sequential scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Name used for the worker thread, logs and metric labels.
    #[serde(default = "default_name")]
    pub name: String,

    /// Unhandled tasks allowed before `put` waits and `offer` refuses.
    ///
    /// Zero means unbounded.
    #[serde(default = "default_unhandled_task_capacity")]
    pub unhandled_task_capacity: usize,

    /// How long `put` sleeps between capacity checks.
    #[serde(default = "default_sleep_duration")]
    pub sleep_duration: Duration,
}

fn default_name() -> String {
    "scheduler".to_string()
}

fn default_unhandled_task_capacity() -> usize {
    DEFAULT_UNHANDLED_TASK_CAPACITY
}

fn default_sleep_duration() -> Duration {
    DEFAULT_SLEEP_DURATION
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            unhandled_task_capacity: DEFAULT_UNHANDLED_TASK_CAPACITY,
            sleep_duration: DEFAULT_SLEEP_DURATION,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with default values and the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the unhandled task capacity. Zero means unbounded.
    pub fn with_unhandled_task_capacity(mut self, capacity: usize) -> Self {
        self.unhandled_task_capacity = capacity;
        self
    }

    /// Set the sleep between capacity checks.
    pub fn with_sleep_duration(mut self, duration: Duration) -> Self {
        self.sleep_duration = duration;
        self
    }

    /// Whether the scheduler applies backpressure at all.
    pub fn is_bounded(&self) -> bool {
        self.unhandled_task_capacity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.unhandled_task_capacity, 500);
        assert_eq!(config.sleep_duration, Duration::from_millis(1));
        assert!(config.is_bounded());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"name": "orphan_buffer", "unhandled_task_capacity": 0}"#)
                .unwrap();
        assert_eq!(config.name, "orphan_buffer");
        assert!(!config.is_bounded());
        assert_eq!(config.sleep_duration, DEFAULT_SLEEP_DURATION);
    }

    #[test]
    fn test_builders() {
        let config = SchedulerConfig::new("lane")
            .with_unhandled_task_capacity(8)
            .with_sleep_duration(Duration::from_micros(50));
        assert_eq!(config.name, "lane");
        assert_eq!(config.unhandled_task_capacity, 8);
        assert_eq!(config.sleep_duration, Duration::from_micros(50));
    }
}
