//! Reconciler configuration

use core_runtime::config::{EngineConfig, DEFAULT_RECONCILE_INTERVAL, MAX_RECONCILE_INTERVAL};
use std::time::Duration;

/// Configuration for the cache reconciler task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Delay between the start of consecutive ticks (default: 1s)
    pub interval: Duration,

    /// Re-send the snapshot to subscribers even when nothing changed
    /// (default: false)
    pub publish_unchanged: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RECONCILE_INTERVAL,
            publish_unchanged: false,
        }
    }
}

impl ReconcilerConfig {
    /// Create a new reconciler configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Notify subscribers on every tick.
    pub fn with_publish_unchanged(mut self, enabled: bool) -> Self {
        self.publish_unchanged = enabled;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("Reconcile interval must be greater than 0".to_string());
        }

        if self.interval > MAX_RECONCILE_INTERVAL {
            return Err("Reconcile interval exceeds maximum of 1 hour".to_string());
        }

        Ok(())
    }
}

impl From<&EngineConfig> for ReconcilerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self::new().with_interval(config.reconcile_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert!(!config.publish_unchanged);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_bounds() {
        assert!(ReconcilerConfig::new()
            .with_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ReconcilerConfig::new()
            .with_interval(Duration::from_secs(7200))
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_engine_config() {
        let engine = EngineConfig::builder()
            .reconcile_interval(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(
            ReconcilerConfig::from(&engine).interval,
            Duration::from_millis(250)
        );
    }
}
