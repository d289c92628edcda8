//! # Engine Configuration
//!
//! Builder-based configuration for an offline engine session.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .reconcile_interval(Duration::from_secs(1))
//!     .hide_explicit(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Validation
//!
//! [`EngineConfigBuilder::build`] fails fast with [`Error::Config`] when a
//! value cannot be honoured, e.g. a zero reconcile interval.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default period between two reconciliation ticks.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

/// Longest accepted reconcile interval.
pub const MAX_RECONCILE_INTERVAL: Duration = Duration::from_secs(3600);

/// Where the song catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file on disk, created on first use.
    File(PathBuf),
    /// Private in-memory database, discarded with the session.
    InMemory,
}

/// Content filter defaults applied when no settings store is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterDefaults {
    pub hide_explicit: bool,
    pub hide_video: bool,
}

/// Configuration for one engine session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Catalog database location
    pub database: DatabaseLocation,

    /// Period between reconciliation ticks
    pub reconcile_interval: Duration,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Filter values used until settings say otherwise
    pub default_filters: FilterDefaults,

    /// Mirror playlist inserts to the remote catalog when the playlist is linked
    pub enable_remote_mirroring: bool,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// In-memory configuration with every default applied.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseLocation::InMemory,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            default_filters: FilterDefaults::default(),
            enable_remote_mirroring: true,
        }
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.reconcile_interval.is_zero() {
            return Err(Error::Config(
                "Reconcile interval must be greater than 0".to_string(),
            ));
        }

        if self.reconcile_interval > MAX_RECONCILE_INTERVAL {
            return Err(Error::Config(
                "Reconcile interval exceeds maximum of 1 hour".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    database_path: Option<PathBuf>,
    reconcile_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    default_filters: FilterDefaults,
    enable_remote_mirroring: Option<bool>,
}

impl EngineConfigBuilder {
    /// Store the catalog in a SQLite file. Without it the catalog is in-memory.
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = Some(interval);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn hide_explicit(mut self, hide: bool) -> Self {
        self.default_filters.hide_explicit = hide;
        self
    }

    pub fn hide_video(mut self, hide: bool) -> Self {
        self.default_filters.hide_video = hide;
        self
    }

    pub fn enable_remote_mirroring(mut self, enable: bool) -> Self {
        self.enable_remote_mirroring = Some(enable);
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        let config = EngineConfig {
            database: self
                .database_path
                .map(DatabaseLocation::File)
                .unwrap_or(DatabaseLocation::InMemory),
            reconcile_interval: self
                .reconcile_interval
                .unwrap_or(DEFAULT_RECONCILE_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            default_filters: self.default_filters,
            enable_remote_mirroring: self.enable_remote_mirroring.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
