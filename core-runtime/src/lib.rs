//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the offline core crates:
//! - Logging and tracing infrastructure
//! - Engine configuration
//! - Event bus system
//!
//! Other crates depend on this one for their logging conventions and for the
//! broadcast channel through which cache and library changes are announced.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
