//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`, `core-sync`). Host
//! applications can depend on `offline-core` and enable the documented
//! features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service;

#[cfg(feature = "playback")]
pub use core_playback;

#[cfg(feature = "playlist-sync")]
pub use core_sync;
