//! # Playback Module
//!
//! Playback queues and the offline cache reconciler.
//!
//! ## Overview
//!
//! This module handles:
//! - The [`Queue`](queue::Queue) contract with list-backed and paginated
//!   variants, and the [`PlaybackSession`](queue::PlaybackSession) that owns
//!   the active one
//! - Reconciling the player and download byte-range caches against the
//!   catalog into an offline snapshot ([`cache`])
//! - The fixed-interval [`ScheduledTask`](cache::ScheduledTask) that drives
//!   reconciliation for the lifetime of a session

pub mod cache;
pub mod error;
pub mod queue;

pub use cache::{
    CacheReconciler, CacheSnapshot, ContentFilters, FilterSource, ReconcilerConfig,
    ScheduledTask, SettingsFilterSource, TickReport,
};
pub use error::{PlaybackError, Result};
pub use queue::{
    ListQueue, PageSource, PaginatedQueue, PlaybackQueue, PlaybackSession, Queue, QueueItem,
    QueueKind, QueuePage, QueueStatus,
};
