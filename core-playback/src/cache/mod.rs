//! # Offline Cache Module
//!
//! Derives the "available offline" view from the two byte-range caches and
//! the song catalog.
//!
//! ## Overview
//!
//! - The player cache holds whatever playback happened to stream; the
//!   download cache holds what the user explicitly downloaded
//! - A song resident only in the player cache, with its full byte range
//!   present, is promoted: its catalog record gets a `downloaded_at` stamp
//! - The stamped songs, newest first and filtered by the content settings,
//!   form the [`CacheSnapshot`]
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     CacheReconciler                    │
//! │  - reconcile_tick()                    │
//! │  - evict()                             │
//! │  - subscribe() / snapshot()            │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> ByteRangeCache (player)
//!          ├──> ByteRangeCache (download)
//!          ├──> CatalogStore (DB)
//!          └──> FilterSource (settings)
//!
//! ScheduledTask ── tick every interval ──> CacheReconciler::run_tick
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheReconciler, ContentFilters};
//!
//! let reconciler = Arc::new(CacheReconciler::new(player, download, catalog, clock));
//! let task = reconciler.spawn(Arc::new(ContentFilters::default()), token.child_token())?;
//!
//! let mut snapshots = reconciler.subscribe();
//! snapshots.changed().await?;
//! println!("{} songs offline", snapshots.borrow().len());
//!
//! task.shutdown().await?;
//! ```

pub mod config;
pub mod filters;
pub mod reconciler;
pub mod scheduler;

// Re-export commonly used types
pub use config::ReconcilerConfig;
pub use filters::{
    filter_explicit, filter_video_songs, ContentFilters, FilterSource, SettingsFilterSource,
    HIDE_EXPLICIT_KEY, HIDE_VIDEO_SONGS_KEY,
};
pub use reconciler::{pure_cache_ids, CacheReconciler, CacheSnapshot, TickReport};
pub use scheduler::ScheduledTask;
