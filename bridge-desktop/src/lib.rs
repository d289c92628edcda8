//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ByteRangeCache` using an in-process range index ([`MemoryByteRangeCache`])
//! - `SettingsStore` using a SQLite-backed key-value store ([`SqliteSettingsStore`])
//!
//! The remote catalog client is not shipped here; hosts inject their own
//! network-backed implementation.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemoryByteRangeCache, SqliteSettingsStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let player_cache = Arc::new(MemoryByteRangeCache::new());
//!     let download_cache = Arc::new(MemoryByteRangeCache::new());
//!     let settings = SqliteSettingsStore::in_memory().await.unwrap();
//!
//!     // Hand to core_service::CoreDependencies
//! }
//! ```

mod range_cache;
mod settings;

pub use range_cache::MemoryByteRangeCache;
pub use settings::SqliteSettingsStore;
