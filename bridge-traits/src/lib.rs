//! # Host Bridge Traits
//!
//! Contracts for the collaborators the offline core needs from its host.
//!
//! ## Traits
//!
//! - [`ByteRangeCache`](cache::ByteRangeCache) - Player and download byte-range caches
//! - [`RemoteCatalogClient`](remote::RemoteCatalogClient) - Best-effort remote playlist mirroring
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform-specific failures into it and keep
//! the message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod cache;
pub mod error;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use cache::{ByteRangeCache, CachedRange, ContentId};
pub use remote::RemoteCatalogClient;
pub use storage::SettingsStore;
pub use time::{Clock, FixedClock, SystemClock};
