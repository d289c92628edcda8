//! # Repository Pattern Implementation
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `CatalogStore` - Batch lookups and transactional writes used by the engine
//! - `SongRepository` - Song metadata ingestion and the downloaded listing
//! - `PlaylistRepository` - Playlists and their ordered membership

pub mod catalog;
pub mod playlist;
pub mod song;

pub use catalog::{CatalogStore, CatalogWrite, SqliteCatalogStore, WriteSummary};
pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
pub use song::{SongRepository, SqliteSongRepository};
