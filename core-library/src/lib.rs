//! # Library Management Module
//!
//! Owns the song catalog database and the repository contracts the rest of the
//! core uses to read and mutate it.
//!
//! ## Overview
//!
//! - SQLite pool configuration and embedded migrations ([`db`])
//! - Catalog records, playlists and identifiers ([`models`])
//! - [`CatalogStore`](repositories::CatalogStore): batch lookups and
//!   single-transaction writes used by the cache reconciler and the playlist
//!   insertion coordinator
//! - Song and playlist repositories for ingesting and browsing the catalog

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{ContentId, Playlist, PlaylistId, PlaylistMember, SongRecord};
pub use repositories::{
    CatalogStore, CatalogWrite, PlaylistRepository, SongRepository, SqliteCatalogStore,
    SqlitePlaylistRepository, SqliteSongRepository, WriteSummary,
};
