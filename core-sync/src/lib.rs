//! # Playlist Sync Module
//!
//! Keeps local playlists and their remote catalog counterparts in step when
//! songs are added.
//!
//! ## Components
//!
//! - **Candidate Batches** (`candidates`): caller-supplied or lazily
//!   materialized song ids, resolved once per batch
//! - **Duplicate Detection** (`duplicates`): candidate/membership
//!   intersection and the three resolution policies
//! - **Insertion Coordinator** (`coordinator`): one-transaction local insert,
//!   suspension on duplicates, best-effort remote mirroring

pub mod candidates;
pub mod coordinator;
pub mod duplicates;
pub mod error;

pub use candidates::{CandidateBatch, SongMaterializer};
pub use coordinator::{
    AttemptHandle, InsertionConfig, InsertionReport, PendingInsertion,
    PlaylistInsertionCoordinator,
};
pub use duplicates::{DuplicatePolicy, DuplicateSet};
pub use error::{Result, SyncError};
