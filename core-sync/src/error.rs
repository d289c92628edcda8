use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Playlist {playlist_id} not found")]
    PlaylistNotFound { playlist_id: String },

    #[error("Membership query failed: {0}")]
    MembershipQuery(#[source] LibraryError),

    #[error("Playlist insert failed, nothing was written: {0}")]
    InsertFailed(#[source] LibraryError),

    #[error("Song materializer failed: {0}")]
    Materializer(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Insertion task failed: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the attempt may succeed if started again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::MembershipQuery(e) | SyncError::InsertFailed(e) | SyncError::Library(e) => {
                e.is_transient()
            }
            SyncError::Materializer(_) | SyncError::Internal(_) => true,
            SyncError::PlaylistNotFound { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
