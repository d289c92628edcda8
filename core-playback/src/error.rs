//! # Playback Error Types
//!
//! Errors raised by playback queues and the offline cache reconciler.

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during queue and cache operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// The upstream collaborator behind a paginated queue could not be reached.
    #[error("Queue source unavailable: {0}")]
    SourceUnavailable(String),

    /// The operation is not supported by this queue variant.
    ///
    /// Raised by `next_page` on queues that report no further pages. This is
    /// a caller bug and is never retried.
    #[error("Unsupported queue operation: {0}")]
    UnsupportedOperation(String),

    /// Queue construction or advance violated the status invariant.
    #[error("Invalid queue: {0}")]
    InvalidQueue(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Offline cache reconciliation failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Catalog read or write failed.
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    /// Host collaborator failure (byte-range cache, settings).
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Reconciler or scheduler settings were rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Whether the failure is expected to clear up on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::SourceUnavailable(_)
            | PlaybackError::Cache(_)
            | PlaybackError::Bridge(_) => true,
            PlaybackError::Library(err) => err.is_transient(),
            PlaybackError::UnsupportedOperation(_)
            | PlaybackError::InvalidQueue(_)
            | PlaybackError::InvalidConfig(_) => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PlaybackError::SourceUnavailable("offline".into()).is_transient());
        assert!(PlaybackError::Bridge(BridgeError::NotAvailable("cache".into())).is_transient());
        assert!(!PlaybackError::UnsupportedOperation("next_page".into()).is_transient());
        assert!(!PlaybackError::InvalidQueue("start index".into()).is_transient());
    }

    #[test]
    fn test_library_error_conversion() {
        let err: PlaybackError = LibraryError::Migration("boom".into()).into();
        assert!(matches!(err, PlaybackError::Library(_)));
        assert!(!err.is_transient());
    }
}
