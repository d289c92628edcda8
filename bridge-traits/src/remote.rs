//! Remote Catalog Contract
//!
//! The streaming service keeps its own copy of user playlists. Local edits are
//! mirrored to it on a best-effort basis after they commit locally.

use async_trait::async_trait;

use crate::cache::ContentId;
use crate::error::Result;

/// Client for the remote playlist catalog.
///
/// Implementations perform a single network call per invocation; the core
/// never retries and never rolls back local state on failure.
#[async_trait]
pub trait RemoteCatalogClient: Send + Sync {
    /// Append `content_id` to the remote playlist identified by `remote_playlist_id`.
    async fn mirror_add(&self, remote_playlist_id: &str, content_id: &ContentId) -> Result<()>;
}
