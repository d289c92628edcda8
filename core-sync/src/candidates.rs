//! Candidate batches for playlist insertion
//!
//! A batch is either a list of ids the caller already has, or a
//! [`SongMaterializer`] that produces them on first use (typically by writing
//! search results into the catalog). Either way the ids are resolved once and
//! reused for every attempt made with the same batch.

use crate::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use core_library::{ContentId, Playlist};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Produces the song ids to insert, writing the songs to the catalog first
/// when they are not there yet.
#[async_trait]
pub trait SongMaterializer: Send + Sync {
    async fn materialize(
        &self,
        target: &Playlist,
    ) -> std::result::Result<Vec<ContentId>, BridgeError>;
}

enum Source {
    Ids,
    Lazy(Arc<dyn SongMaterializer>),
}

/// Ids offered for insertion, in caller order. Repeats are kept.
pub struct CandidateBatch {
    source: Source,
    ids: OnceCell<Vec<ContentId>>,
}

impl CandidateBatch {
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentId>,
    {
        Self {
            source: Source::Ids,
            ids: OnceCell::from(ids.into_iter().map(Into::into).collect::<Vec<_>>()),
        }
    }

    /// Batch resolved by `materializer` the first time it is needed.
    pub fn lazy(materializer: Arc<dyn SongMaterializer>) -> Self {
        Self {
            source: Source::Lazy(materializer),
            ids: OnceCell::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.ids.initialized()
    }

    /// The candidate ids, running the materializer if this is the first call.
    ///
    /// Concurrent callers wait for the same materialization. A failed
    /// materialization is not cached.
    pub async fn resolve(&self, target: &Playlist) -> Result<&[ContentId]> {
        let ids = self.ids.get_or_try_init(|| self.materialize(target)).await?;
        Ok(ids.as_slice())
    }

    async fn materialize(&self, target: &Playlist) -> Result<Vec<ContentId>> {
        let Source::Lazy(materializer) = &self.source else {
            return Ok(Vec::new());
        };

        let ids = materializer
            .materialize(target)
            .await
            .map_err(|e| SyncError::Materializer(e.to_string()))?;
        debug!(count = ids.len(), "Materialized insertion candidates");
        Ok(ids)
    }
}
