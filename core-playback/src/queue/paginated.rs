//! Remote-backed queue fetched one page at a time

use super::{Queue, QueueItem, QueueStatus};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// One page returned by a [`PageSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueuePage {
    pub title: Option<String>,
    pub items: Vec<QueueItem>,
    /// Token for the following page; `None` on the last page
    pub continuation: Option<String>,
    pub preload: Option<QueueItem>,
}

/// Upstream that produces queue pages (radio, album, search continuation).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the first page when `continuation` is `None`, otherwise the page
    /// the token points at.
    async fn fetch_page(
        &self,
        continuation: Option<String>,
    ) -> std::result::Result<QueuePage, BridgeError>;
}

/// Queue over a [`PageSource`].
///
/// Only the first page is fetched when playback starts. A failed fetch leaves
/// the continuation untouched so the same page can be requested again.
pub struct PaginatedQueue {
    source: Arc<dyn PageSource>,
    start_index: usize,
    position: Duration,
    continuation: Option<String>,
    preload: Option<QueueItem>,
}

impl PaginatedQueue {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            start_index: 0,
            position: Duration::ZERO,
            continuation: None,
            preload: None,
        }
    }

    /// Start playback at `index` of the first page.
    pub fn starting_at(mut self, index: usize, position: Duration) -> Self {
        self.start_index = index;
        self.position = position;
        self
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }
}

#[async_trait]
impl Queue for PaginatedQueue {
    #[instrument(skip(self))]
    async fn initial_status(&mut self) -> Result<QueueStatus> {
        let page = self.source.fetch_page(None).await.map_err(|e| {
            warn!(error = %e, "First queue page unavailable");
            PlaybackError::SourceUnavailable(e.to_string())
        })?;

        let status = QueueStatus::new(page.title, page.items, self.start_index, self.position)?;
        self.continuation = page.continuation;
        self.preload = page.preload;

        debug!(
            items = status.len(),
            has_more = self.continuation.is_some(),
            "Fetched first queue page"
        );
        Ok(status)
    }

    fn has_next_page(&self) -> bool {
        self.continuation.is_some()
    }

    #[instrument(skip(self))]
    async fn next_page(&mut self) -> Result<Vec<QueueItem>> {
        let Some(token) = self.continuation.clone() else {
            return Err(PlaybackError::UnsupportedOperation(
                "paginated queue has reached its last page".to_string(),
            ));
        };

        let page = self.source.fetch_page(Some(token)).await.map_err(|e| {
            warn!(error = %e, "Next queue page unavailable");
            PlaybackError::SourceUnavailable(e.to_string())
        })?;

        self.continuation = page.continuation;
        if page.preload.is_some() {
            self.preload = page.preload;
        }

        debug!(items = page.items.len(), "Fetched queue page");
        Ok(page.items)
    }

    fn preload_item(&self) -> Option<QueueItem> {
        self.preload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Serves canned pages keyed by continuation token.
    struct CannedPages {
        pages: Vec<(Option<&'static str>, QueuePage)>,
        calls: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl PageSource for CannedPages {
        async fn fetch_page(
            &self,
            continuation: Option<String>,
        ) -> std::result::Result<QueuePage, BridgeError> {
            self.calls.lock().push(continuation.clone());
            self.pages
                .iter()
                .find(|(token, _)| *token == continuation.as_deref())
                .map(|(_, page)| page.clone())
                .ok_or_else(|| BridgeError::Remote("no such page".into()))
        }
    }

    fn two_pages() -> Arc<CannedPages> {
        Arc::new(CannedPages {
            pages: vec![
                (
                    None,
                    QueuePage {
                        title: Some("Radio".into()),
                        items: vec![QueueItem::new("a", "A"), QueueItem::new("b", "B")],
                        continuation: Some("p2".into()),
                        preload: Some(QueueItem::new("b", "B")),
                    },
                ),
                (
                    Some("p2"),
                    QueuePage {
                        title: None,
                        items: vec![QueueItem::new("c", "C")],
                        continuation: None,
                        preload: None,
                    },
                ),
            ],
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_pages_until_exhausted() {
        let source = two_pages();
        let mut queue = PaginatedQueue::new(source.clone()).starting_at(1, Duration::ZERO);

        let status = queue.initial_status().await.unwrap();
        assert_eq!(status.title(), Some("Radio"));
        assert_eq!(status.start_index(), 1);
        assert!(queue.has_next_page());
        assert_eq!(queue.preload_item().unwrap().id.as_str(), "b");

        let more = queue.next_page().await.unwrap();
        assert_eq!(more.len(), 1);
        assert!(!queue.has_next_page());
        assert_eq!(queue.preload_item().unwrap().id.as_str(), "b");

        let exhausted = queue.next_page().await;
        assert!(matches!(exhausted, Err(PlaybackError::UnsupportedOperation(_))));

        assert_eq!(
            *source.calls.lock(),
            vec![None, Some("p2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_start_index_beyond_first_page() {
        let mut queue = PaginatedQueue::new(two_pages()).starting_at(2, Duration::ZERO);
        let result = queue.initial_status().await;
        assert!(matches!(result, Err(PlaybackError::InvalidQueue(_))));
        assert!(!queue.has_next_page());
    }
}
