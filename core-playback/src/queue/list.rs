//! List-backed queue

use super::{Queue, QueueItem, QueueStatus};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Queue whose items are all known when it is built.
#[derive(Debug, Clone)]
pub struct ListQueue {
    status: QueueStatus,
    preload: Option<QueueItem>,
}

impl ListQueue {
    /// # Errors
    /// `InvalidQueue` when `start_index` does not address an item.
    pub fn new(
        title: Option<String>,
        items: Vec<QueueItem>,
        start_index: usize,
        position: Duration,
    ) -> Result<Self> {
        Ok(Self {
            status: QueueStatus::new(title, items, start_index, position)?,
            preload: None,
        })
    }

    /// Untitled queue starting at the first item.
    pub fn from_items(items: Vec<QueueItem>) -> Self {
        Self {
            status: QueueStatus::new(None, items, 0, Duration::ZERO)
                .unwrap_or_else(|_| QueueStatus::empty(None)),
            preload: None,
        }
    }

    pub fn with_preload(mut self, item: QueueItem) -> Self {
        self.preload = Some(item);
        self
    }
}

#[async_trait]
impl Queue for ListQueue {
    async fn initial_status(&mut self) -> Result<QueueStatus> {
        Ok(self.status.clone())
    }

    fn has_next_page(&self) -> bool {
        false
    }

    async fn next_page(&mut self) -> Result<Vec<QueueItem>> {
        Err(PlaybackError::UnsupportedOperation(
            "list-backed queue has no further pages".to_string(),
        ))
    }

    fn preload_item(&self) -> Option<QueueItem> {
        self.preload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn songs() -> Vec<QueueItem> {
        vec![QueueItem::new("a", "A"), QueueItem::new("b", "B")]
    }

    #[tokio::test]
    async fn test_initial_status_is_total() {
        let mut queue = ListQueue::new(Some("Album".into()), songs(), 1, Duration::ZERO).unwrap();
        let status = queue.initial_status().await.unwrap();

        assert_eq!(status.title(), Some("Album"));
        assert_eq!(status.len(), 2);
        assert_eq!(status.start_index(), 1);
    }

    #[tokio::test]
    async fn test_next_page_is_unsupported() {
        let mut queue = ListQueue::from_items(songs());
        assert!(!queue.has_next_page());

        for _ in 0..2 {
            let result = queue.next_page().await;
            assert!(matches!(result, Err(PlaybackError::UnsupportedOperation(_))));
        }
    }

    #[test]
    fn test_invalid_start_index() {
        let result = ListQueue::new(None, songs(), 5, Duration::ZERO);
        assert!(matches!(result, Err(PlaybackError::InvalidQueue(_))));
    }

    #[test]
    fn test_preload_defaults_to_none() {
        let queue = ListQueue::from_items(songs());
        assert!(queue.preload_item().is_none());

        let queue = queue.with_preload(QueueItem::new("b", "B"));
        assert_eq!(queue.preload_item().unwrap().id.as_str(), "b");
    }
}
