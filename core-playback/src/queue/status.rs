//! Immutable queue status

use super::QueueItem;
use crate::error::{PlaybackError, Result};
use serde::Serialize;
use std::time::Duration;

/// Snapshot of a queue: its items, the active index and the offset into the
/// active item.
///
/// A status is never edited in place. Advancing, seeking and appending all
/// return a new value, so a reader holding an `Arc<QueueStatus>` never sees a
/// half-applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    title: Option<String>,
    items: Vec<QueueItem>,
    start_index: usize,
    position: Duration,
}

impl QueueStatus {
    /// Build a status, rejecting an out-of-range `start_index`.
    ///
    /// An empty item list only accepts index `0`. `position` is clamped to the
    /// active item's duration when that duration is known.
    pub fn new(
        title: Option<String>,
        items: Vec<QueueItem>,
        start_index: usize,
        position: Duration,
    ) -> Result<Self> {
        let in_range = if items.is_empty() {
            start_index == 0
        } else {
            start_index < items.len()
        };
        if !in_range {
            return Err(PlaybackError::InvalidQueue(format!(
                "start index {} out of range for {} items",
                start_index,
                items.len()
            )));
        }

        let position = clamp_position(items.get(start_index), position);
        Ok(Self {
            title,
            items,
            start_index,
            position,
        })
    }

    /// A status with no items.
    pub fn empty(title: Option<String>) -> Self {
        Self {
            title,
            items: Vec::new(),
            start_index: 0,
            position: Duration::ZERO,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `start_index`, if any.
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.items.get(self.start_index)
    }

    /// Status with `index` active and playback at `position`.
    pub fn advance_to(&self, index: usize, position: Duration) -> Result<Self> {
        Self::new(self.title.clone(), self.items.clone(), index, position)
    }

    /// Status with the same active item and a new offset.
    pub fn with_position(&self, position: Duration) -> Self {
        Self {
            title: self.title.clone(),
            items: self.items.clone(),
            start_index: self.start_index,
            position: clamp_position(self.current_item(), position),
        }
    }

    /// Status with `more` appended after the existing items.
    pub fn appended(&self, more: Vec<QueueItem>) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + more.len());
        items.extend(self.items.iter().cloned());
        items.extend(more);

        Self {
            title: self.title.clone(),
            items,
            start_index: self.start_index,
            position: self.position,
        }
    }
}

fn clamp_position(item: Option<&QueueItem>, position: Duration) -> Duration {
    match item.and_then(|item| item.duration) {
        Some(duration) => position.min(duration),
        None => position,
    }
}
