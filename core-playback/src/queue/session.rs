//! Playback session owning the active queue

use super::{PlaybackQueue, Queue, QueueItem, QueueKind, QueueStatus};
use crate::error::{PlaybackError, Result};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// The queue of one playback context and its current status.
///
/// The status is published as an `Arc<QueueStatus>` and swapped whole on
/// every change. Readers clone the `Arc` and keep a consistent view for as
/// long as they like.
pub struct PlaybackSession {
    queue: Mutex<PlaybackQueue>,
    kind: QueueKind,
    status: RwLock<Arc<QueueStatus>>,
    event_bus: Option<EventBus>,
}

impl PlaybackSession {
    /// Start a session from `queue`'s initial status.
    ///
    /// # Errors
    /// Fails when the initial status cannot be produced; no session exists
    /// afterwards.
    pub async fn start(queue: impl Into<PlaybackQueue>) -> Result<Self> {
        Self::open(queue.into(), None).await
    }

    /// Like [`start`](Self::start), emitting playback events on `event_bus`.
    pub async fn start_with_event_bus(
        queue: impl Into<PlaybackQueue>,
        event_bus: EventBus,
    ) -> Result<Self> {
        Self::open(queue.into(), Some(event_bus)).await
    }

    #[instrument(skip_all, fields(kind = ?queue.kind()))]
    async fn open(mut queue: PlaybackQueue, event_bus: Option<EventBus>) -> Result<Self> {
        let status = match queue.initial_status().await {
            Ok(status) => status,
            Err(e) => {
                if let (PlaybackError::SourceUnavailable(message), Some(bus)) = (&e, &event_bus) {
                    bus.emit(CoreEvent::Playback(PlaybackEvent::SourceUnavailable {
                        message: message.clone(),
                    }))
                    .ok();
                }
                return Err(e);
            }
        };

        info!(
            items = status.len(),
            start_index = status.start_index(),
            "Playback session started"
        );

        if let Some(bus) = &event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::QueueStarted {
                title: status.title().map(str::to_string),
                item_count: status.len(),
                start_index: status.start_index(),
            }))
            .ok();
        }

        Ok(Self {
            kind: queue.kind(),
            queue: Mutex::new(queue),
            status: RwLock::new(Arc::new(status)),
            event_bus,
        })
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Current status.
    pub fn status(&self) -> Arc<QueueStatus> {
        self.status.read().clone()
    }

    pub fn current_item(&self) -> Option<QueueItem> {
        self.status.read().current_item().cloned()
    }

    /// Make `index` the active item.
    ///
    /// # Errors
    /// `InvalidQueue` when `index` is out of range; the status is unchanged.
    pub fn advance_to(&self, index: usize, position: Duration) -> Result<Arc<QueueStatus>> {
        let next = {
            let mut guard = self.status.write();
            let next = Arc::new(guard.advance_to(index, position)?);
            *guard = next.clone();
            next
        };

        if let (Some(bus), Some(item)) = (&self.event_bus, next.current_item()) {
            bus.emit(CoreEvent::Playback(PlaybackEvent::ItemChanged {
                index,
                item_id: item.id.to_string(),
            }))
            .ok();
        }

        Ok(next)
    }

    /// Move within the active item.
    pub fn seek(&self, position: Duration) -> Arc<QueueStatus> {
        let mut guard = self.status.write();
        let next = Arc::new(guard.with_position(position));
        *guard = next.clone();
        next
    }

    pub async fn has_next_page(&self) -> bool {
        self.queue.lock().await.has_next_page()
    }

    pub async fn preload_item(&self) -> Option<QueueItem> {
        self.queue.lock().await.preload_item()
    }

    /// Fetch the next page and append it to the status.
    ///
    /// Returns the number of items added.
    ///
    /// # Errors
    /// `UnsupportedOperation` on a queue without further pages,
    /// `SourceUnavailable` when the upstream fetch fails. The status is left
    /// as it was in both cases.
    #[instrument(skip(self), fields(kind = ?self.kind))]
    pub async fn load_next_page(&self) -> Result<usize> {
        let items = {
            let mut queue = self.queue.lock().await;
            match queue.next_page().await {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, "Could not load next queue page");
                    if let (PlaybackError::SourceUnavailable(message), Some(bus)) =
                        (&e, &self.event_bus)
                    {
                        bus.emit(CoreEvent::Playback(PlaybackEvent::SourceUnavailable {
                            message: message.clone(),
                        }))
                        .ok();
                    }
                    return Err(e);
                }
            }
        };

        let added = items.len();
        let total = {
            let mut guard = self.status.write();
            let next = Arc::new(guard.appended(items));
            let total = next.len();
            *guard = next;
            total
        };

        debug!(added, total, "Queue page appended");
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(PlaybackEvent::PageAppended { added, total }))
                .ok();
        }

        Ok(added)
    }
}
