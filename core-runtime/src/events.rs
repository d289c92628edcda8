//! # Event Bus System
//!
//! Typed broadcast events for the offline core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: one enum per domain wrapped by [`CoreEvent`]
//! - **EventBus**: cloneable handle around the broadcast sender
//! - **EventStream**: receiver wrapper with an optional predicate
//!
//! Emitting never blocks. A subscriber that falls behind by more than the
//! channel capacity receives `RecvError::Lagged(n)` and keeps going; all
//! senders dropped yields `RecvError::Closed`.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut sub = bus.subscribe();
//!
//! bus.emit(CoreEvent::Cache(CacheEvent::SnapshotPublished { song_count: 3 }))
//!     .ok();
//!
//! let event = sub.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Cache(_)));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Offline cache reconciliation events
    Cache(CacheEvent),
    /// Catalog and playlist events
    Library(LibraryEvent),
    /// Playback queue events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Cache(CacheEvent::ReconcileFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Library(LibraryEvent::MirrorFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::SourceUnavailable { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::SongsDownloaded { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::PlaylistMembersAdded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events raised by the cache reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// Songs became fully resident and received their download stamp.
    SongsDownloaded {
        /// Content ids stamped in this tick.
        song_ids: Vec<String>,
        /// Stamp applied, Unix epoch milliseconds.
        downloaded_at: i64,
    },
    /// A new offline snapshot replaced the previous one.
    SnapshotPublished {
        /// Number of songs in the filtered snapshot.
        song_count: usize,
    },
    /// A tick aborted; the previous snapshot stays in place.
    ReconcileFailed {
        /// Human-readable error message.
        message: String,
    },
    /// A song was removed from the player cache on request.
    Evicted {
        /// Evicted content id.
        song_id: String,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::SongsDownloaded { .. } => "Songs became available offline",
            CacheEvent::SnapshotPublished { .. } => "Offline snapshot updated",
            CacheEvent::ReconcileFailed { .. } => "Cache reconciliation failed",
            CacheEvent::Evicted { .. } => "Song evicted from player cache",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to catalog and playlist changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Songs were appended to a playlist in one committed transaction.
    PlaylistMembersAdded {
        playlist_id: String,
        /// Number of memberships written.
        count: usize,
    },
    /// A remote mirror call failed after the local commit.
    MirrorFailed {
        playlist_id: String,
        song_id: String,
        message: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PlaylistMembersAdded { .. } => "Songs added to playlist",
            LibraryEvent::MirrorFailed { .. } => "Remote playlist mirror failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the active playback queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new queue replaced the previous one.
    QueueStarted {
        title: Option<String>,
        item_count: usize,
        start_index: usize,
    },
    /// The active item changed.
    ItemChanged { index: usize, item_id: String },
    /// A further page was appended to a paginated queue.
    PageAppended { added: usize, total: usize },
    /// The queue's upstream source could not be reached.
    SourceUnavailable { message: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::QueueStarted { .. } => "Playback queue started",
            PlaybackEvent::ItemChanged { .. } => "Active queue item changed",
            PlaybackEvent::PageAppended { .. } => "Queue page appended",
            PlaybackEvent::SourceUnavailable { .. } => "Queue source unavailable",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` that skips events failing a predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
