//! # Playback Queue
//!
//! Uniform contract over an ordered, possibly unbounded, sequence of playable
//! items.
//!
//! ## Variants
//!
//! ```text
//! PlaybackQueue
//!   ├── Finite(ListQueue)           all items known up front, never pages
//!   └── Paginated(PaginatedQueue)   first page on start, more on demand
//!                 │
//!                 └──> PageSource (remote catalog, radio, search results)
//! ```
//!
//! A queue lives exactly as long as one [`PlaybackSession`]. Starting a new
//! playback context builds a new queue and a new session rather than editing
//! the old one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::queue::{ListQueue, PlaybackSession, QueueItem};
//!
//! let queue = ListQueue::new(Some("Offline".into()), items, 0, Duration::ZERO)?;
//! let session = PlaybackSession::start(queue).await?;
//! session.advance_to(1, Duration::ZERO)?;
//! ```

mod list;
mod paginated;
mod session;
mod status;

pub use list::ListQueue;
pub use paginated::{PageSource, PaginatedQueue, QueuePage};
pub use session::PlaybackSession;
pub use status::QueueStatus;

use crate::error::Result;
use async_trait::async_trait;
use core_library::{ContentId, SongRecord};
use serde::Serialize;
use std::time::Duration;

/// One playable entry in a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItem {
    pub id: ContentId,
    pub title: String,
    pub artists: Vec<String>,
    /// Known playback length; positions are clamped to it
    pub duration: Option<Duration>,
    pub thumbnail_url: Option<String>,
}

impl QueueItem {
    pub fn new(id: impl Into<ContentId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            duration: None,
            thumbnail_url: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artists.push(artist.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

impl From<&SongRecord> for QueueItem {
    fn from(song: &SongRecord) -> Self {
        Self {
            id: song.id.clone(),
            title: song.title.clone(),
            artists: song.artist.iter().cloned().collect(),
            duration: song
                .duration_ms
                .and_then(|ms| u64::try_from(ms).ok())
                .map(Duration::from_millis),
            thumbnail_url: song.thumbnail_url.clone(),
        }
    }
}

/// Queue contract shared by every variant.
#[async_trait]
pub trait Queue: Send + Sync {
    /// The status playback starts from.
    ///
    /// # Errors
    /// Paginated queues return `SourceUnavailable` when the first page cannot
    /// be fetched; the caller must not start a session in that case.
    async fn initial_status(&mut self) -> Result<QueueStatus>;

    /// Whether [`next_page`](Queue::next_page) can return more items.
    fn has_next_page(&self) -> bool;

    /// Fetch the items that follow everything returned so far.
    ///
    /// # Errors
    /// `UnsupportedOperation` when [`has_next_page`](Queue::has_next_page) is
    /// `false`.
    async fn next_page(&mut self) -> Result<Vec<QueueItem>>;

    /// Item the cache warmer should fetch ahead of playback.
    fn preload_item(&self) -> Option<QueueItem>;
}

/// Discriminant of [`PlaybackQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueKind {
    Finite,
    Paginated,
}

/// Every queue variant the player accepts.
pub enum PlaybackQueue {
    Finite(ListQueue),
    Paginated(PaginatedQueue),
}

impl PlaybackQueue {
    pub fn kind(&self) -> QueueKind {
        match self {
            PlaybackQueue::Finite(_) => QueueKind::Finite,
            PlaybackQueue::Paginated(_) => QueueKind::Paginated,
        }
    }
}

impl From<ListQueue> for PlaybackQueue {
    fn from(queue: ListQueue) -> Self {
        PlaybackQueue::Finite(queue)
    }
}

impl From<PaginatedQueue> for PlaybackQueue {
    fn from(queue: PaginatedQueue) -> Self {
        PlaybackQueue::Paginated(queue)
    }
}

#[async_trait]
impl Queue for PlaybackQueue {
    async fn initial_status(&mut self) -> Result<QueueStatus> {
        match self {
            PlaybackQueue::Finite(queue) => queue.initial_status().await,
            PlaybackQueue::Paginated(queue) => queue.initial_status().await,
        }
    }

    fn has_next_page(&self) -> bool {
        match self {
            PlaybackQueue::Finite(queue) => queue.has_next_page(),
            PlaybackQueue::Paginated(queue) => queue.has_next_page(),
        }
    }

    async fn next_page(&mut self) -> Result<Vec<QueueItem>> {
        match self {
            PlaybackQueue::Finite(queue) => queue.next_page().await,
            PlaybackQueue::Paginated(queue) => queue.next_page().await,
        }
    }

    fn preload_item(&self) -> Option<QueueItem> {
        match self {
            PlaybackQueue::Finite(queue) => queue.preload_item(),
            PlaybackQueue::Paginated(queue) => queue.preload_item(),
        }
    }
}
