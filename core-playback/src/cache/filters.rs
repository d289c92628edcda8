//! Content filters applied to the offline snapshot
//!
//! The explicit and video predicates look at disjoint fields of a
//! [`SongRecord`], so applying them in either order yields the same list.

use async_trait::async_trait;
use bridge_traits::storage::SettingsStore;
use core_library::SongRecord;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Settings key for hiding explicit songs.
pub const HIDE_EXPLICIT_KEY: &str = "hide_explicit";

/// Settings key for hiding video tracks.
pub const HIDE_VIDEO_SONGS_KEY: &str = "hide_video_songs";

/// The two snapshot predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentFilters {
    pub hide_explicit: bool,
    pub hide_video: bool,
}

impl ContentFilters {
    pub fn new(hide_explicit: bool, hide_video: bool) -> Self {
        Self {
            hide_explicit,
            hide_video,
        }
    }

    /// Whether `song` survives both predicates.
    pub fn allows(&self, song: &SongRecord) -> bool {
        !(self.hide_explicit && song.explicit) && !(self.hide_video && song.is_video)
    }

    /// Apply both predicates, keeping the input order.
    pub fn apply(&self, songs: Vec<SongRecord>) -> Vec<SongRecord> {
        filter_video_songs(filter_explicit(songs, self.hide_explicit), self.hide_video)
    }
}

/// Drop explicit songs when `hide` is set.
pub fn filter_explicit(songs: Vec<SongRecord>, hide: bool) -> Vec<SongRecord> {
    if !hide {
        return songs;
    }
    songs.into_iter().filter(|song| !song.explicit).collect()
}

/// Drop video tracks when `hide` is set.
pub fn filter_video_songs(songs: Vec<SongRecord>, hide: bool) -> Vec<SongRecord> {
    if !hide {
        return songs;
    }
    songs.into_iter().filter(|song| !song.is_video).collect()
}

/// Supplies the filters for each tick.
#[async_trait]
pub trait FilterSource: Send + Sync {
    async fn filters(&self) -> ContentFilters;
}

#[async_trait]
impl FilterSource for ContentFilters {
    async fn filters(&self) -> ContentFilters {
        *self
    }
}

/// Reads the filters from the host settings store on every call.
///
/// Missing keys fall back to the configured defaults. When the store fails,
/// the last successfully read filters are used.
pub struct SettingsFilterSource {
    store: Arc<dyn SettingsStore>,
    defaults: ContentFilters,
    last_known: Mutex<ContentFilters>,
}

impl SettingsFilterSource {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_defaults(store, ContentFilters::default())
    }

    pub fn with_defaults(store: Arc<dyn SettingsStore>, defaults: ContentFilters) -> Self {
        Self {
            store,
            defaults,
            last_known: Mutex::new(defaults),
        }
    }

    async fn read(&self) -> bridge_traits::error::Result<ContentFilters> {
        let hide_explicit = self.store.get_bool(HIDE_EXPLICIT_KEY).await?;
        let hide_video = self.store.get_bool(HIDE_VIDEO_SONGS_KEY).await?;

        Ok(ContentFilters {
            hide_explicit: hide_explicit.unwrap_or(self.defaults.hide_explicit),
            hide_video: hide_video.unwrap_or(self.defaults.hide_video),
        })
    }
}

#[async_trait]
impl FilterSource for SettingsFilterSource {
    async fn filters(&self) -> ContentFilters {
        match self.read().await {
            Ok(filters) => {
                *self.last_known.lock() = filters;
                filters
            }
            Err(e) => {
                let fallback = *self.last_known.lock();
                warn!(error = %e, ?fallback, "Failed to read filter settings");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn catalog() -> Vec<SongRecord> {
        vec![
            SongRecord::new("plain", "Plain"),
            SongRecord::new("explicit", "Explicit").explicit(true),
            SongRecord::new("video", "Video").video(true),
            SongRecord::new("both", "Both").explicit(true).video(true),
        ]
    }

    fn ids(songs: &[SongRecord]) -> Vec<&str> {
        songs.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_filters_commute() {
        for hide_explicit in [false, true] {
            for hide_video in [false, true] {
                let explicit_first =
                    filter_video_songs(filter_explicit(catalog(), hide_explicit), hide_video);
                let video_first =
                    filter_explicit(filter_video_songs(catalog(), hide_video), hide_explicit);
                assert_eq!(explicit_first, video_first);
            }
        }
    }

    #[test]
    fn test_apply_both() {
        let filtered = ContentFilters::new(true, true).apply(catalog());
        assert_eq!(ids(&filtered), vec!["plain"]);

        let filtered = ContentFilters::new(true, false).apply(catalog());
        assert_eq!(ids(&filtered), vec!["plain", "video"]);

        let filtered = ContentFilters::default().apply(catalog());
        assert_eq!(filtered.len(), 4);
    }

    /// Settings store with fixed answers and a failure switch.
    struct FlakySettings {
        hide_explicit: Option<bool>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SettingsStore for FlakySettings {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BridgeError::NotAvailable("settings".into()));
            }
            Ok(match key {
                HIDE_EXPLICIT_KEY => self.hide_explicit,
                _ => None,
            })
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_settings_source_defaults_and_fallback() {
        let store = Arc::new(FlakySettings {
            hide_explicit: Some(true),
            failing: AtomicBool::new(false),
        });
        let source =
            SettingsFilterSource::with_defaults(store.clone(), ContentFilters::new(false, true));

        let read = source.filters().await;
        assert_eq!(read, ContentFilters::new(true, true));

        store.failing.store(true, Ordering::SeqCst);
        assert_eq!(source.filters().await, read);
    }

    #[tokio::test]
    async fn test_static_filters_are_a_source() {
        let filters = ContentFilters::new(false, true);
        assert_eq!(filters.filters().await, filters);
    }
}
