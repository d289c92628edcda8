//! Cache reconciler
//!
//! Diffs the player and download byte-range caches against the catalog,
//! stamps `downloaded_at` once per song and publishes the offline snapshot.

use super::config::ReconcilerConfig;
use super::filters::{ContentFilters, FilterSource};
use super::scheduler::ScheduledTask;
use crate::error::{PlaybackError, Result};
use bridge_traits::cache::ByteRangeCache;
use bridge_traits::time::Clock;
use core_library::{CatalogStore, CatalogWrite, ContentId, SongRecord};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Songs available for offline playback, newest download first.
///
/// A pure projection of the caches and the catalog; it is rebuilt every tick
/// and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub songs: Vec<SongRecord>,
    /// When the snapshot was computed, Unix epoch milliseconds
    pub generated_at: i64,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn ids(&self) -> Vec<ContentId> {
        self.songs.iter().map(|song| song.id.clone()).collect()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.songs.iter().any(|song| &song.id == id)
    }
}

/// Counters describing one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub player_keys: usize,
    pub download_keys: usize,
    /// Ids only present in the player cache
    pub candidates: usize,
    /// Candidates fully resident in the player cache
    pub complete: usize,
    /// Records that received a download stamp this tick
    pub stamped: usize,
    /// Whether subscribers were notified of a new snapshot
    pub published: bool,
}

/// Keeps the offline snapshot in step with the caches.
///
/// ```text
/// player cache keys ─┐
///                    ├─> player − download ─> catalog lookup ─> full-range check
/// download cache keys┘                                              │
///                                     stamp downloaded_at (1 tx) <──┤
///                                     sort + filter ─> watch channel
/// ```
pub struct CacheReconciler {
    player_cache: Arc<dyn ByteRangeCache>,
    download_cache: Arc<dyn ByteRangeCache>,
    catalog: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    snapshot_tx: watch::Sender<Arc<CacheSnapshot>>,
    event_bus: Option<EventBus>,
    /// Held for a whole tick so scheduled and manual passes never interleave
    tick_guard: Mutex<()>,
}

impl CacheReconciler {
    pub fn new(
        player_cache: Arc<dyn ByteRangeCache>,
        download_cache: Arc<dyn ByteRangeCache>,
        catalog: Arc<dyn CatalogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(CacheSnapshot::default()));
        Self {
            player_cache,
            download_cache,
            catalog,
            clock,
            config: ReconcilerConfig::default(),
            snapshot_tx,
            event_bus: None,
            tick_guard: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Receiver notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Run one reconciliation pass.
    ///
    /// Passes are serialized; a call made while another pass is running
    /// waits for it to finish.
    ///
    /// # Errors
    /// Any cache or catalog failure aborts the pass before the snapshot is
    /// touched. Nothing is written unless some complete record still lacks a
    /// download stamp.
    #[instrument(skip(self), fields(hide_explicit = filters.hide_explicit, hide_video = filters.hide_video))]
    pub async fn reconcile_tick(&self, filters: &ContentFilters) -> Result<TickReport> {
        let _guard = self.tick_guard.lock().await;

        let player_ids = self.player_cache.keys().await?;
        let download_ids = self.download_cache.keys().await?;

        let mut candidates: Vec<ContentId> = pure_cache_ids(&player_ids, &download_ids);
        candidates.sort();

        let records = if candidates.is_empty() {
            Vec::new()
        } else {
            self.catalog.find_by_ids(&candidates).await?
        };

        // Residency is re-checked every tick; a shrunk cache drops the song.
        let checks = records.into_iter().map(|record| async move {
            let resident = match record.known_length() {
                Some(length) => {
                    self.player_cache
                        .is_fully_cached(&record.id, 0, length)
                        .await?
                }
                None => false,
            };
            Ok::<_, PlaybackError>(resident.then_some(record))
        });
        let mut complete: Vec<SongRecord> =
            try_join_all(checks).await?.into_iter().flatten().collect();

        let now = self.clock.unix_timestamp_millis();
        let unstamped: Vec<ContentId> = complete
            .iter()
            .filter(|record| record.downloaded_at.is_none())
            .map(|record| record.id.clone())
            .collect();

        let mut stamped = 0;
        if !unstamped.is_empty() {
            let writes = unstamped
                .iter()
                .map(|id| CatalogWrite::StampDownloaded {
                    song_id: id.clone(),
                    at: now,
                })
                .collect();
            stamped = self.catalog.run_transaction(writes).await?.stamped;

            // Rows another writer stamped first keep their stored value.
            let stored: HashMap<ContentId, Option<i64>> = if stamped < unstamped.len() {
                self.catalog
                    .find_by_ids(&unstamped)
                    .await?
                    .into_iter()
                    .map(|record| (record.id, record.downloaded_at))
                    .collect()
            } else {
                unstamped.iter().map(|id| (id.clone(), Some(now))).collect()
            };

            let mut newly_stamped = Vec::with_capacity(stamped);
            for record in complete.iter_mut() {
                if record.downloaded_at.is_none() {
                    record.downloaded_at = stored.get(&record.id).copied().flatten();
                    if record.downloaded_at == Some(now) {
                        newly_stamped.push(record.id.to_string());
                    }
                }
            }

            if stamped > 0 {
                info!(stamped, "Songs confirmed available offline");
                self.emit(CacheEvent::SongsDownloaded {
                    song_ids: newly_stamped,
                    downloaded_at: now,
                });
            }
        }

        let complete_count = complete.len();
        let mut songs: Vec<SongRecord> = complete
            .into_iter()
            .filter(|record| record.downloaded_at.is_some())
            .collect();
        songs.sort_by(|a, b| {
            b.downloaded_at
                .cmp(&a.downloaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let snapshot = CacheSnapshot {
            songs: filters.apply(songs),
            generated_at: now,
        };
        let published = self.publish(snapshot);

        let report = TickReport {
            player_keys: player_ids.len(),
            download_keys: download_ids.len(),
            candidates: candidates.len(),
            complete: complete_count,
            stamped,
            published,
        };
        debug!(?report, "Reconcile tick finished");
        Ok(report)
    }

    /// Run one pass with filters from `source`, logging instead of failing.
    ///
    /// The previous snapshot stays published when the pass fails.
    pub async fn run_tick(&self, source: &dyn FilterSource) -> Option<TickReport> {
        let filters = source.filters().await;
        match self.reconcile_tick(&filters).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Reconcile tick failed");
                self.emit(CacheEvent::ReconcileFailed {
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Drop `id` from the player cache.
    ///
    /// The download cache and any existing `downloaded_at` stamp are left
    /// alone. The snapshot catches up on the next tick.
    #[instrument(skip(self), fields(song_id = %id))]
    pub async fn evict(&self, id: &ContentId) -> Result<()> {
        self.player_cache.evict(id).await?;
        debug!("Evicted from player cache");
        self.emit(CacheEvent::Evicted {
            song_id: id.to_string(),
        });
        Ok(())
    }

    /// Start ticking on the configured interval until `token` is cancelled.
    ///
    /// # Errors
    /// `InvalidConfig` when the configured interval is rejected.
    pub fn spawn(
        self: &Arc<Self>,
        filters: Arc<dyn FilterSource>,
        token: CancellationToken,
    ) -> Result<ScheduledTask> {
        self.config
            .validate()
            .map_err(PlaybackError::InvalidConfig)?;

        let reconciler = Arc::clone(self);
        info!(interval = ?self.config.interval, "Starting cache reconciler");
        ScheduledTask::spawn_with_token("cache-reconciler", self.config.interval, token, move || {
            let reconciler = Arc::clone(&reconciler);
            let filters = Arc::clone(&filters);
            async move {
                reconciler.run_tick(filters.as_ref()).await;
            }
        })
    }

    fn publish(&self, snapshot: CacheSnapshot) -> bool {
        let publish_unchanged = self.config.publish_unchanged;
        let song_count = snapshot.len();
        let published = self.snapshot_tx.send_if_modified(|current| {
            if !publish_unchanged && current.songs == snapshot.songs {
                return false;
            }
            *current = Arc::new(snapshot);
            true
        });

        if published {
            self.emit(CacheEvent::SnapshotPublished { song_count });
        }
        published
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

/// Ids resident only in the player cache.
pub fn pure_cache_ids(
    player_ids: &HashSet<ContentId>,
    download_ids: &HashSet<ContentId>,
) -> Vec<ContentId> {
    player_ids.difference(download_ids).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::MemoryByteRangeCache;
    use bridge_traits::error::BridgeError;
    use bridge_traits::time::FixedClock;
    use core_library::{LibraryError, PlaylistId, WriteSummary};
    use mockall::{mock, Sequence};

    mock! {
        Catalog {}

        #[async_trait]
        impl CatalogStore for Catalog {
            async fn find_by_ids(&self, ids: &[ContentId]) -> core_library::Result<Vec<SongRecord>>;
            async fn run_transaction(&self, writes: Vec<CatalogWrite>) -> core_library::Result<WriteSummary>;
            async fn existing_membership(
                &self,
                playlist_id: &PlaylistId,
                ids: &[ContentId],
            ) -> core_library::Result<HashSet<ContentId>>;
        }
    }

    fn id(s: &str) -> ContentId {
        ContentId::from(s)
    }

    fn reconciler(
        player: Arc<MemoryByteRangeCache>,
        download: Arc<MemoryByteRangeCache>,
        catalog: MockCatalog,
    ) -> CacheReconciler {
        CacheReconciler::new(
            player,
            download,
            Arc::new(catalog),
            Arc::new(FixedClock::from_millis(1_000)),
        )
    }

    #[test]
    fn test_pure_cache_ids_excludes_downloaded() {
        let player: HashSet<_> = [id("a"), id("b"), id("c")].into_iter().collect();
        let download: HashSet<_> = [id("b"), id("z")].into_iter().collect();

        let mut pure = pure_cache_ids(&player, &download);
        pure.sort();
        assert_eq!(pure, vec![id("a"), id("c")]);
    }

    #[tokio::test]
    async fn test_no_lookup_when_nothing_is_pure_cache() {
        let player = Arc::new(MemoryByteRangeCache::new());
        let download = Arc::new(MemoryByteRangeCache::new());
        player.record_range("a", 0, 10);
        download.record_range("a", 0, 10);

        let mut catalog = MockCatalog::new();
        catalog.expect_find_by_ids().times(0);
        catalog.expect_run_transaction().times(0);

        let report = reconciler(player, download, catalog)
            .reconcile_tick(&ContentFilters::default())
            .await
            .unwrap();
        assert_eq!(report.candidates, 0);
        assert_eq!(report.stamped, 0);
    }

    #[tokio::test]
    async fn test_already_stamped_record_is_not_rewritten() {
        let player = Arc::new(MemoryByteRangeCache::new());
        player.record_range("a", 0, 100);

        let mut stamped = SongRecord::new("a", "A").with_content_length(100);
        stamped.downloaded_at = Some(500);

        let mut catalog = MockCatalog::new();
        catalog
            .expect_find_by_ids()
            .withf(|ids| ids.len() == 1 && ids[0] == id("a"))
            .times(1)
            .returning(move |_| Ok(vec![stamped.clone()]));
        catalog.expect_run_transaction().times(0);

        let reconciler = reconciler(player, Arc::new(MemoryByteRangeCache::new()), catalog);
        let report = reconciler
            .reconcile_tick(&ContentFilters::default())
            .await
            .unwrap();

        assert_eq!(report.complete, 1);
        assert_eq!(report.stamped, 0);
        assert_eq!(reconciler.snapshot().ids(), vec![id("a")]);
        assert_eq!(reconciler.snapshot().songs[0].downloaded_at, Some(500));
    }

    #[tokio::test]
    async fn test_lost_stamp_race_reads_stored_value() {
        let player = Arc::new(MemoryByteRangeCache::new());
        player.record_range("a", 0, 100);

        let mut seq = Sequence::new();
        let mut catalog = MockCatalog::new();
        catalog
            .expect_find_by_ids()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![SongRecord::new("a", "A").with_content_length(100)]));
        catalog
            .expect_run_transaction()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(WriteSummary::default()));
        catalog
            .expect_find_by_ids()
            .withf(|ids| ids.len() == 1 && ids[0] == id("a"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut stored = SongRecord::new("a", "A").with_content_length(100);
                stored.downloaded_at = Some(500);
                Ok(vec![stored])
            });

        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let reconciler = reconciler(player, Arc::new(MemoryByteRangeCache::new()), catalog)
            .with_event_bus(bus);
        let report = reconciler
            .reconcile_tick(&ContentFilters::default())
            .await
            .unwrap();

        assert_eq!(report.stamped, 0);
        assert_eq!(reconciler.snapshot().songs[0].downloaded_at, Some(500));
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(
                event,
                CoreEvent::Cache(CacheEvent::SongsDownloaded { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_keeps_previous_snapshot() {
        let player = Arc::new(MemoryByteRangeCache::new());
        player.record_range("a", 0, 100);

        let mut catalog = MockCatalog::new();
        catalog
            .expect_find_by_ids()
            .returning(|_| Ok(vec![SongRecord::new("a", "A").with_content_length(100)]));
        catalog
            .expect_run_transaction()
            .times(2)
            .returning(|_| Err(LibraryError::Bridge(BridgeError::DatabaseError("locked".into()))));

        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let reconciler = reconciler(player, Arc::new(MemoryByteRangeCache::new()), catalog)
            .with_event_bus(bus);
        let mut rx = reconciler.subscribe();

        let result = reconciler.reconcile_tick(&ContentFilters::default()).await;
        assert!(matches!(result, Err(PlaybackError::Library(_))));
        assert!(reconciler.run_tick(&ContentFilters::default()).await.is_none());

        assert!(reconciler.snapshot().is_empty());
        assert!(!rx.has_changed().unwrap());
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Cache(CacheEvent::ReconcileFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_length_is_never_complete() {
        let player = Arc::new(MemoryByteRangeCache::new());
        player.record_range("a", 0, 100);

        let mut catalog = MockCatalog::new();
        catalog
            .expect_find_by_ids()
            .returning(|_| Ok(vec![SongRecord::new("a", "A")]));
        catalog.expect_run_transaction().times(0);

        let report = reconciler(player, Arc::new(MemoryByteRangeCache::new()), catalog)
            .reconcile_tick(&ContentFilters::default())
            .await
            .unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.complete, 0);
        assert!(!report.published);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected_at_spawn() {
        let reconciler = Arc::new(
            reconciler(
                Arc::new(MemoryByteRangeCache::new()),
                Arc::new(MemoryByteRangeCache::new()),
                MockCatalog::new(),
            )
            .with_config(ReconcilerConfig::new().with_interval(std::time::Duration::ZERO)),
        );

        let result = reconciler.spawn(Arc::new(ContentFilters::default()), CancellationToken::new());
        assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
    }
}
