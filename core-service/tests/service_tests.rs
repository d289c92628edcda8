//! Engine session wiring tests
//!
//! Each test starts a full in-memory session and drives it through the
//! façade only.

use bridge_desktop::{MemoryByteRangeCache, SqliteSettingsStore};
use bridge_traits::error::BridgeError;
use bridge_traits::{FixedClock, SettingsStore};
use core_library::{ContentId, Playlist, PlaylistRepository, SongRecord, SongRepository};
use core_playback::queue::{ListQueue, PageSource, PaginatedQueue, QueueItem, QueuePage};
use core_runtime::config::EngineConfig;
use core_runtime::events::{CacheEvent, CoreEvent};
use core_service::{CoreDependencies, CoreError, CoreService};
use core_sync::{AttemptHandle, CandidateBatch, DuplicatePolicy};
use std::sync::Arc;
use std::time::Duration;

const SONG_LEN: u64 = 4_096;

struct Session {
    core: CoreService,
    player: Arc<MemoryByteRangeCache>,
    settings: Arc<SqliteSettingsStore>,
}

fn config(interval: Duration) -> EngineConfig {
    EngineConfig::builder()
        .reconcile_interval(interval)
        .build()
        .unwrap()
}

async fn session(config: EngineConfig) -> Session {
    let player = Arc::new(MemoryByteRangeCache::new());
    let download = Arc::new(MemoryByteRangeCache::new());
    let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());

    let deps = CoreDependencies::new(player.clone(), download)
        .with_settings_store(settings.clone())
        .with_clock(Arc::new(FixedClock::from_millis(1_700_000_000_000)));
    let core = CoreService::start(config, deps).await.unwrap();

    Session {
        core,
        player,
        settings,
    }
}

async fn cache_song(session: &Session, song: SongRecord) {
    let id = song.id.clone();
    session.core.songs().upsert(&song).await.unwrap();
    session.player.record_range(id, 0, SONG_LEN);
}

fn song(id: &str) -> SongRecord {
    SongRecord::new(id, id.to_uppercase()).with_content_length(SONG_LEN as i64)
}

#[tokio::test]
async fn test_refresh_publishes_offline_snapshot() {
    let session = session(config(Duration::from_secs(3600))).await;
    let mut events = session.core.events();

    cache_song(&session, song("a")).await;
    session.core.refresh_offline().await.unwrap();

    let snapshot = session.core.offline_snapshot();
    assert!(snapshot.contains(&ContentId::from("a")));

    let stored = session
        .core
        .songs()
        .find_by_id(&ContentId::from("a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.downloaded_at, Some(1_700_000_000_000));

    let mut downloaded = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Cache(CacheEvent::SongsDownloaded { .. })) {
            downloaded = true;
        }
    }
    assert!(downloaded);

    session.core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cache_events_skip_other_domains() {
    let session = session(config(Duration::from_secs(3600))).await;
    let mut all_events = session.core.events();
    let mut cache_events = session.core.cache_events();

    let queue = ListQueue::from_items(vec![QueueItem::new("q", "Q")]);
    session.core.start_playback(queue).await.unwrap();
    cache_song(&session, song("a")).await;
    session.core.refresh_offline().await.unwrap();

    let mut received = Vec::new();
    while let Some(event) = cache_events.try_recv() {
        received.push(event.unwrap());
    }
    assert!(!received.is_empty());
    assert!(received
        .iter()
        .all(|event| matches!(event, CoreEvent::Cache(_))));
    assert!(received
        .iter()
        .any(|event| matches!(event, CoreEvent::Cache(CacheEvent::SongsDownloaded { .. }))));

    let mut saw_playback = false;
    while let Ok(event) = all_events.try_recv() {
        saw_playback |= matches!(event, CoreEvent::Playback(_));
    }
    assert!(saw_playback);

    session.core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_settings_drive_snapshot_filters() {
    let session = session(config(Duration::from_secs(3600))).await;
    cache_song(&session, song("clean")).await;
    cache_song(&session, song("rude").explicit(true)).await;

    session.core.refresh_offline().await.unwrap();
    assert_eq!(session.core.offline_snapshot().len(), 2);

    session.settings.set_bool("hide_explicit", true).await.unwrap();
    session.core.refresh_offline().await.unwrap();

    let snapshot = session.core.offline_snapshot();
    assert_eq!(snapshot.ids(), vec![ContentId::from("clean")]);

    session.core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scheduled_reconciler_runs_without_refresh() {
    let session = session(config(Duration::from_millis(50))).await;
    let mut offline = session.core.subscribe_offline();
    assert!(session.core.is_reconciling());

    cache_song(&session, song("a")).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            offline.changed().await.unwrap();
            if offline.borrow().contains(&ContentId::from("a")) {
                break;
            }
        }
    })
    .await
    .unwrap();

    session.core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_evict_keeps_download_stamp() {
    let session = session(config(Duration::from_secs(3600))).await;
    cache_song(&session, song("a")).await;
    session.core.refresh_offline().await.unwrap();

    session.core.evict(&ContentId::from("a")).await.unwrap();
    session.core.refresh_offline().await.unwrap();

    assert!(session.core.offline_snapshot().is_empty());
    let stored = session
        .core
        .songs()
        .find_by_id(&ContentId::from("a"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_downloaded());

    session.core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = EngineConfig::in_memory();
    config.reconcile_interval = Duration::ZERO;

    let deps = CoreDependencies::new(
        Arc::new(MemoryByteRangeCache::new()),
        Arc::new(MemoryByteRangeCache::new()),
    );
    let result = CoreService::start(config, deps).await;
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}

#[tokio::test]
async fn test_playlist_insertion_through_service() {
    let session = session(config(Duration::from_secs(3600))).await;
    for id in ["a", "b"] {
        session.core.songs().upsert(&song(id)).await.unwrap();
    }
    let playlist = Playlist::new("Road trip");
    session.core.playlists().insert(&playlist).await.unwrap();

    let handle = session
        .core
        .add_to_playlist(&playlist.id, &CandidateBatch::from_ids(["a"]))
        .await
        .unwrap();
    assert!(matches!(handle, AttemptHandle::Committed(_)));

    let handle = session
        .core
        .add_to_playlist(&playlist.id, &CandidateBatch::from_ids(["a", "b"]))
        .await
        .unwrap();
    let AttemptHandle::AwaitingResolution(pending) = handle else {
        panic!("expected duplicates");
    };
    let report = session
        .core
        .resolve_insertion(pending, DuplicatePolicy::SkipDuplicates)
        .await
        .unwrap();
    assert_eq!(report.inserted, vec![ContentId::from("b")]);

    let members = session.core.playlists().get_song_ids(&playlist.id).await.unwrap();
    assert_eq!(members, vec![ContentId::from("a"), ContentId::from("b")]);

    session.core.shutdown().await.unwrap();
}

struct Offline;

#[async_trait::async_trait]
impl PageSource for Offline {
    async fn fetch_page(&self, _continuation: Option<String>) -> Result<QueuePage, BridgeError> {
        Err(BridgeError::NotAvailable("no network".to_string()))
    }
}

#[tokio::test]
async fn test_failed_playback_start_keeps_current_session() {
    let session = session(config(Duration::from_secs(3600))).await;
    assert!(session.core.playback().is_none());

    let queue = ListQueue::from_items(vec![QueueItem::new("a", "A"), QueueItem::new("b", "B")]);
    let started = session.core.start_playback(queue).await.unwrap();
    assert_eq!(started.status().len(), 2);

    let result = session
        .core
        .start_playback(PaginatedQueue::new(Arc::new(Offline)))
        .await;
    assert!(matches!(result, Err(CoreError::Playback(_))));

    let current = session.core.playback().unwrap();
    assert!(Arc::ptr_eq(&current, &started));

    session.core.shutdown().await.unwrap();
}
