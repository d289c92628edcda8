//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (byte-range caches,
//! settings, remote catalog, clock) into a running offline engine session.
//! Desktop apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and start from [`CoreDependencies::desktop`].
//!
//! A session owns:
//! - the catalog connection pool
//! - the event bus every component reports to
//! - the cache reconciler and its scheduled task
//! - the playlist insertion coordinator
//! - the current playback session, if any
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use core_service::{CoreDependencies, CoreService};
//!
//! let deps = CoreDependencies::desktop().await?;
//! let core = CoreService::start(EngineConfig::in_memory(), deps).await?;
//! let mut offline = core.subscribe_offline();
//! offline.changed().await?;
//! core.shutdown().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    ByteRangeCache, Clock, ContentId, RemoteCatalogClient, SettingsStore, SystemClock,
};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::{
    PlaylistId, PlaylistRepository, SongRepository, SqliteCatalogStore, SqlitePlaylistRepository,
    SqliteSongRepository,
};
use core_playback::{
    CacheReconciler, CacheSnapshot, ContentFilters, FilterSource, PlaybackQueue, PlaybackSession,
    ReconcilerConfig, ScheduledTask, SettingsFilterSource, TickReport,
};
use core_runtime::config::{DatabaseLocation, EngineConfig};
use core_runtime::events::{CoreEvent, EventBus, EventStream};
use core_sync::{
    AttemptHandle, CandidateBatch, DuplicatePolicy, InsertionConfig, InsertionReport,
    PendingInsertion, PlaylistInsertionCoordinator,
};
use parking_lot::RwLock;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub player_cache: Arc<dyn ByteRangeCache>,
    pub download_cache: Arc<dyn ByteRangeCache>,
    /// Source of the content filters; config defaults apply without it
    pub settings_store: Option<Arc<dyn SettingsStore>>,
    /// Remote playlist catalog; inserts stay local without it
    pub remote_catalog: Option<Arc<dyn RemoteCatalogClient>>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from the two caches, using the system clock.
    pub fn new(
        player_cache: Arc<dyn ByteRangeCache>,
        download_cache: Arc<dyn ByteRangeCache>,
    ) -> Self {
        Self {
            player_cache,
            download_cache,
            settings_store: None,
            remote_catalog: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn with_remote_catalog(mut self, remote: Arc<dyn RemoteCatalogClient>) -> Self {
        self.remote_catalog = Some(remote);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
impl CoreDependencies {
    /// In-process byte-range caches and an in-memory settings store.
    pub async fn desktop() -> Result<Self> {
        use bridge_desktop::{MemoryByteRangeCache, SqliteSettingsStore};

        let settings = SqliteSettingsStore::in_memory()
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        Ok(Self::new(
            Arc::new(MemoryByteRangeCache::new()),
            Arc::new(MemoryByteRangeCache::new()),
        )
        .with_settings_store(Arc::new(settings)))
    }
}

fn database_config(location: &DatabaseLocation) -> DatabaseConfig {
    match location {
        DatabaseLocation::File(path) => DatabaseConfig::new(path.clone()),
        DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
    }
}

/// Primary façade exposed to host applications.
///
/// One value per engine session. Dropping it stops the reconciler; prefer
/// [`CoreService::shutdown`], which also waits for an in-flight tick and
/// closes the catalog.
pub struct CoreService {
    config: EngineConfig,
    pool: SqlitePool,
    event_bus: EventBus,
    songs: Arc<dyn SongRepository>,
    playlists: Arc<dyn PlaylistRepository>,
    reconciler: Arc<CacheReconciler>,
    filters: Arc<dyn FilterSource>,
    reconciler_task: ScheduledTask,
    insertion: Arc<PlaylistInsertionCoordinator>,
    playback: RwLock<Option<Arc<PlaybackSession>>>,
    token: CancellationToken,
}

impl CoreService {
    /// Open the catalog, wire every component and start the reconciler.
    #[instrument(skip_all)]
    pub async fn start(config: EngineConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(database_config(&config.database)).await?;
        let event_bus = EventBus::new(config.event_buffer_size);
        let catalog = Arc::new(SqliteCatalogStore::new(pool.clone()));
        let playlists: Arc<dyn PlaylistRepository> =
            Arc::new(SqlitePlaylistRepository::new(pool.clone()));

        let defaults = ContentFilters::new(
            config.default_filters.hide_explicit,
            config.default_filters.hide_video,
        );
        let filters: Arc<dyn FilterSource> = match deps.settings_store {
            Some(store) => Arc::new(SettingsFilterSource::with_defaults(store, defaults)),
            None => Arc::new(defaults),
        };

        let reconciler = Arc::new(
            CacheReconciler::new(
                deps.player_cache,
                deps.download_cache,
                catalog.clone(),
                deps.clock,
            )
            .with_config(ReconcilerConfig::from(&config))
            .with_event_bus(event_bus.clone()),
        );

        let mut insertion = PlaylistInsertionCoordinator::new(catalog, playlists.clone())
            .with_config(InsertionConfig::from(&config))
            .with_event_bus(event_bus.clone());
        if let Some(remote) = deps.remote_catalog {
            insertion = insertion.with_remote(remote);
        }

        let token = CancellationToken::new();
        let reconciler_task = reconciler.spawn(filters.clone(), token.child_token())?;

        info!(
            in_memory = config.database == DatabaseLocation::InMemory,
            interval = ?config.reconcile_interval,
            "Core service started"
        );

        Ok(Self {
            songs: Arc::new(SqliteSongRepository::new(pool.clone())),
            config,
            pool,
            event_bus,
            playlists,
            reconciler,
            filters,
            reconciler_task,
            insertion: Arc::new(insertion),
            playback: RwLock::new(None),
            token,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receiver for every event raised by the session's components.
    pub fn events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Stream of offline cache events only.
    pub fn cache_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Cache(_)))
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn songs(&self) -> Arc<dyn SongRepository> {
        Arc::clone(&self.songs)
    }

    pub fn playlists(&self) -> Arc<dyn PlaylistRepository> {
        Arc::clone(&self.playlists)
    }

    // ------------------------------------------------------------------------
    // Offline cache
    // ------------------------------------------------------------------------

    /// Most recently published offline snapshot.
    pub fn offline_snapshot(&self) -> Arc<CacheSnapshot> {
        self.reconciler.snapshot()
    }

    pub fn subscribe_offline(&self) -> watch::Receiver<Arc<CacheSnapshot>> {
        self.reconciler.subscribe()
    }

    /// Run a reconciliation pass now instead of waiting for the next tick.
    ///
    /// Unlike scheduled ticks, a failure is returned to the caller.
    pub async fn refresh_offline(&self) -> Result<TickReport> {
        let filters = self.filters.filters().await;
        Ok(self.reconciler.reconcile_tick(&filters).await?)
    }

    /// Drop a song from the player cache. Its download stamp is kept.
    pub async fn evict(&self, id: &ContentId) -> Result<()> {
        Ok(self.reconciler.evict(id).await?)
    }

    /// Whether the scheduled reconciler is still running.
    pub fn is_reconciling(&self) -> bool {
        !self.reconciler_task.is_finished()
    }

    // ------------------------------------------------------------------------
    // Playlists
    // ------------------------------------------------------------------------

    pub fn insertion(&self) -> Arc<PlaylistInsertionCoordinator> {
        Arc::clone(&self.insertion)
    }

    pub async fn add_to_playlist(
        &self,
        playlist_id: &PlaylistId,
        batch: &CandidateBatch,
    ) -> Result<AttemptHandle> {
        Ok(self.insertion.attempt_insert(playlist_id, batch).await?)
    }

    pub async fn resolve_insertion(
        &self,
        pending: PendingInsertion,
        policy: DuplicatePolicy,
    ) -> Result<InsertionReport> {
        Ok(self.insertion.resolve(pending, policy).await?)
    }

    // ------------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------------

    /// Replace the current playback session with one over `queue`.
    ///
    /// When the queue cannot start, the previous session stays current.
    pub async fn start_playback(
        &self,
        queue: impl Into<PlaybackQueue>,
    ) -> Result<Arc<PlaybackSession>> {
        let session =
            Arc::new(PlaybackSession::start_with_event_bus(queue, self.event_bus.clone()).await?);
        *self.playback.write() = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn playback(&self) -> Option<Arc<PlaybackSession>> {
        self.playback.read().clone()
    }

    /// Stop the reconciler, waiting for an in-flight tick, and close the catalog.
    #[instrument(skip_all)]
    pub async fn shutdown(self) -> Result<()> {
        self.token.cancel();
        self.reconciler_task.shutdown().await?;
        self.pool.close().await;
        info!("Core service stopped");
        Ok(())
    }
}
