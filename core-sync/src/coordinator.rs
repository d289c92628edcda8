//! # Playlist Insertion Coordinator
//!
//! Adds a batch of songs to a playlist, stopping for a decision when some of
//! them are already members.
//!
//! ## Workflow
//!
//! 1. Load the target playlist
//! 2. Resolve the [`CandidateBatch`] (runs its materializer at most once)
//! 3. Query which candidates are already members, in one batch query
//! 4. No duplicates: insert everything in one transaction and return
//!    [`AttemptHandle::Committed`]
//! 5. Duplicates: write nothing and return
//!    [`AttemptHandle::AwaitingResolution`]; the caller picks a
//!    [`DuplicatePolicy`] and passes the pending attempt to
//!    [`PlaylistInsertionCoordinator::resolve`]
//! 6. After a commit, mirror each inserted id to the remote catalog when the
//!    playlist is linked. Mirror failures are logged and reported, never
//!    rolled back
//!
//! The local transaction runs on its own task, so a caller that stops
//! waiting does not interrupt it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{AttemptHandle, CandidateBatch, DuplicatePolicy};
//!
//! let batch = CandidateBatch::from_ids(["b", "c", "d"]);
//! let report = match coordinator.attempt_insert(&playlist_id, &batch).await? {
//!     AttemptHandle::Committed(report) => report,
//!     AttemptHandle::AwaitingResolution(pending) => {
//!         println!("{} already in playlist", pending.duplicates().len());
//!         coordinator.resolve(pending, DuplicatePolicy::SkipDuplicates).await?
//!     }
//! };
//! ```

use crate::candidates::CandidateBatch;
use crate::duplicates::{DuplicatePolicy, DuplicateSet};
use crate::{Result, SyncError};
use bridge_traits::remote::RemoteCatalogClient;
use core_library::{CatalogStore, ContentId, Playlist, PlaylistId, PlaylistRepository};
use core_runtime::config::EngineConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Insertion coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionConfig {
    /// Mirror committed inserts to the remote catalog for linked playlists
    pub mirror_remote: bool,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            mirror_remote: true,
        }
    }
}

impl From<&EngineConfig> for InsertionConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            mirror_remote: config.enable_remote_mirroring,
        }
    }
}

/// Outcome of a committed (or cancelled) insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionReport {
    pub playlist_id: PlaylistId,
    /// Ids appended, in insertion order
    pub inserted: Vec<ContentId>,
    /// Candidates left out by the resolution policy
    pub skipped: Vec<ContentId>,
    /// Policy used, when the attempt needed one
    pub resolution: Option<DuplicatePolicy>,
    /// Remote mirror calls that succeeded
    pub mirrored: usize,
    /// Ids whose remote mirror call failed
    pub mirror_failures: Vec<ContentId>,
}

impl InsertionReport {
    fn empty(playlist_id: PlaylistId, resolution: Option<DuplicatePolicy>) -> Self {
        Self {
            playlist_id,
            inserted: Vec::new(),
            skipped: Vec::new(),
            resolution,
            mirrored: 0,
            mirror_failures: Vec::new(),
        }
    }
}

/// An attempt held back because some candidates are already members.
///
/// Nothing has been written. Consumed by
/// [`PlaylistInsertionCoordinator::resolve`], so it can be resolved once.
#[derive(Debug)]
pub struct PendingInsertion {
    playlist: Playlist,
    candidates: Vec<ContentId>,
    duplicates: DuplicateSet,
}

impl PendingInsertion {
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn candidates(&self) -> &[ContentId] {
        &self.candidates
    }

    pub fn duplicates(&self) -> &DuplicateSet {
        &self.duplicates
    }
}

/// Result of [`PlaylistInsertionCoordinator::attempt_insert`].
#[derive(Debug)]
pub enum AttemptHandle {
    /// No duplicates; every candidate was inserted.
    Committed(InsertionReport),
    /// Duplicates found; waiting for a [`DuplicatePolicy`].
    AwaitingResolution(PendingInsertion),
}

/// Duplicate-aware playlist insertion with best-effort remote mirroring.
pub struct PlaylistInsertionCoordinator {
    catalog: Arc<dyn CatalogStore>,
    playlists: Arc<dyn PlaylistRepository>,
    remote: Option<Arc<dyn RemoteCatalogClient>>,
    config: InsertionConfig,
    event_bus: Option<EventBus>,
}

impl PlaylistInsertionCoordinator {
    pub fn new(catalog: Arc<dyn CatalogStore>, playlists: Arc<dyn PlaylistRepository>) -> Self {
        Self {
            catalog,
            playlists,
            remote: None,
            config: InsertionConfig::default(),
            event_bus: None,
        }
    }

    /// Remote catalog used to mirror inserts into linked playlists.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteCatalogClient>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_config(mut self, config: InsertionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Start inserting `batch` into the playlist.
    ///
    /// # Errors
    /// - `PlaylistNotFound` for an unknown playlist
    /// - `Materializer` when a lazy batch cannot be produced
    /// - `MembershipQuery` when duplicates cannot be computed; nothing is written
    /// - `InsertFailed` when the transaction fails; nothing is written
    #[instrument(skip_all, fields(playlist_id = %playlist_id))]
    pub async fn attempt_insert(
        &self,
        playlist_id: &PlaylistId,
        batch: &CandidateBatch,
    ) -> Result<AttemptHandle> {
        let playlist = self
            .playlists
            .find_by_id(playlist_id)
            .await?
            .ok_or_else(|| SyncError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            })?;

        let candidates = batch.resolve(&playlist).await?.to_vec();
        if candidates.is_empty() {
            debug!("No candidates to insert");
            return Ok(AttemptHandle::Committed(InsertionReport::empty(
                playlist.id,
                None,
            )));
        }

        let existing = self
            .catalog
            .existing_membership(&playlist.id, &candidates)
            .await
            .map_err(|e| {
                warn!(error = %e, "Membership query failed");
                SyncError::MembershipQuery(e)
            })?;
        let duplicates = DuplicateSet::between(&candidates, &existing);

        if !duplicates.is_empty() {
            info!(
                candidates = candidates.len(),
                duplicates = duplicates.len(),
                "Insertion awaiting duplicate resolution"
            );
            return Ok(AttemptHandle::AwaitingResolution(PendingInsertion {
                playlist,
                candidates,
                duplicates,
            }));
        }

        let report = self.commit(playlist, candidates, Vec::new(), None).await?;
        Ok(AttemptHandle::Committed(report))
    }

    /// Finish a pending attempt with `policy`.
    ///
    /// `Cancel` writes nothing and makes no remote calls.
    #[instrument(skip_all, fields(playlist_id = %pending.playlist.id, ?policy))]
    pub async fn resolve(
        &self,
        pending: PendingInsertion,
        policy: DuplicatePolicy,
    ) -> Result<InsertionReport> {
        let (insert, skipped) = policy.partition(&pending.candidates, &pending.duplicates);
        self.commit(pending.playlist, insert, skipped, Some(policy))
            .await
    }

    async fn commit(
        &self,
        playlist: Playlist,
        insert: Vec<ContentId>,
        skipped: Vec<ContentId>,
        resolution: Option<DuplicatePolicy>,
    ) -> Result<InsertionReport> {
        let mut report = InsertionReport::empty(playlist.id.clone(), resolution);
        report.skipped = skipped;
        if insert.is_empty() {
            debug!(skipped = report.skipped.len(), "Nothing to insert");
            return Ok(report);
        }

        // Runs detached so an abandoned caller cannot cut the transaction short.
        let catalog = Arc::clone(&self.catalog);
        let playlist_id = playlist.id.clone();
        let ids = insert.clone();
        let written = tokio::spawn(async move { catalog.insert_members(&playlist_id, &ids).await })
            .await
            .map_err(|e| SyncError::Internal(e.to_string()))?
            .map_err(|e| {
                warn!(error = %e, "Playlist insert rolled back");
                SyncError::InsertFailed(e)
            })?;

        info!(
            inserted = written.members_added,
            skipped = report.skipped.len(),
            "Songs added to playlist"
        );
        self.emit(LibraryEvent::PlaylistMembersAdded {
            playlist_id: playlist.id.to_string(),
            count: written.members_added,
        });

        report.inserted = insert;
        self.mirror(&playlist, &mut report).await;
        Ok(report)
    }

    async fn mirror(&self, playlist: &Playlist, report: &mut InsertionReport) {
        if !self.config.mirror_remote {
            return;
        }
        let (Some(remote), Some(remote_id)) = (&self.remote, playlist.remote_id.as_deref()) else {
            return;
        };

        for id in &report.inserted {
            match remote.mirror_add(remote_id, id).await {
                Ok(()) => report.mirrored += 1,
                Err(e) => {
                    warn!(
                        song_id = %id,
                        remote_playlist = remote_id,
                        error = %e,
                        "Remote mirror failed"
                    );
                    self.emit(LibraryEvent::MirrorFailed {
                        playlist_id: playlist.id.to_string(),
                        song_id: id.to_string(),
                        message: e.to_string(),
                    });
                    report.mirror_failures.push(id.clone());
                }
            }
        }

        debug!(
            mirrored = report.mirrored,
            failed = report.mirror_failures.len(),
            "Remote mirroring finished"
        );
    }

    fn emit(&self, event: LibraryEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Library(event)).ok();
        }
    }
}
