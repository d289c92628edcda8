//! Offline session walkthrough
//!
//! Starts an in-memory engine, pretends the player finished streaming two
//! songs, and prints the offline snapshot as it changes.
//!
//! ```bash
//! cargo run -p core-service --example offline_session
//! ```

use anyhow::Result;
use bridge_desktop::MemoryByteRangeCache;
use core_library::{Playlist, PlaylistRepository, SongRecord, SongRepository};
use core_playback::queue::{ListQueue, QueueItem};
use core_runtime::config::EngineConfig;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_service::{CoreDependencies, CoreService};
use core_sync::{AttemptHandle, CandidateBatch, DuplicatePolicy};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let player = Arc::new(MemoryByteRangeCache::new());
    let download = Arc::new(MemoryByteRangeCache::new());
    let config = EngineConfig::builder()
        .reconcile_interval(Duration::from_millis(250))
        .hide_video(true)
        .build()?;

    let core = CoreService::start(config, CoreDependencies::new(player.clone(), download)).await?;
    let mut offline = core.subscribe_offline();

    let songs = [
        SongRecord::new("dQw4w9WgXcQ", "Never Gonna Give You Up")
            .with_artist("Rick Astley")
            .with_content_length(3_400_000),
        SongRecord::new("kJQP7kiw5Fk", "Despacito")
            .with_artist("Luis Fonsi")
            .with_content_length(4_100_000)
            .video(true),
        SongRecord::new("fJ9rUzIMcZQ", "Bohemian Rhapsody")
            .with_artist("Queen")
            .with_content_length(5_900_000),
    ];
    for song in &songs {
        core.songs().upsert(song).await?;
    }

    // First song fully streamed, second is a video, third only half way.
    player.record_range("dQw4w9WgXcQ", 0, 3_400_000);
    player.record_range("kJQP7kiw5Fk", 0, 4_100_000);
    player.record_range("fJ9rUzIMcZQ", 0, 2_000_000);

    tokio::time::timeout(Duration::from_secs(5), offline.changed()).await??;
    for song in &offline.borrow().songs {
        println!("offline: {} ({})", song.title, song.id);
    }

    player.record_range("fJ9rUzIMcZQ", 2_000_000, 3_900_000);
    tokio::time::timeout(Duration::from_secs(5), offline.changed()).await??;
    println!("offline count: {}", offline.borrow().len());

    let playlist = Playlist::new("Classics");
    core.playlists().insert(&playlist).await?;
    let batch = CandidateBatch::from_ids(["dQw4w9WgXcQ", "fJ9rUzIMcZQ"]);
    core.add_to_playlist(&playlist.id, &batch).await?;

    if let AttemptHandle::AwaitingResolution(pending) =
        core.add_to_playlist(&playlist.id, &batch).await?
    {
        println!("{} already in {}", pending.duplicates().len(), playlist.name);
        let report = core
            .resolve_insertion(pending, DuplicatePolicy::SkipDuplicates)
            .await?;
        println!("skipped {:?}", report.skipped);
    }

    let queue = ListQueue::from_items(
        offline
            .borrow()
            .songs
            .iter()
            .map(QueueItem::from)
            .collect(),
    );
    let playback = core.start_playback(queue).await?;
    println!("now playing: {:?}", playback.current_item().map(|item| item.title));

    core.shutdown().await?;
    Ok(())
}
