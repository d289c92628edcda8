//! Song repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{ContentId, SongRecord};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Song repository interface
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Find a song by its content id
    async fn find_by_id(&self, id: &ContentId) -> Result<Option<SongRecord>>;

    /// Insert a song or refresh its metadata.
    ///
    /// An existing `downloaded_at` stamp is never overwritten or cleared.
    async fn upsert(&self, song: &SongRecord) -> Result<()>;

    /// Songs carrying a download stamp, newest first
    async fn list_downloaded(&self, limit: u32) -> Result<Vec<SongRecord>>;

    /// Count total songs
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_id(&self, id: &ContentId) -> Result<Option<SongRecord>> {
        let song = query_as::<_, SongRecord>("SELECT * FROM songs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn upsert(&self, song: &SongRecord) -> Result<()> {
        song.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Song".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT INTO songs (
                id, title, artist, album, duration_ms, content_length, explicit,
                is_video, thumbnail_url, downloaded_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                duration_ms = excluded.duration_ms,
                content_length = COALESCE(excluded.content_length, songs.content_length),
                explicit = excluded.explicit,
                is_video = excluded.is_video,
                thumbnail_url = excluded.thumbnail_url,
                downloaded_at = COALESCE(songs.downloaded_at, excluded.downloaded_at),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(song.id.as_str())
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.duration_ms)
        .bind(song.content_length)
        .bind(song.explicit)
        .bind(song.is_video)
        .bind(&song.thumbnail_url)
        .bind(song.downloaded_at)
        .bind(song.created_at)
        .bind(song.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_downloaded(&self, limit: u32) -> Result<Vec<SongRecord>> {
        let songs = query_as::<_, SongRecord>(
            "SELECT * FROM songs WHERE downloaded_at IS NOT NULL \
             ORDER BY downloaded_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM songs")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
