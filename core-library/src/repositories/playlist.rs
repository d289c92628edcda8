//! Playlist repository trait and implementation
//!
//! Membership writes go through [`CatalogStore`](super::CatalogStore) so they
//! share its transaction semantics; this repository covers the playlist rows
//! themselves and ordered reads.

use crate::error::{LibraryError, Result};
use crate::models::{ContentId, Playlist, PlaylistId, PlaylistMember};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by its ID
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>>;

    /// Insert a new playlist
    ///
    /// # Errors
    /// Returns error if validation fails or the id already exists
    async fn insert(&self, playlist: &Playlist) -> Result<()>;

    /// Link the playlist to a remote catalog playlist, or unlink with `None`
    async fn set_remote_id(&self, id: &PlaylistId, remote_id: Option<&str>) -> Result<()>;

    /// Delete a playlist and its membership
    ///
    /// # Returns
    /// - `Ok(true)` if playlist was deleted
    /// - `Ok(false)` if playlist was not found
    async fn delete(&self, id: &PlaylistId) -> Result<bool>;

    /// Song ids in playlist order, duplicates included
    async fn get_song_ids(&self, id: &PlaylistId) -> Result<Vec<ContentId>>;

    /// Membership rows in playlist order
    async fn get_members(&self, id: &PlaylistId) -> Result<Vec<PlaylistMember>>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        playlist
            .validate()
            .map_err(|e| LibraryError::InvalidInput {
                field: "Playlist".to_string(),
                message: e,
            })?;

        query(
            r#"
            INSERT INTO playlists (id, name, remote_id, song_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.name)
        .bind(&playlist.remote_id)
        .bind(playlist.song_count)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_remote_id(&self, id: &PlaylistId, remote_id: Option<&str>) -> Result<()> {
        if matches!(remote_id, Some(remote) if remote.trim().is_empty()) {
            return Err(LibraryError::InvalidInput {
                field: "remote_id".to_string(),
                message: "Remote playlist id cannot be blank".to_string(),
            });
        }

        let result = query("UPDATE playlists SET remote_id = ?, updated_at = ? WHERE id = ?")
            .bind(remote_id)
            .bind(chrono::Utc::now().timestamp_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Playlist".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &PlaylistId) -> Result<bool> {
        // playlist_songs rows go with it through ON DELETE CASCADE
        let result = query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_song_ids(&self, id: &PlaylistId) -> Result<Vec<ContentId>> {
        let song_ids = query_as::<_, (String,)>(
            "SELECT song_id FROM playlist_songs WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|(id,)| ContentId::from(id)).collect())?;

        Ok(song_ids)
    }

    async fn get_members(&self, id: &PlaylistId) -> Result<Vec<PlaylistMember>> {
        let members = query_as::<_, PlaylistMember>(
            "SELECT * FROM playlist_songs WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM playlists")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::SongRecord;
    use crate::repositories::{
        CatalogStore, SongRepository, SqliteCatalogStore, SqliteSongRepository,
    };

    async fn setup_test_pool() -> SqlitePool {
        create_test_pool().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_playlist() {
        let repo = SqlitePlaylistRepository::new(setup_test_pool().await);

        let playlist = Playlist::new("Workout").with_remote_id("PLremote");
        repo.insert(&playlist).await.unwrap();

        let found = repo.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Workout");
        assert_eq!(found.remote_id.as_deref(), Some("PLremote"));
        assert_eq!(found.song_count, 0);
    }

    #[tokio::test]
    async fn test_set_remote_id() {
        let repo = SqlitePlaylistRepository::new(setup_test_pool().await);
        let playlist = Playlist::new("Local");
        repo.insert(&playlist).await.unwrap();

        repo.set_remote_id(&playlist.id, Some("PL1")).await.unwrap();
        let linked = repo.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert!(linked.is_linked());

        repo.set_remote_id(&playlist.id, None).await.unwrap();
        let unlinked = repo.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert!(!unlinked.is_linked());

        assert!(repo.set_remote_id(&playlist.id, Some(" ")).await.is_err());
        let missing = repo.set_remote_id(&PlaylistId::new(), Some("PL2")).await;
        assert!(matches!(missing, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_cascades_membership() {
        let pool = setup_test_pool().await;
        let repo = SqlitePlaylistRepository::new(pool.clone());
        let songs = SqliteSongRepository::new(pool.clone());
        let store = SqliteCatalogStore::new(pool);

        songs.upsert(&SongRecord::new("a", "A")).await.unwrap();
        let playlist = Playlist::new("Mix");
        repo.insert(&playlist).await.unwrap();
        store
            .insert_members(&playlist.id, &[ContentId::from("a")])
            .await
            .unwrap();

        let members = repo.get_members(&playlist.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].position, 0);

        assert!(repo.delete(&playlist.id).await.unwrap());
        assert!(!repo.delete(&playlist.id).await.unwrap());
        assert!(repo.get_song_ids(&playlist.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_and_validation() {
        let repo = SqlitePlaylistRepository::new(setup_test_pool().await);
        assert_eq!(repo.count().await.unwrap(), 0);

        for i in 1..=3 {
            repo.insert(&Playlist::new(format!("Playlist {}", i)))
                .await
                .unwrap();
        }
        assert_eq!(repo.count().await.unwrap(), 3);

        assert!(repo.insert(&Playlist::new("")).await.is_err());
    }
}
