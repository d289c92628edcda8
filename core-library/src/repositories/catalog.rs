//! Catalog store: batch reads and all-or-nothing writes
//!
//! This is the seam the cache reconciler and the playlist insertion
//! coordinator depend on. Every call either fully succeeds or leaves the
//! catalog untouched.

use crate::error::Result;
use crate::models::{ContentId, PlaylistId, SongRecord};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Bind parameters per `IN (...)` statement. Well below SQLite's limit.
const ID_CHUNK_SIZE: usize = 500;

/// One mutation applied inside a catalog transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWrite {
    /// Set `downloaded_at` to `at` unless the song already carries a stamp.
    StampDownloaded { song_id: ContentId, at: i64 },
    /// Append `song_id` at the end of the playlist.
    AddMember {
        playlist_id: PlaylistId,
        song_id: ContentId,
    },
}

/// Rows changed by a committed transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Songs that received a download stamp
    pub stamped: usize,
    /// Membership rows written
    pub members_added: usize,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up every record whose id is in `ids`. Unknown ids are skipped.
    ///
    /// Callers avoid the call entirely for an empty input.
    async fn find_by_ids(&self, ids: &[ContentId]) -> Result<Vec<SongRecord>>;

    /// Apply `writes` in order inside one transaction.
    async fn run_transaction(&self, writes: Vec<CatalogWrite>) -> Result<WriteSummary>;

    /// The subset of `ids` already present in the playlist.
    async fn existing_membership(
        &self,
        playlist_id: &PlaylistId,
        ids: &[ContentId],
    ) -> Result<HashSet<ContentId>>;

    /// Append every id in `ids` to the playlist in one transaction.
    async fn insert_members(
        &self,
        playlist_id: &PlaylistId,
        ids: &[ContentId],
    ) -> Result<WriteSummary> {
        let writes = ids
            .iter()
            .map(|id| CatalogWrite::AddMember {
                playlist_id: playlist_id.clone(),
                song_id: id.clone(),
            })
            .collect();
        self.run_transaction(writes).await
    }
}

/// SQLite implementation of [`CatalogStore`]
#[derive(Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn stamp(tx: &mut Transaction<'_, Sqlite>, song_id: &ContentId, at: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE songs SET downloaded_at = ?, updated_at = ? \
             WHERE id = ? AND downloaded_at IS NULL",
        )
        .bind(at)
        .bind(at)
        .bind(song_id.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_member(
        tx: &mut Transaction<'_, Sqlite>,
        playlist_id: &PlaylistId,
        song_id: &ContentId,
        added_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO playlist_songs (playlist_id, song_id, position, added_at)
            SELECT ?, ?, COALESCE(MAX(position) + 1, 0), ?
            FROM playlist_songs WHERE playlist_id = ?
            "#,
        )
        .bind(playlist_id)
        .bind(song_id.as_str())
        .bind(added_at)
        .bind(playlist_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "UPDATE playlists SET song_count = song_count + 1, updated_at = ? WHERE id = ?",
        )
        .bind(added_at)
        .bind(playlist_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[ContentId]) -> Result<Vec<SongRecord>> {
        let mut records = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM songs WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let rows = builder
                .build_query_as::<SongRecord>()
                .fetch_all(&self.pool)
                .await?;
            records.extend(rows);
        }

        debug!(found = records.len(), "Catalog lookup");
        Ok(records)
    }

    #[instrument(skip(self, writes), fields(count = writes.len()))]
    async fn run_transaction(&self, writes: Vec<CatalogWrite>) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();
        if writes.is_empty() {
            return Ok(summary);
        }

        let added_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on an early return rolls everything back.
        for write in &writes {
            match write {
                CatalogWrite::StampDownloaded { song_id, at } => {
                    if Self::stamp(&mut tx, song_id, *at).await? {
                        summary.stamped += 1;
                    }
                }
                CatalogWrite::AddMember {
                    playlist_id,
                    song_id,
                } => {
                    Self::append_member(&mut tx, playlist_id, song_id, added_at).await?;
                    summary.members_added += 1;
                }
            }
        }

        tx.commit().await?;
        debug!(
            stamped = summary.stamped,
            members_added = summary.members_added,
            "Catalog transaction committed"
        );
        Ok(summary)
    }

    #[instrument(skip(self, ids), fields(playlist_id = %playlist_id, count = ids.len()))]
    async fn existing_membership(
        &self,
        playlist_id: &PlaylistId,
        ids: &[ContentId],
    ) -> Result<HashSet<ContentId>> {
        let mut existing = HashSet::new();

        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT DISTINCT song_id FROM playlist_songs WHERE playlist_id = ",
            );
            builder.push_bind(playlist_id.as_str());
            builder.push(" AND song_id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let rows: Vec<(String,)> = builder.build_query_as().fetch_all(&self.pool).await?;
            existing.extend(rows.into_iter().map(|(id,)| ContentId::from(id)));
        }

        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::Playlist;
    use crate::repositories::{
        PlaylistRepository, SongRepository, SqlitePlaylistRepository, SqliteSongRepository,
    };

    async fn setup() -> (SqliteCatalogStore, SqliteSongRepository, SqlitePlaylistRepository) {
        let pool = create_test_pool().await.unwrap();
        (
            SqliteCatalogStore::new(pool.clone()),
            SqliteSongRepository::new(pool.clone()),
            SqlitePlaylistRepository::new(pool),
        )
    }

    fn ids(raw: &[&str]) -> Vec<ContentId> {
        raw.iter().map(|s| ContentId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let (store, songs, _) = setup().await;
        songs.upsert(&SongRecord::new("a", "A")).await.unwrap();
        songs.upsert(&SongRecord::new("b", "B")).await.unwrap();

        let mut found = store.find_by_ids(&ids(&["a", "b", "zzz"])).await.unwrap();
        found.sort_by(|x, y| x.id.cmp(&y.id));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "A");
        assert_eq!(found[1].title, "B");
    }

    #[tokio::test]
    async fn test_find_by_ids_spans_chunks() {
        let (store, songs, _) = setup().await;
        let all: Vec<ContentId> = (0..(ID_CHUNK_SIZE + 20))
            .map(|i| ContentId::from(format!("song-{}", i)))
            .collect();
        for id in &all {
            songs.upsert(&SongRecord::new(id.clone(), "t")).await.unwrap();
        }

        let found = store.find_by_ids(&all).await.unwrap();
        assert_eq!(found.len(), all.len());
    }

    #[tokio::test]
    async fn test_stamp_is_idempotent() {
        let (store, songs, _) = setup().await;
        songs.upsert(&SongRecord::new("a", "A")).await.unwrap();

        let first = store
            .run_transaction(vec![CatalogWrite::StampDownloaded {
                song_id: "a".into(),
                at: 1_000,
            }])
            .await
            .unwrap();
        assert_eq!(first.stamped, 1);

        let second = store
            .run_transaction(vec![CatalogWrite::StampDownloaded {
                song_id: "a".into(),
                at: 2_000,
            }])
            .await
            .unwrap();
        assert_eq!(second.stamped, 0);

        let record = songs.find_by_id(&"a".into()).await.unwrap().unwrap();
        assert_eq!(record.downloaded_at, Some(1_000));
    }

    #[tokio::test]
    async fn test_members_append_in_order_and_allow_duplicates() {
        let (store, songs, playlists) = setup().await;
        for id in ["a", "b"] {
            songs.upsert(&SongRecord::new(id, id)).await.unwrap();
        }
        let playlist = Playlist::new("Mix");
        playlists.insert(&playlist).await.unwrap();

        store
            .insert_members(&playlist.id, &ids(&["a", "b"]))
            .await
            .unwrap();
        let summary = store
            .insert_members(&playlist.id, &ids(&["a"]))
            .await
            .unwrap();
        assert_eq!(summary.members_added, 1);

        let members = playlists.get_song_ids(&playlist.id).await.unwrap();
        assert_eq!(members, ids(&["a", "b", "a"]));

        let stored = playlists.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(stored.song_count, 3);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_whole_transaction() {
        let (store, songs, playlists) = setup().await;
        songs.upsert(&SongRecord::new("a", "A")).await.unwrap();
        let playlist = Playlist::new("Mix");
        playlists.insert(&playlist).await.unwrap();

        // "missing" violates the songs foreign key after "a" was written.
        let result = store
            .insert_members(&playlist.id, &ids(&["a", "missing"]))
            .await;
        assert!(result.is_err());

        assert!(playlists.get_song_ids(&playlist.id).await.unwrap().is_empty());
        let stored = playlists.find_by_id(&playlist.id).await.unwrap().unwrap();
        assert_eq!(stored.song_count, 0);
    }

    #[tokio::test]
    async fn test_existing_membership() {
        let (store, songs, playlists) = setup().await;
        for id in ["a", "b", "c"] {
            songs.upsert(&SongRecord::new(id, id)).await.unwrap();
        }
        let playlist = Playlist::new("Mix");
        playlists.insert(&playlist).await.unwrap();
        store
            .insert_members(&playlist.id, &ids(&["a", "c", "c"]))
            .await
            .unwrap();

        let existing = store
            .existing_membership(&playlist.id, &ids(&["a", "b", "c"]))
            .await
            .unwrap();
        let expected: HashSet<ContentId> = ids(&["a", "c"]).into_iter().collect();
        assert_eq!(existing, expected);

        let other = Playlist::new("Other");
        playlists.insert(&other).await.unwrap();
        assert!(store
            .existing_membership(&other.id, &ids(&["a"]))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_transaction_is_noop() {
        let (store, _, _) = setup().await;
        let summary = store.run_transaction(Vec::new()).await.unwrap();
        assert_eq!(summary, WriteSummary::default());
    }
}
