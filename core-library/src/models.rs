//! Domain models for the song catalog
//!
//! Records map one-to-one onto the tables created by the embedded migrations.
//! Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

pub use bridge_traits::cache::ContentId;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a local playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Domain Models
// =============================================================================

/// Catalog entry for one playable song or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SongRecord {
    /// Content id shared with the byte-range caches
    #[sqlx(try_from = "String")]
    pub id: ContentId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    /// Total byte length of the media, once known
    pub content_length: Option<i64>,
    pub explicit: bool,
    pub is_video: bool,
    pub thumbnail_url: Option<String>,
    /// First moment the song was seen fully resident. Set once.
    pub downloaded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SongRecord {
    pub fn new(id: impl Into<ContentId>, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration_ms: None,
            content_length: None,
            explicit: false,
            is_video: false,
            thumbnail_url: None,
            downloaded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_content_length(mut self, content_length: i64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    pub fn explicit(mut self, explicit: bool) -> Self {
        self.explicit = explicit;
        self
    }

    pub fn video(mut self, is_video: bool) -> Self {
        self.is_video = is_video;
        self
    }

    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Byte length usable for a residency check, if the catalog knows one.
    pub fn known_length(&self) -> Option<u64> {
        self.content_length
            .and_then(|len| u64::try_from(len).ok())
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded_at.is_some()
    }

    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Song id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Song title cannot be empty".to_string());
        }

        if matches!(self.duration_ms, Some(d) if d < 0) {
            return Err("Song duration cannot be negative".to_string());
        }

        if matches!(self.content_length, Some(len) if len < 0) {
            return Err("Content length cannot be negative".to_string());
        }

        Ok(())
    }
}

/// User playlist, optionally linked to a playlist in the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    /// Remote catalog identifier; inserts are mirrored only when present
    pub remote_id: Option<String>,
    /// Cached membership count
    pub song_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    /// Create a new local-only playlist
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: PlaylistId::new(),
            name: name.into(),
            remote_id: None,
            song_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn is_linked(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Validate playlist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }

        if matches!(&self.remote_id, Some(remote) if remote.trim().is_empty()) {
            return Err("Remote playlist id cannot be blank".to_string());
        }

        Ok(())
    }
}

/// One ordered membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlaylistMember {
    pub playlist_id: PlaylistId,
    #[sqlx(try_from = "String")]
    pub song_id: ContentId,
    pub position: i64,
    pub added_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_builder_and_validation() {
        let song = SongRecord::new("abc", "Song")
            .with_artist("Artist")
            .with_album("Album")
            .with_duration_ms(180_000)
            .with_content_length(4_000_000)
            .explicit(true)
            .video(false);

        assert_eq!(song.id.as_str(), "abc");
        assert_eq!(song.known_length(), Some(4_000_000));
        assert!(song.explicit);
        assert!(!song.is_downloaded());
        assert!(song.validate().is_ok());

        let mut bad = song.clone();
        bad.title = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = song;
        bad.content_length = Some(-1);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_known_length_rejects_missing_and_negative() {
        assert_eq!(SongRecord::new("a", "t").known_length(), None);
        assert_eq!(
            SongRecord::new("a", "t").with_content_length(0).known_length(),
            Some(0)
        );

        let mut bad = SongRecord::new("a", "t");
        bad.content_length = Some(-1);
        assert_eq!(bad.known_length(), None);
    }

    #[test]
    fn test_playlist_validation() {
        let playlist = Playlist::new("Road trip").with_remote_id("PL123");
        assert!(playlist.is_linked());
        assert!(playlist.validate().is_ok());

        assert!(Playlist::new(" ").validate().is_err());
        assert!(Playlist::new("x").with_remote_id("").validate().is_err());
    }

    #[test]
    fn test_playlist_id_parsing() {
        let id = PlaylistId::new();
        let parsed = PlaylistId::from_string(id.as_str()).unwrap();
        assert_eq!(parsed, id);
        assert!(PlaylistId::from_string("not-a-uuid").is_err());
    }
}
