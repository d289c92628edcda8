//! Byte-Range Cache Contract
//!
//! Streaming players persist partial downloads as byte ranges keyed by a
//! stable content id. The core never reads the bytes; it only needs to know
//! which ids are present and whether a given span is resident.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::Result;

/// Stable identifier shared by the song catalog and every byte-range cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A contiguous span `[offset, offset + length)` recorded for one content id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRange {
    pub offset: u64,
    pub length: u64,
}

impl CachedRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end of the span.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True when `other` starts inside this span or touches its end.
    pub fn touches(&self, other: &CachedRange) -> bool {
        other.offset <= self.end() && self.offset <= other.end()
    }
}

/// Byte-range cache owned by the host player.
///
/// Two instances exist per session: the transient player cache filled while
/// streaming and the persistent download cache filled by explicit downloads.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cache::{ByteRangeCache, ContentId};
///
/// async fn resident(cache: &dyn ByteRangeCache, id: &ContentId, len: u64) -> bool {
///     cache.is_fully_cached(id, 0, len).await.unwrap_or(false)
/// }
/// ```
#[async_trait]
pub trait ByteRangeCache: Send + Sync {
    /// Every id with at least one recorded range.
    async fn keys(&self) -> Result<HashSet<ContentId>>;

    /// Whether `[offset, offset + length)` is fully resident for `id`.
    async fn is_fully_cached(&self, id: &ContentId, offset: u64, length: u64) -> Result<bool>;

    /// Drop every range recorded for `id`. Evicting an unknown id is a no-op.
    async fn evict(&self, id: &ContentId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_conversions() {
        let id = ContentId::from("abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(ContentId::new(String::from("abc123")), id);
        assert_eq!(id.into_inner(), "abc123");
    }

    #[test]
    fn test_content_id_serializes_as_string() {
        let id = ContentId::from("x1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"x1\"");

        let back: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_range_touching() {
        let a = CachedRange::new(0, 100);
        assert!(a.touches(&CachedRange::new(100, 10)));
        assert!(a.touches(&CachedRange::new(50, 100)));
        assert!(!a.touches(&CachedRange::new(101, 10)));
        assert_eq!(a.end(), 100);
        assert!(CachedRange::new(5, 0).is_empty());
    }
}
