//! In-process byte-range index
//!
//! Tracks which spans of each content id are resident. The byte payload lives
//! with the host player; this type only keeps the bookkeeping the core queries.

use async_trait::async_trait;
use bridge_traits::{
    cache::{ByteRangeCache, CachedRange, ContentId},
    error::Result,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Range index kept in memory.
///
/// Ranges recorded for an id are merged whenever they overlap or touch, so the
/// per-id list stays sorted and disjoint.
#[derive(Debug, Default)]
pub struct MemoryByteRangeCache {
    ranges: RwLock<HashMap<ContentId, Vec<CachedRange>>>,
}

impl MemoryByteRangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `[offset, offset + length)` as resident for `id`.
    pub fn record_range(&self, id: impl Into<ContentId>, offset: u64, length: u64) {
        let id = id.into();
        let incoming = CachedRange::new(offset, length);
        if incoming.is_empty() {
            return;
        }

        let mut ranges = self.ranges.write();
        let spans = ranges.entry(id.clone()).or_default();
        insert_merged(spans, incoming);
        debug!(content_id = %id, offset, length, spans = spans.len(), "Recorded range");
    }

    /// Forget `[offset, offset + length)` for `id`, splitting spans as needed.
    ///
    /// The id disappears from [`ByteRangeCache::keys`] once no span remains.
    pub fn remove_range(&self, id: &ContentId, offset: u64, length: u64) {
        let removed = CachedRange::new(offset, length);
        let mut ranges = self.ranges.write();
        let Some(spans) = ranges.get_mut(id) else {
            return;
        };

        let mut kept = Vec::with_capacity(spans.len() + 1);
        for span in spans.drain(..) {
            if span.end() <= removed.offset || span.offset >= removed.end() {
                kept.push(span);
                continue;
            }
            if span.offset < removed.offset {
                kept.push(CachedRange::new(span.offset, removed.offset - span.offset));
            }
            if span.end() > removed.end() {
                kept.push(CachedRange::new(removed.end(), span.end() - removed.end()));
            }
        }

        if kept.is_empty() {
            ranges.remove(id);
        } else {
            *spans = kept;
        }
    }

    /// Snapshot of the spans recorded for `id`, sorted by offset.
    pub fn ranges(&self, id: &ContentId) -> Vec<CachedRange> {
        self.ranges.read().get(id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ranges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.read().is_empty()
    }
}

fn insert_merged(spans: &mut Vec<CachedRange>, incoming: CachedRange) {
    let mut merged = incoming;
    spans.retain(|span| {
        if span.touches(&merged) {
            let start = span.offset.min(merged.offset);
            let end = span.end().max(merged.end());
            merged = CachedRange::new(start, end - start);
            false
        } else {
            true
        }
    });
    let at = spans
        .iter()
        .position(|span| span.offset > merged.offset)
        .unwrap_or(spans.len());
    spans.insert(at, merged);
}

#[async_trait]
impl ByteRangeCache for MemoryByteRangeCache {
    async fn keys(&self) -> Result<HashSet<ContentId>> {
        Ok(self.ranges.read().keys().cloned().collect())
    }

    async fn is_fully_cached(&self, id: &ContentId, offset: u64, length: u64) -> Result<bool> {
        let wanted = CachedRange::new(offset, length);
        let ranges = self.ranges.read();
        let Some(spans) = ranges.get(id) else {
            return Ok(false);
        };

        // Spans are disjoint and non-touching, so a single one must cover the request.
        Ok(spans
            .iter()
            .any(|span| span.offset <= wanted.offset && span.end() >= wanted.end()))
    }

    async fn evict(&self, id: &ContentId) -> Result<()> {
        if self.ranges.write().remove(id).is_some() {
            debug!(content_id = %id, "Evicted content");
        }
        Ok(())
    }
}
