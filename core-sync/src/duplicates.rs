//! Duplicate detection and resolution policies

use core_library::ContentId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How to proceed when some candidates are already in the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Insert only the candidates that are not members yet
    SkipDuplicates,

    /// Insert every candidate, allowing repeated membership
    InsertAnyway,

    /// Insert nothing
    Cancel,
}

impl DuplicatePolicy {
    /// Split `candidates` into the ids to insert and the ids left out, both
    /// in candidate order.
    pub fn partition(
        &self,
        candidates: &[ContentId],
        duplicates: &DuplicateSet,
    ) -> (Vec<ContentId>, Vec<ContentId>) {
        match self {
            DuplicatePolicy::InsertAnyway => (candidates.to_vec(), Vec::new()),
            DuplicatePolicy::Cancel => (Vec::new(), candidates.to_vec()),
            DuplicatePolicy::SkipDuplicates => candidates
                .iter()
                .cloned()
                .partition(|id| !duplicates.contains(id)),
        }
    }
}

/// Candidate ids that are already members of the target playlist.
///
/// Computed fresh for every attempt and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateSet {
    ids: HashSet<ContentId>,
}

impl DuplicateSet {
    /// Intersect `candidates` with the playlist's existing members.
    pub fn between(candidates: &[ContentId], existing: &HashSet<ContentId>) -> Self {
        Self {
            ids: candidates
                .iter()
                .filter(|id| existing.contains(*id))
                .cloned()
                .collect(),
        }
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentId> {
        self.ids.iter()
    }

    /// Ids in a stable order, for display.
    pub fn sorted(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}
