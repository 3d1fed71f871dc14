//! Recency-ordered leaderboard index.
//!
//! Holds each transponder's most recent lap, newest first. This is a
//! recency view, not a ranking — position by performance is computed by
//! readers (and by the standings announcement) from the snapshot.

use crate::timing::types::LapRecord;

#[derive(Debug, Default)]
pub struct Leaderboard {
    entries: Vec<LapRecord>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transponder's entry with `lap` and restore descending
    /// timestamp order.
    ///
    /// The new entry is inserted at the front before the stable sort, so
    /// among equal timestamps the most recently inserted entry wins.
    pub fn update(&mut self, lap: LapRecord) {
        self.entries
            .retain(|e| e.transponder_id != lap.transponder_id);
        self.entries.insert(0, lap);
        self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Immutable copy for readers; never exposes the live structure.
    pub fn snapshot(&self) -> Vec<LapRecord> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
