//! Single-lock aggregation store.
//!
//! Owns all transponder state, the leaderboard index and the ingestion
//! cursor behind one mutex: ingestion mutates under the lock, dashboard
//! queries copy snapshots out under the same lock, so no torn reads are
//! observable. Nothing here performs I/O while the lock is held.

use crate::defaults;
use crate::timing::leaderboard::Leaderboard;
use crate::timing::stats;
use crate::timing::types::{
    LapEvent, LapRecord, LeaderboardRow, PassEvent, TransponderState, TransponderView,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct StoreInner {
    transponders: HashMap<u32, TransponderState>,
    leaderboard: Leaderboard,
    /// High-water mark: rtc_time of the most recently ingested pass.
    /// None until the first pass is processed.
    cursor: Option<u64>,
}

/// The aggregation core: pass ingestion, statistics, leaderboard, queries.
#[derive(Debug)]
pub struct TimingStore {
    inner: Mutex<StoreInner>,
    min_lap_secs: f64,
    max_lap_secs: f64,
}

impl Default for TimingStore {
    fn default() -> Self {
        Self::new(defaults::MIN_LAP_SECS, defaults::MAX_LAP_SECS)
    }
}

impl TimingStore {
    pub fn new(min_lap_secs: f64, max_lap_secs: f64) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            min_lap_secs,
            max_lap_secs,
        }
    }

    /// Ingest a batch of pass events, deriving laps and updating statistics
    /// and the leaderboard. Returns the newly created laps in order.
    ///
    /// Events at or below the cursor are skipped (idempotence guard). A
    /// pass whose elapsed time falls outside the plausibility window
    /// produces no lap but still becomes the transponder's new reference
    /// point for the next lap.
    pub fn ingest(&self, events: &[PassEvent]) -> Vec<LapEvent> {
        let mut inner = self.lock();
        let mut new_laps = Vec::new();

        for event in events {
            if inner.cursor.is_some_and(|c| event.rtc_time <= c) {
                continue;
            }

            let state = inner
                .transponders
                .entry(event.transponder_id)
                .or_insert_with(|| TransponderState::new(event.transponder_id));

            if event.car_number.is_some() {
                state.car_number = event.car_number.clone();
            }

            let prev_pass = state.last_pass_time;
            state.last_pass_time = Some(event.rtc_time);

            if let Some(prev) = prev_pass {
                let lap_secs = (event.rtc_time.saturating_sub(prev)) as f64 / 1_000_000.0;
                if lap_secs > self.min_lap_secs && lap_secs < self.max_lap_secs {
                    let prev_best = stats::best_lap(&state.lap_times);

                    state.lap_times.push(lap_secs);
                    let record = LapRecord {
                        transponder_id: event.transponder_id,
                        lap_number: state.lap_times.len() as u32,
                        lap_time: lap_secs,
                        timestamp: event.rtc_time,
                        car_number: state.car_number.clone(),
                    };
                    state.laps.push(record.clone());

                    let best = stats::best_lap(&state.lap_times)
                        .unwrap_or(lap_secs);
                    state.best_lap = Some(best);
                    state.moving_avg_10 = stats::moving_avg_10(&state.lap_times);
                    state.std_dev = stats::std_dev(&state.lap_times);

                    new_laps.push(LapEvent {
                        record: record.clone(),
                        prev_best,
                        best,
                        lap_count: state.lap_count(),
                        voice_enabled: state.voice_enabled,
                    });
                    inner.leaderboard.update(record);
                }
            }

            inner.cursor = Some(inner.cursor.map_or(event.rtc_time, |c| c.max(event.rtc_time)));
        }

        new_laps
    }

    /// The `since` value for the next event-source fetch.
    pub fn cursor(&self) -> u64 {
        self.lock().cursor.unwrap_or(0)
    }

    /// Leaderboard rows (recency order, newest lap first) joined with each
    /// transponder's current statistics.
    pub fn snapshot_leaderboard(&self) -> Vec<LeaderboardRow> {
        let inner = self.lock();
        inner
            .leaderboard
            .snapshot()
            .into_iter()
            .filter_map(|entry| {
                let state = inner.transponders.get(&entry.transponder_id)?;
                Some(LeaderboardRow {
                    transponder_id: state.transponder_id,
                    car_number: state.car_number.clone(),
                    nickname: state.nickname.clone(),
                    lap_count: state.lap_count(),
                    last_lap_time: state.latest_lap().map(|l| l.lap_time),
                    best_lap_time: state.best_lap,
                    moving_avg_10: state.moving_avg_10,
                    std_dev: state.std_dev,
                    last_activity: state.last_pass_time.unwrap_or(0),
                })
            })
            .collect()
    }

    /// Full state view for one transponder, or None when never seen.
    pub fn snapshot_transponder(&self, transponder_id: u32) -> Option<TransponderView> {
        let inner = self.lock();
        inner.transponders.get(&transponder_id).map(|state| TransponderView {
            transponder_id: state.transponder_id,
            car_number: state.car_number.clone(),
            nickname: state.nickname.clone(),
            lap_count: state.lap_count(),
            laps: state.laps.clone(),
            best_lap: state.best_lap,
            moving_avg_10: state.moving_avg_10,
            std_dev: state.std_dev,
            last_pass_time: state.last_pass_time.unwrap_or(0),
            voice_enabled: state.voice_enabled,
        })
    }

    /// Race reset: clears all transponder state and the leaderboard.
    ///
    /// The cursor is kept — already-processed passes belong to the old
    /// race and must not re-derive laps on the next poll.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.transponders.clear();
        inner.leaderboard.reset();
    }

    /// Toggle spoken announcements for one transponder. Creates the state
    /// if the transponder has not been seen yet, so the setting survives
    /// until its first pass.
    pub fn set_voice_enabled(&self, transponder_id: u32, enabled: bool) {
        let mut inner = self.lock();
        inner
            .transponders
            .entry(transponder_id)
            .or_insert_with(|| TransponderState::new(transponder_id))
            .voice_enabled = enabled;
    }

    /// Assign a display nickname. Creates the state if missing, like
    /// [`Self::set_voice_enabled`].
    pub fn set_nickname(&self, transponder_id: u32, nickname: &str) {
        let mut inner = self.lock();
        let state = inner
            .transponders
            .entry(transponder_id)
            .or_insert_with(|| TransponderState::new(transponder_id));
        state.nickname = if nickname.is_empty() {
            None
        } else {
            Some(nickname.to_string())
        };
    }

    /// Number of transponders with at least one recorded lap.
    pub fn active_count(&self) -> usize {
        self.lock()
            .transponders
            .values()
            .filter(|s| !s.laps.is_empty())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        // A poisoned lock means an ingest or query panicked; the state
        // itself is a plain value type, so continue with it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: u64 = 1_000_000;

    fn pass(transponder_id: u32, rtc_secs: f64) -> PassEvent {
        PassEvent {
            transponder_id,
            rtc_time: (rtc_secs * SEC as f64) as u64,
            decoder_id: 1,
            strength: 80,
            car_number: None,
        }
    }

    fn pass_with_car(transponder_id: u32, rtc_secs: f64, car: &str) -> PassEvent {
        PassEvent {
            car_number: Some(car.to_string()),
            ..pass(transponder_id, rtc_secs)
        }
    }

    #[test]
    fn first_pass_derives_no_lap() {
        let store = TimingStore::default();
        let laps = store.ingest(&[pass(42, 100.0)]);
        assert!(laps.is_empty());

        let view = store.snapshot_transponder(42).unwrap();
        assert_eq!(view.lap_count, 0);
        assert_eq!(view.last_pass_time, 100 * SEC);
    }

    #[test]
    fn consecutive_passes_derive_laps_and_stats() {
        // Passes at t=0, t=15.0s, t=27.5s → laps [15.0, 12.5],
        // best 12.5, moving average 13.75
        let store = TimingStore::default();
        let laps = store.ingest(&[pass(42, 0.0), pass(42, 15.0), pass(42, 27.5)]);

        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].record.lap_time, 15.0);
        assert_eq!(laps[1].record.lap_time, 12.5);
        assert_eq!(laps[1].record.lap_number, 2);

        let view = store.snapshot_transponder(42).unwrap();
        assert_eq!(view.best_lap, Some(12.5));
        assert!((view.moving_avg_10 - 13.75).abs() < 1e-9);
    }

    #[test]
    fn short_pass_rejected_but_advances_reference() {
        // Passes at t=0, t=5.0s: no lap, no best, last_pass_time = 5.0s
        let store = TimingStore::default();
        let laps = store.ingest(&[pass(42, 0.0), pass(42, 5.0)]);

        assert!(laps.is_empty());
        let view = store.snapshot_transponder(42).unwrap();
        assert_eq!(view.lap_count, 0);
        assert_eq!(view.best_lap, None);
        assert_eq!(view.last_pass_time, 5 * SEC);

        // Next pass measures from the rejected one: 5.0 → 17.0 is a 12s lap
        let laps = store.ingest(&[pass(42, 17.0)]);
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].record.lap_time, 12.0);
    }

    #[test]
    fn lap_bounds_are_exclusive() {
        let store = TimingStore::default();
        // Exactly 10.0s: rejected
        store.ingest(&[pass(1, 0.0), pass(1, 10.0)]);
        assert_eq!(store.snapshot_transponder(1).unwrap().lap_count, 0);

        // Exactly 300.0s from the last reference (10.0 → 310.0): rejected
        store.ingest(&[pass(1, 310.0)]);
        assert_eq!(store.snapshot_transponder(1).unwrap().lap_count, 0);

        // 10.001s: accepted
        let laps = store.ingest(&[pass(1, 320.001)]);
        assert_eq!(laps.len(), 1);
    }

    #[test]
    fn overlong_gap_treated_as_pit_stop() {
        let store = TimingStore::default();
        let laps = store.ingest(&[pass(7, 0.0), pass(7, 400.0), pass(7, 412.0)]);
        // 400s gap discarded; 12s lap measured from the pit-exit pass
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].record.lap_time, 12.0);
    }

    #[test]
    fn idempotence_guard_skips_processed_events() {
        let store = TimingStore::default();
        let batch = vec![pass(42, 0.0), pass(42, 15.0)];
        let first = store.ingest(&batch);
        assert_eq!(first.len(), 1);

        // Re-ingesting the same batch changes nothing
        let second = store.ingest(&batch);
        assert!(second.is_empty());
        let view = store.snapshot_transponder(42).unwrap();
        assert_eq!(view.lap_count, 1);
        assert_eq!(store.cursor(), 15 * SEC);
    }

    #[test]
    fn cursor_advances_to_batch_max() {
        let store = TimingStore::default();
        store.ingest(&[pass(1, 3.0), pass(2, 7.0), pass(1, 5.0)]);
        assert_eq!(store.cursor(), 7 * SEC);
    }

    #[test]
    fn cursor_advances_even_for_rejected_laps() {
        let store = TimingStore::default();
        store.ingest(&[pass(1, 0.0), pass(1, 2.0)]);
        assert_eq!(store.cursor(), 2 * SEC);
    }

    #[test]
    fn leaderboard_size_matches_transponders_with_laps() {
        let store = TimingStore::default();
        store.ingest(&[
            pass(1, 0.0),
            pass(2, 1.0),
            pass(3, 2.0),
            pass(1, 12.0),
            pass(2, 14.0),
        ]);
        // Transponder 3 has a pass but no lap
        assert_eq!(store.snapshot_leaderboard().len(), 2);
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn leaderboard_entry_tracks_latest_lap() {
        let store = TimingStore::default();
        store.ingest(&[pass(1, 0.0), pass(1, 12.0), pass(1, 25.0)]);

        let rows = store.snapshot_leaderboard();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lap_count, 2);
        assert_eq!(rows[0].last_lap_time, Some(13.0));
        assert_eq!(rows[0].best_lap_time, Some(12.0));
    }

    #[test]
    fn leaderboard_recency_order() {
        let store = TimingStore::default();
        store.ingest(&[
            pass(1, 0.0),
            pass(2, 1.0),
            pass(1, 12.0),
            pass(2, 14.0),
        ]);
        let rows = store.snapshot_leaderboard();
        // Transponder 2 lapped most recently
        assert_eq!(rows[0].transponder_id, 2);
        assert_eq!(rows[1].transponder_id, 1);
    }

    #[test]
    fn best_lap_monotone_over_ingest() {
        let store = TimingStore::default();
        let times = [0.0, 15.0, 27.5, 41.0, 52.9, 65.0];
        let mut prev_best = f64::INFINITY;
        for t in times {
            store.ingest(&[pass(9, t)]);
            if let Some(best) = store.snapshot_transponder(9).unwrap().best_lap {
                assert!(best <= prev_best);
                prev_best = best;
            }
        }
        assert_eq!(prev_best, 11.9);
    }

    #[test]
    fn lap_event_reports_best_transition() {
        let store = TimingStore::default();
        let laps = store.ingest(&[pass(5, 0.0), pass(5, 15.0), pass(5, 27.5), pass(5, 41.5)]);
        assert_eq!(laps.len(), 3);

        // 15.0: first lap, always a new best
        assert!(laps[0].is_new_best());
        // 12.5: improvement
        assert!(laps[1].is_new_best());
        assert_eq!(laps[1].prev_best, Some(15.0));
        // 14.0: no improvement
        assert!(!laps[2].is_new_best());
        assert_eq!(laps[2].best, 12.5);
    }

    #[test]
    fn car_number_propagates_from_pass_to_lap() {
        let store = TimingStore::default();
        let laps = store.ingest(&[
            pass_with_car(3, 0.0, "11"),
            pass_with_car(3, 13.0, "11"),
        ]);
        assert_eq!(laps[0].record.car_number.as_deref(), Some("11"));
        let rows = store.snapshot_leaderboard();
        assert_eq!(rows[0].car_number.as_deref(), Some("11"));
    }

    #[test]
    fn reset_clears_state_but_keeps_cursor() {
        let store = TimingStore::default();
        store.ingest(&[pass(1, 0.0), pass(1, 12.0)]);
        let cursor = store.cursor();
        store.reset();

        assert!(store.snapshot_leaderboard().is_empty());
        assert!(store.snapshot_transponder(1).is_none());
        assert_eq!(store.cursor(), cursor);

        // Old events do not come back after reset
        let laps = store.ingest(&[pass(1, 12.0)]);
        assert!(laps.is_empty());
    }

    #[test]
    fn voice_enabled_survives_until_first_pass() {
        let store = TimingStore::default();
        store.set_voice_enabled(8, false);

        let laps = store.ingest(&[pass(8, 0.0), pass(8, 12.0)]);
        assert_eq!(laps.len(), 1);
        assert!(!laps[0].voice_enabled);
    }

    #[test]
    fn set_nickname_roundtrip() {
        let store = TimingStore::default();
        store.set_nickname(4, "Taro");
        store.ingest(&[pass(4, 0.0), pass(4, 12.0)]);

        let rows = store.snapshot_leaderboard();
        assert_eq!(rows[0].nickname.as_deref(), Some("Taro"));

        store.set_nickname(4, "");
        assert_eq!(store.snapshot_transponder(4).unwrap().nickname, None);
    }

    #[test]
    fn snapshot_unknown_transponder_is_none() {
        let store = TimingStore::default();
        assert!(store.snapshot_transponder(999).is_none());
    }

    #[test]
    fn concurrent_readers_see_consistent_snapshots() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(TimingStore::default());
        let mut writers = Vec::new();
        let mut readers = Vec::new();

        let writer_store = store.clone();
        writers.push(thread::spawn(move || {
            for i in 0..200u64 {
                let t = i as f64 * 12.0;
                writer_store.ingest(&[pass(1, t), pass(2, t + 0.5)]);
            }
        }));

        for _ in 0..4 {
            let reader_store = store.clone();
            readers.push(thread::spawn(move || {
                for _ in 0..200 {
                    let rows = reader_store.snapshot_leaderboard();
                    for row in &rows {
                        // Stats in a row must be internally consistent:
                        // a row only exists for transponders with laps.
                        assert!(row.lap_count >= 1);
                        assert!(row.best_lap_time.is_some());
                        assert!(row.last_lap_time.is_some());
                        assert!(
                            row.best_lap_time.unwrap() <= row.last_lap_time.unwrap() + 1e-9
                        );
                    }
                    assert!(rows.len() <= 2);
                }
            }));
        }

        for h in writers {
            h.join().unwrap();
        }
        for h in readers {
            h.join().unwrap();
        }

        assert_eq!(store.snapshot_leaderboard().len(), 2);
    }
}
