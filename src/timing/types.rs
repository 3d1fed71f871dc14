//! Core data types for the lap timing pipeline.

use serde::{Deserialize, Serialize};

/// A single decoded transponder detection from the timing loop.
///
/// Produced by the event source; immutable. `rtc_time` is the decoder's
/// monotonic clock in microseconds. Ordering within a transponder is
/// non-decreasing in `rtc_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassEvent {
    pub transponder_id: u32,
    pub rtc_time: u64,
    pub decoder_id: u32,
    #[serde(default)]
    pub strength: u16,
    #[serde(default)]
    pub car_number: Option<String>,
}

/// One completed, plausibility-filtered lap.
///
/// Immutable once created. `timestamp` is the `rtc_time` of the pass that
/// closed the lap, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub transponder_id: u32,
    /// 1-based, sequential per transponder
    pub lap_number: u32,
    pub lap_time: f64,
    pub timestamp: u64,
    pub car_number: Option<String>,
}

/// Per-competitor aggregation state.
///
/// Created on the first observed pass for a transponder, mutated only by
/// ingestion, cleared only by an explicit race reset.
#[derive(Debug, Clone, Default)]
pub struct TransponderState {
    pub transponder_id: u32,
    pub car_number: Option<String>,
    pub nickname: Option<String>,
    pub last_pass_time: Option<u64>,
    pub lap_times: Vec<f64>,
    pub laps: Vec<LapRecord>,
    pub best_lap: Option<f64>,
    pub moving_avg_10: f64,
    pub std_dev: f64,
    pub voice_enabled: bool,
}

impl TransponderState {
    pub fn new(transponder_id: u32) -> Self {
        Self {
            transponder_id,
            voice_enabled: true,
            ..Default::default()
        }
    }

    pub fn lap_count(&self) -> u32 {
        self.laps.len() as u32
    }

    pub fn latest_lap(&self) -> Option<&LapRecord> {
        self.laps.last()
    }
}

/// A newly derived lap together with the statistics transition it caused.
///
/// `prev_best`/`best` are the transponder's best lap before and after this
/// lap was recorded; downstream policy decides "new best" by comparing
/// them instead of tracking its own flags.
#[derive(Debug, Clone, PartialEq)]
pub struct LapEvent {
    pub record: LapRecord,
    pub prev_best: Option<f64>,
    pub best: f64,
    pub lap_count: u32,
    pub voice_enabled: bool,
}

impl LapEvent {
    /// True when this lap set a new best for its transponder.
    pub fn is_new_best(&self) -> bool {
        self.prev_best != Some(self.best) && self.best == self.record.lap_time
    }
}

/// One leaderboard row as handed to dashboard readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub transponder_id: u32,
    pub car_number: Option<String>,
    pub nickname: Option<String>,
    pub lap_count: u32,
    pub last_lap_time: Option<f64>,
    pub best_lap_time: Option<f64>,
    pub moving_avg_10: f64,
    pub std_dev: f64,
    /// Microsecond timestamp of the most recent pass
    pub last_activity: u64,
}

/// Full per-transponder view for the detail query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransponderView {
    pub transponder_id: u32,
    pub car_number: Option<String>,
    pub nickname: Option<String>,
    pub lap_count: u32,
    pub laps: Vec<LapRecord>,
    pub best_lap: Option<f64>,
    pub moving_avg_10: f64,
    pub std_dev: f64,
    pub last_pass_time: u64,
    pub voice_enabled: bool,
}
