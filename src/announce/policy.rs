//! Announcement policy: decides what, if anything, gets spoken.
//!
//! Consumes derived lap events and leaderboard snapshots; produces plain
//! announcement texts. It never talks to the dispatcher itself and holds
//! no aggregation state beyond what gating needs (race started, last
//! standings time).

use crate::announce::format::{speech_time, speech_time_coarse};
use crate::defaults;
use crate::timing::{LapEvent, LeaderboardRow};
use std::time::{Duration, Instant};

/// Verbosity and standings toggles, adjustable at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceSettings {
    /// Prefix lap announcements with the car number.
    pub car_numbers: bool,
    /// Prefix lap announcements with the lap number.
    pub lap_numbers: bool,
    /// Enable the periodic standings announcement.
    pub all_times: bool,
    /// Minimum spacing between standings announcements.
    pub all_times_interval: Duration,
}

impl Default for AnnounceSettings {
    fn default() -> Self {
        Self {
            car_numbers: false,
            lap_numbers: false,
            all_times: false,
            all_times_interval: defaults::ALL_TIMES_INTERVAL,
        }
    }
}

#[derive(Debug)]
pub struct AnnouncementPolicy {
    settings: AnnounceSettings,
    race_started: bool,
    last_all_times: Option<Instant>,
}

impl AnnouncementPolicy {
    pub fn new(settings: AnnounceSettings) -> Self {
        Self {
            settings,
            race_started: false,
            last_all_times: None,
        }
    }

    pub fn settings(&self) -> &AnnounceSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AnnounceSettings) {
        self.settings = settings;
    }

    /// Forget race state; the next lap event announces a fresh start.
    pub fn reset(&mut self) {
        self.race_started = false;
        self.last_all_times = None;
    }

    /// Announcements for one newly derived lap.
    ///
    /// The first lap after a reset additionally yields the race-start
    /// announcement. A transponder with voice disabled stays silent but
    /// still marks the race as started.
    pub fn on_new_lap(&mut self, event: &LapEvent) -> Vec<String> {
        let mut texts = Vec::new();

        if !self.race_started {
            self.race_started = true;
            texts.push("レース開始！".to_string());
        }

        if !event.voice_enabled {
            return texts;
        }

        let time_text = speech_time(event.record.lap_time);
        let mut announcement = if event.is_new_best() {
            format!("{time_text}、ベストラップ！")
        } else {
            time_text
        };

        if self.settings.lap_numbers {
            announcement = format!("{}ラップ、{announcement}", event.record.lap_number);
        }
        if self.settings.car_numbers
            && let Some(car) = &event.record.car_number
        {
            announcement = format!("{car}号車、{announcement}");
        }

        texts.push(announcement);
        texts
    }

    /// Periodic standings announcement, or None when gated off.
    ///
    /// Fires at most once per configured interval, only while the race
    /// has started and at least one competitor has a recorded lap. Reads
    /// out up to eight entries ordered by laps completed, best lap as
    /// the tie-break.
    pub fn standings(&mut self, rows: &[LeaderboardRow], now: Instant) -> Option<String> {
        if !self.settings.all_times || !self.race_started {
            return None;
        }
        if let Some(last) = self.last_all_times
            && now.duration_since(last) < self.settings.all_times_interval
        {
            return None;
        }

        let mut active: Vec<&LeaderboardRow> =
            rows.iter().filter(|r| r.lap_count > 0).collect();
        if active.is_empty() {
            return None;
        }

        active.sort_by(|a, b| {
            b.lap_count.cmp(&a.lap_count).then_with(|| {
                let a_best = a.best_lap_time.unwrap_or(f64::MAX);
                let b_best = b.best_lap_time.unwrap_or(f64::MAX);
                a_best.total_cmp(&b_best)
            })
        });

        let entries: Vec<String> = active
            .iter()
            .take(defaults::STANDINGS_LIMIT)
            .enumerate()
            .map(|(i, row)| {
                let position = i + 1;
                match row.best_lap_time {
                    Some(best) => format!(
                        "{position}位、{}ラップ、ベスト{}",
                        row.lap_count,
                        speech_time_coarse(best)
                    ),
                    None => format!("{position}位、{}ラップ", row.lap_count),
                }
            })
            .collect();

        self.last_all_times = Some(now);
        Some(format!("現在の順位、{}", entries.join("、")))
    }

    /// Explicit race-finish announcement.
    pub fn race_finish(&self) -> String {
        "レース終了！".to_string()
    }

    /// Explicit position-change announcement for positions 1 through 8.
    pub fn position_change(&self, position: usize) -> Option<String> {
        if (1..=defaults::STANDINGS_LIMIT).contains(&position) {
            Some(format!("{position}位に上がりました！"))
        } else {
            None
        }
    }

    /// Fixed self-check utterance for the voice test command.
    pub fn voice_test(&self) -> String {
        "音声テスト。ラップタイマーシステムが正常に動作しています。".to_string()
    }
}
