//! racecall - live voice race commentary for transponder lap timing
//!
//! Ingests decoded transponder passes, derives laps and rolling
//! statistics, keeps a recency-ordered leaderboard and speaks Japanese
//! commentary through a fallback chain of TTS engines.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod announce;
pub mod app;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod ingest;
pub mod source;
pub mod speech;
pub mod timing;

// Core traits (source → aggregate → announce → speak)
pub use source::EventSource;
pub use speech::SpeechBackend;

// Aggregation core
pub use timing::{LapEvent, LapRecord, LeaderboardRow, PassEvent, TimingStore, TransponderView};

// Announcement side
pub use announce::{AnnounceSettings, AnnouncementPolicy, DispatcherState, VoiceDispatcher};

// Composition root
pub use app::RaceService;

// Error handling
pub use error::{RacecallError, Result};

// Config
pub use config::{Config, EnginePreference};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
