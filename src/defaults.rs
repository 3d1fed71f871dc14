//! Default configuration constants for racecall.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

use std::time::Duration;

/// Shortest plausible lap time in seconds.
///
/// Anything faster is treated as decoder noise or a double-trigger on the
/// timing loop and discarded. The pass itself still becomes the reference
/// point for the next lap.
pub const MIN_LAP_SECS: f64 = 10.0;

/// Longest plausible lap time in seconds.
///
/// Anything slower (5 minutes) is treated as a pit stop or an off-track
/// excursion rather than a flying lap.
pub const MAX_LAP_SECS: f64 = 300.0;

/// Window size for the moving lap-time average.
pub const MOVING_AVG_WINDOW: usize = 10;

/// Default event source poll interval.
///
/// The decoder bridge batches passes; polling faster than 1s only burns
/// requests without improving announcement latency noticeably.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default decoder-bridge endpoint for the HTTP event source.
pub const SOURCE_URL: &str = "http://127.0.0.1:5100/api/passes";

/// Bounded announcement queue capacity.
///
/// Speech is far slower than lap ingestion; a small bound keeps
/// announcements close to live instead of buffering a backlog.
pub const ANNOUNCE_QUEUE_CAPACITY: usize = 32;

/// How long the voice worker waits on the queue before re-checking
/// for shutdown.
pub const ANNOUNCE_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Deadline for joining the voice worker during shutdown.
pub const DISPATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum spacing between periodic standings announcements.
pub const ALL_TIMES_INTERVAL: Duration = Duration::from_secs(30);

/// How many leaderboard entries a standings announcement reads out.
pub const STANDINGS_LIMIT: usize = 8;

/// Default speech volume (0.0 to 1.0).
pub const VOICE_VOLUME: f32 = 0.9;

/// Default speaking rate in words per minute.
pub const VOICE_RATE: u32 = 150;

/// Default announcement language.
///
/// The announcement texts are Japanese; engines receive this as the
/// language hint for synthesis.
pub const VOICE_LANGUAGE: &str = "ja";
