//! Lap timing core: pass → lap derivation, rolling statistics and the
//! recency-ordered leaderboard, all behind a single aggregation store.

pub mod leaderboard;
pub mod stats;
pub mod store;
pub mod types;

pub use leaderboard::Leaderboard;
pub use store::TimingStore;
pub use types::{
    LapEvent, LapRecord, LeaderboardRow, PassEvent, TransponderState, TransponderView,
};
