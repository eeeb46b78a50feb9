//! Stats collaborator: receives finished game results and serves player,
//! chat and leaderboard statistics.
//!
//! This module implements:
//! - ResultSink: the narrow interface sessions hand their result to
//! - InMemoryStatsStore: a result history with derived statistics
//! - LeaderboardRefresher: periodic recompute of the sorted leaderboard
//!
//! The refresher only reads recorded results. It never touches live sessions
//! and is not serialized with per-chat operations.

pub mod leaderboard;
pub mod store;

pub use leaderboard::{LeaderboardEntry, LeaderboardRefresher};
pub use store::{ChatStats, InMemoryStatsStore, PlayerStats, ResultSink, StatsError};
