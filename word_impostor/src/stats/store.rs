//! Result history and derived statistics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use super::leaderboard::{LeaderboardEntry, rank_players};
use crate::game::{
    entities::{ChatId, PlayerId, Role},
    scoring::{GameResult, Outcome},
    voting::Winner,
};

/// Stats errors
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats store unavailable: {0}")]
    Unavailable(String),

    #[error("result for game {0} already recorded")]
    DuplicateResult(uuid::Uuid),
}

/// Destination for finished game results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: GameResult) -> Result<(), StatsError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub name: String,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub impostor_games: u32,
    pub impostor_wins: u32,
    pub tournament_wins: u32,
    pub score: i64,
}

impl PlayerStats {
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatStats {
    pub chat_id: ChatId,
    pub games: u32,
    pub defender_wins: u32,
    pub impostor_wins: u32,
    pub aborted: u32,
}

/// Folds every non-aborted result into per-player statistics.
pub(crate) fn player_stats_from(results: &[GameResult]) -> HashMap<PlayerId, PlayerStats> {
    let mut stats: HashMap<PlayerId, PlayerStats> = HashMap::new();
    for result in results.iter().filter(|r| !r.is_aborted()) {
        for player in &result.players {
            let entry = stats.entry(player.id).or_insert_with(|| PlayerStats {
                player_id: player.id,
                ..Default::default()
            });
            // Latest display name wins.
            entry.name = player.name.clone();
            entry.games += 1;
            entry.score += i64::from(player.score_delta);
            if player.role == Some(Role::Impostor) {
                entry.impostor_games += 1;
            }
            match player.outcome {
                Outcome::Win => {
                    entry.wins += 1;
                    if player.role == Some(Role::Impostor) {
                        entry.impostor_wins += 1;
                    }
                    if result.tournament {
                        entry.tournament_wins += 1;
                    }
                }
                Outcome::Loss => entry.losses += 1,
                Outcome::Aborted => {}
            }
        }
    }
    stats
}

/// In-memory result history standing in for the persistent stats store.
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    results: RwLock<Vec<GameResult>>,
    leaderboard: RwLock<Vec<LeaderboardEntry>>,
    refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self) -> Vec<GameResult> {
        self.results.read().await.clone()
    }

    pub async fn result_count(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn player_stats(&self, player_id: PlayerId) -> Option<PlayerStats> {
        let results = self.results.read().await;
        player_stats_from(&results).remove(&player_id)
    }

    pub async fn chat_stats(&self, chat_id: ChatId) -> ChatStats {
        let results = self.results.read().await;
        let mut stats = ChatStats {
            chat_id,
            ..Default::default()
        };
        for result in results.iter().filter(|r| r.chat_id == chat_id) {
            stats.games += 1;
            match result.winner {
                Some(Winner::Defenders) => stats.defender_wins += 1,
                Some(Winner::Impostor) => stats.impostor_wins += 1,
                None => stats.aborted += 1,
            }
        }
        stats
    }

    /// Recomputes the sorted leaderboard from the recorded history.
    pub async fn reload_sorted_players(&self) -> usize {
        let ranked = {
            let results = self.results.read().await;
            rank_players(player_stats_from(&results).into_values())
        };
        let count = ranked.len();
        *self.leaderboard.write().await = ranked;
        *self.refreshed_at.write().await = Some(Utc::now());
        log::debug!("Leaderboard reloaded with {} players", count);
        count
    }

    /// Top `limit` entries of the last computed leaderboard.
    pub async fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.refreshed_at.read().await
    }
}

#[async_trait]
impl ResultSink for InMemoryStatsStore {
    async fn record(&self, result: GameResult) -> Result<(), StatsError> {
        let mut results = self.results.write().await;
        if results.iter().any(|r| r.game_id == result.game_id) {
            return Err(StatsError::DuplicateResult(result.game_id));
        }
        log::debug!(
            "Recorded result of game {} in chat {}",
            result.game_id,
            result.chat_id
        );
        results.push(result);
        Ok(())
    }
}
