//! Score computation and the immutable result record handed to stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::constants::{CORRECT_ELIMINATION_BONUS, DEFENDER_WIN_BONUS, IMPOSTOR_WIN_BONUS};
use super::entities::{ChatId, PlayerId, Role, Roster, WordPair};
use super::voting::Winner;

/// Why a game ended.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    ImpostorEliminated,
    ImpostorSurvived,
    WordGuessed { by: PlayerId },
    Aborted { by: PlayerId },
    /// Removed from the registry while still running
    Closed,
    InternalError,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Aborted,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerResult {
    pub id: PlayerId,
    pub name: String,
    /// `None` when the game ended before words were assigned.
    pub role: Option<Role>,
    pub alive: bool,
    pub outcome: Outcome,
    pub score_delta: i32,
}

/// Emitted exactly once per game, then handed to the stats collaborator.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameResult {
    pub game_id: Uuid,
    pub chat_id: ChatId,
    pub pair: Option<WordPair>,
    pub winner: Option<Winner>,
    pub reason: EndReason,
    pub players: Vec<PlayerResult>,
    pub rounds: u32,
    pub tournament: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
}

impl GameResult {
    pub fn is_aborted(&self) -> bool {
        self.winner.is_none()
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn total_score(&self) -> i32 {
        self.players.iter().map(|p| p.score_delta).sum()
    }
}

/// Score deltas for every rostered player.
///
/// `eliminating_voters` are the players whose vote eliminated the impostor;
/// it is empty unless the game ended that way.
pub fn score_deltas(
    roster: &Roster,
    winner: Option<Winner>,
    eliminating_voters: &[PlayerId],
) -> HashMap<PlayerId, i32> {
    let mut deltas: HashMap<PlayerId, i32> = roster.iter().map(|p| (p.id, 0)).collect();
    let Some(winner) = winner else {
        return deltas;
    };

    for player in roster.iter() {
        let delta = deltas.entry(player.id).or_insert(0);
        match (winner, player.role()) {
            (Winner::Defenders, Some(Role::Defender)) => *delta += DEFENDER_WIN_BONUS,
            (Winner::Impostor, Some(Role::Impostor)) => *delta += IMPOSTOR_WIN_BONUS,
            _ => {}
        }
    }

    if winner == Winner::Defenders {
        for voter in eliminating_voters {
            if roster.get(*voter).is_some_and(|p| p.role() == Some(Role::Defender)) {
                *deltas.entry(*voter).or_insert(0) += CORRECT_ELIMINATION_BONUS;
            }
        }
    }

    deltas
}

/// Per-player outcome given the winning side.
pub fn player_outcome(role: Option<Role>, winner: Option<Winner>) -> Outcome {
    match (winner, role) {
        (None, _) | (_, None) => Outcome::Aborted,
        (Some(Winner::Defenders), Some(Role::Defender))
        | (Some(Winner::Impostor), Some(Role::Impostor)) => Outcome::Win,
        _ => Outcome::Loss,
    }
}
