use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::MAX_USER_INPUT_LENGTH;

/// Chat identifier as handed over by the router. Group chats are negative
/// on most platforms, so this is signed.
pub type ChatId = i64;

/// Platform user identifier.
pub type PlayerId = i64;

/// Stable identifier of a word pair within the word bank.
pub type PairId = String;

/// Truncates user-supplied text and strips surrounding whitespace.
pub fn sanitize_input(s: &str) -> String {
    s.trim().chars().take(MAX_USER_INPUT_LENGTH).collect()
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Defender,
    Impostor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Defender => "defender",
            Self::Impostor => "impostor",
        };
        write!(f, "{repr}")
    }
}

/// A common word and its distinct impostor counterpart. Selected once per
/// game and never mutated afterwards.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct WordPair {
    pub id: PairId,
    pub language: String,
    pub deck_id: String,
    pub common: String,
    pub impostor: String,
}

/// The word handed to a player together with the role it implies.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Assignment {
    pub role: Role,
    pub word: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Set exactly once during role assignment.
    pub(crate) assignment: Option<Assignment>,
    pub alive: bool,
    /// Votes received in the ballot currently being tallied.
    pub votes_received: u32,
    pub score_delta: i32,
}

impl Player {
    pub fn new(id: PlayerId, name: &str) -> Self {
        let mut name = sanitize_input(name);
        if name.is_empty() {
            name = id.to_string();
        }
        Self {
            id,
            name,
            assignment: None,
            alive: true,
            votes_received: 0,
            score_delta: 0,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.assignment.as_ref().map(|a| a.role)
    }

    pub fn is_impostor(&self) -> bool {
        self.role() == Some(Role::Impostor)
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Ordered participants of one session. Insertion order is the turn order
/// captured when the game starts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.alive)
    }

    pub(crate) fn push(&mut self, player: Player) {
        self.players.push(player);
    }

    pub(crate) fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.alive().map(|p| p.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    pub fn impostor(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_impostor())
    }

    /// Alive players in roster order, rotated left by `offset` positions of
    /// the full roster. Eliminated players keep their slot in the rotation
    /// so that the order stays stable across cycles.
    pub fn turn_order(&self, offset: usize) -> Vec<PlayerId> {
        if self.players.is_empty() {
            return vec![];
        }
        let n = self.players.len();
        (0..n)
            .map(|i| &self.players[(i + offset) % n])
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect()
    }

    pub(crate) fn reset_votes_received(&mut self) {
        for player in &mut self.players {
            player.votes_received = 0;
        }
    }
}

/// A clue accepted during a clue cycle.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Clue {
    pub player: PlayerId,
    pub text: String,
}

/// Externally visible lifecycle phase of a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    RoleAssignment,
    ClueRound,
    Voting,
    Tiebreak,
    Scoring,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::RoleAssignment => "role assignment",
            Self::ClueRound => "clue round",
            Self::Voting => "voting",
            Self::Tiebreak => "tiebreak",
            Self::Scoring => "scoring",
            Self::Terminated => "terminated",
        };
        write!(f, "{repr}")
    }
}
