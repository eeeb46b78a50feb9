//! Outbound display intents. The engine never renders text; the router turns
//! these into localized platform messages.

use serde::Serialize;

use super::entities::{ChatId, PlayerId};
use super::errors::SessionError;
use super::scoring::GameResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "to", content = "player", rename_all = "snake_case")]
pub enum Audience {
    Broadcast,
    Player(PlayerId),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    PlayerJoined {
        player: PlayerId,
        name: String,
        roster_size: usize,
    },
    PlayerLeft {
        player: PlayerId,
        roster_size: usize,
    },
    GameStarted {
        players: Vec<PlayerId>,
        language: String,
        deck_id: String,
    },
    WordReveal {
        word: String,
    },
    TurnStarted {
        player: PlayerId,
        round: u32,
        tiebreak: bool,
    },
    ClueAccepted {
        player: PlayerId,
        text: String,
    },
    VotingOpened {
        candidates: Vec<PlayerId>,
        tiebreak: bool,
    },
    VoteCast {
        voter: PlayerId,
        target: PlayerId,
        pending: usize,
    },
    TiebreakStarted {
        candidates: Vec<PlayerId>,
    },
    PlayerEliminated {
        player: PlayerId,
        was_impostor: bool,
        votes: u32,
    },
    NoElimination {
        candidates: Vec<PlayerId>,
    },
    WordGuessed {
        player: PlayerId,
        word: String,
    },
    GameOver {
        result: Box<GameResult>,
    },
    SuppressMessage {
        player: PlayerId,
    },
    /// Private notice to a player who asked to hear about the next game
    NextGameOpened,
    Error {
        error: SessionError,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayIntent {
    pub chat_id: ChatId,
    pub audience: Audience,
    pub content: Content,
    /// Ask the transport to pin the delivered message
    pub pin: bool,
}

impl DisplayIntent {
    pub fn broadcast(chat_id: ChatId, content: Content) -> Self {
        Self {
            chat_id,
            audience: Audience::Broadcast,
            content,
            pin: false,
        }
    }

    pub fn private(chat_id: ChatId, player: PlayerId, content: Content) -> Self {
        Self {
            chat_id,
            audience: Audience::Player(player),
            content,
            pin: false,
        }
    }

    /// Intent reporting `error` back to the acting player.
    pub fn error(chat_id: ChatId, player: PlayerId, error: SessionError) -> Self {
        Self::private(chat_id, player, Content::Error { error })
    }

    pub fn pinned(mut self, pin: bool) -> Self {
        self.pin = pin;
        self
    }
}
