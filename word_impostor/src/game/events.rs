//! Typed inbound events, decoded once at the router boundary.

use serde::{Deserialize, Serialize};

use super::entities::{ChatId, PlayerId};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    Join {
        #[serde(default)]
        display_name: String,
    },
    Leave,
    Start,
    Abort,
    SubmitClue {
        text: String,
    },
    SubmitGuess {
        text: String,
    },
    CastVote {
        target: PlayerId,
    },
    RevealWordQuery,
}

impl EngineEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Join { .. } => "join",
            EngineEvent::Leave => "leave",
            EngineEvent::Start => "start",
            EngineEvent::Abort => "abort",
            EngineEvent::SubmitClue { .. } => "submit_clue",
            EngineEvent::SubmitGuess { .. } => "submit_guess",
            EngineEvent::CastVote { .. } => "cast_vote",
            EngineEvent::RevealWordQuery => "reveal_word",
        }
    }
}

/// A normalized event addressed to one chat's session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub player_id: PlayerId,
    pub event: EngineEvent,
}

impl InboundEvent {
    pub fn new(chat_id: ChatId, player_id: PlayerId, event: EngineEvent) -> Self {
        Self {
            chat_id,
            player_id,
            event,
        }
    }
}
