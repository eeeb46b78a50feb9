//! Messages exchanged with a session actor.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::game::{
    ChatId, DisplayIntent, EngineEvent, GameResult, PairId, PlayerId, SessionResult, SessionSnapshot,
};

/// Requests accepted by a session actor
#[derive(Debug)]
pub enum SessionMessage {
    /// Apply one engine event from a player
    Event {
        player: PlayerId,
        event: EngineEvent,
        response: oneshot::Sender<SessionReply>,
    },

    /// Read-only status view
    Snapshot {
        response: oneshot::Sender<SessionSnapshot>,
    },

    /// Tear the session down, terminating any game in progress
    Close {
        response: oneshot::Sender<SessionReply>,
    },

    /// Re-key the session to a migrated chat id
    Migrate {
        chat_id: ChatId,
        response: oneshot::Sender<()>,
    },
}

/// Reply to an event or close request
#[derive(Debug)]
pub struct SessionReply {
    pub outcome: SessionResult<Vec<DisplayIntent>>,

    /// Set when the actor stopped after handling the request
    pub closed: Option<ClosedSession>,
}

impl SessionReply {
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }
}

/// What the registry needs to know about a session that just ended
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub game_id: Uuid,

    /// Pair actually dealt, if the game got past the lobby
    pub pair_id: Option<PairId>,

    pub result: Option<GameResult>,
}
