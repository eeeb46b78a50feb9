//! Engine error types.

use serde::Serialize;
use thiserror::Error;

use super::entities::{ChatId, Phase, PlayerId};

/// Error categories the router uses to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Illegal action for the current phase or roster; nothing was mutated.
    Validation,
    /// Lost a race against another actor for the same chat.
    Conflict,
    /// A collaborator needed at creation time could not be reached.
    DataUnavailable,
    /// Internal inconsistency; the session was force-terminated.
    Invariant,
}

/// Errors produced by sessions and the registry
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
pub enum SessionError {
    #[error("player already joined")]
    AlreadyJoined,
    #[error("roster is full ({max} players)")]
    RosterFull { max: usize },
    #[error("need between {min} and {max} players, have {current}")]
    InsufficientPlayers {
        min: usize,
        max: usize,
        current: usize,
    },
    #[error("only allowed in the lobby")]
    NotInLobby,
    #[error("no eligible word pairs left for this deck")]
    NoEligiblePairs,
    #[error("words have not been assigned yet")]
    NotAssigned,
    #[error("player {0} is not part of this game")]
    NotAPlayer(PlayerId),
    #[error("player {0} does not vote in this ballot")]
    NotAVoter(PlayerId),
    #[error("player {0} has been eliminated")]
    PlayerEliminated(PlayerId),
    #[error("can't vote on yourself")]
    CannotVoteOnSelf,
    #[error("player {0} can't be voted on")]
    InvalidVoteTarget(PlayerId),
    #[error("not allowed during {0}")]
    WrongPhase(Phase),
    #[error("not allowed to abort this game")]
    Unauthorized,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("no active game in chat {0}")]
    NoActiveSession(ChatId),

    #[error("a game is already active in chat {0}")]
    SessionAlreadyActive(ChatId),
    #[error("game already started")]
    AlreadyStarted,
    #[error("game in chat {0} has already closed")]
    SessionClosed(ChatId),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::SessionAlreadyActive(_)
            | SessionError::AlreadyStarted
            | SessionError::SessionClosed(_) => ErrorKind::Conflict,
            SessionError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            SessionError::InvariantViolation(_) => ErrorKind::Invariant,
            _ => ErrorKind::Validation,
        }
    }

    /// Get a player-safe error message
    ///
    /// Invariant details are meant for operators and are not shown to players.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::InvariantViolation(_) => {
                "The game hit an internal error and was stopped".to_string()
            }
            SessionError::DataUnavailable(_) => {
                "Game data is unavailable right now, try again later".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(SessionError::AlreadyJoined.kind(), ErrorKind::Validation);
        assert_eq!(SessionError::NotAVoter(3).kind(), ErrorKind::Validation);
        assert_eq!(SessionError::AlreadyStarted.kind(), ErrorKind::Conflict);
        assert_eq!(
            SessionError::SessionAlreadyActive(1).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            SessionError::DataUnavailable("x".into()).kind(),
            ErrorKind::DataUnavailable
        );
        assert_eq!(
            SessionError::InvariantViolation("x".into()).kind(),
            ErrorKind::Invariant
        );
    }

    #[test]
    fn test_client_message_hides_invariant_detail() {
        let err = SessionError::InvariantViolation("vote against eliminated player 7".into());
        assert!(!err.client_message().contains("player 7"));
        assert!(err.to_string().contains("player 7"));
    }
}
