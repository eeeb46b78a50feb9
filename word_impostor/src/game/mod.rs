//! Game session engine - per-chat FSM and game logic.
//!
//! This module provides:
//! - Entities (players, roster, word pairs, phases)
//! - The per-session settings snapshot
//! - Voting, tiebreak and win-condition logic
//! - Scoring and the immutable game result
//! - The session state machine that composes all of the above

pub mod constants;
pub mod entities;
pub mod errors;
pub mod events;
pub mod intents;
pub mod scoring;
pub mod settings;
pub mod state_machine;
pub mod states;
pub mod voting;

pub use entities::{
    Assignment, ChatId, Clue, PairId, Phase, Player, PlayerId, Role, Roster, WordPair,
};
pub use errors::{ErrorKind, SessionError, SessionResult};
pub use events::{EngineEvent, InboundEvent};
pub use intents::{Audience, Content, DisplayIntent};
pub use scoring::{EndReason, GameResult, Outcome, PlayerResult};
pub use settings::{AbortPolicy, SessionSettings};
pub use state_machine::{PlayerSummary, Session, SessionSnapshot};
pub use voting::Winner;
