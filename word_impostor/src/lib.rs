//! # Word Impostor
//!
//! The game session engine of a social-deduction word game played inside
//! group chats. Every chat runs at most one session; all but one player share
//! a secret word, the impostor holds a related one, and the group gives clues
//! and votes until the impostor is caught, guesses the word, or outlasts the
//! defenders.
//!
//! The engine performs no network I/O and renders no text. It consumes typed
//! events and emits structured display intents and one result per game.
//!
//! ## Architecture
//!
//! A session moves through these phases:
//!
//! - **Lobby**: players join and leave
//! - **RoleAssignment**: a pair is dealt and one player becomes the impostor
//! - **ClueRound**: alive players give one clue each, in rotating order
//! - **Voting**: every alive player votes for someone else
//! - **Tiebreak**: tied players give clues again, then a restricted vote
//! - **Scoring**: score deltas and the game result are computed
//! - **Terminated**: the session accepts nothing further
//!
//! ## Core Modules
//!
//! - [`game`]: Entities, voting, scoring and the session state machine
//! - [`deck`]: Word pair catalog
//! - [`session`]: Per-chat actors and the session registry
//! - [`stats`]: Result sink, stats store and leaderboard refresh
//! - [`settings`]: Per-chat settings provider
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use word_impostor::{
//!     EngineEvent, InboundEvent, RegistryConfig, SessionRegistry, SessionSettings,
//!     deck::WordBank, stats::InMemoryStatsStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = SessionRegistry::new(
//!     Arc::new(WordBank::builtin()),
//!     Arc::new(InMemoryStatsStore::new()),
//!     RegistryConfig::default(),
//! );
//! registry.create(42, SessionSettings::default()).await.unwrap();
//!
//! let join = EngineEvent::Join { display_name: "ann".to_string() };
//! let intents = registry.dispatch(InboundEvent::new(42, 1, join)).await.unwrap();
//! assert_eq!(intents.len(), 1);
//! # }
//! ```

/// Word pair catalog.
pub mod deck;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    AbortPolicy, Audience, ChatId, Content, DisplayIntent, EndReason, EngineEvent, ErrorKind,
    GameResult, InboundEvent, Outcome, Phase, PlayerId, PlayerResult, Role, Session,
    SessionError, SessionResult, SessionSettings, SessionSnapshot, Winner, WordPair, constants,
};

/// Per-chat session actors and registry.
pub mod session;
pub use session::{OpenedSession, RegistryConfig, SessionHandle, SessionRegistry};

/// Settings collaborator.
pub mod settings;
pub use settings::{SettingsProvider, StaticSettingsProvider};

/// Stats collaborator and leaderboard refresh.
pub mod stats;
pub use stats::{InMemoryStatsStore, LeaderboardRefresher, ResultSink};
