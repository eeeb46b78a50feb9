//! Per-chat session actors and the registry that routes events to them.
//!
//! This module implements:
//! - SessionActor: a tokio task exclusively owning one chat's `Session`
//! - SessionHandle: cloneable sender side of an actor's inbox
//! - SessionRegistry: chat id to handle map plus recent-pair history and
//!   next-game subscriptions
//!
//! Events for one chat are applied in inbox arrival order. Different chats
//! share nothing beyond the registry map, whose lock is never held while a
//! session processes an event.

pub mod actor;
pub mod messages;
pub mod registry;

pub use actor::{SessionActor, SessionHandle};
pub use messages::{ClosedSession, SessionMessage, SessionReply};
pub use registry::{OpenedSession, RegistryConfig, SessionRegistry};
