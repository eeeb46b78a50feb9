//! JSON-lines front end standing in for the chat router.
//!
//! Every input line is either an `InboundEvent` or a harness command such as
//! `{"command": "leaderboard"}`. Every output line is one JSON value.

use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use word_impostor::{
    ChatId, DisplayIntent, EngineEvent, InMemoryStatsStore, InboundEvent, PlayerId,
    SessionError, SessionRegistry, StaticSettingsProvider,
};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_LEADERBOARD_LIMIT
}

/// Operator commands that bypass the engine
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Status {
        chat_id: ChatId,
    },
    Close {
        chat_id: ChatId,
    },
    Sessions,
    Leaderboard {
        #[serde(default = "default_limit")]
        limit: usize,
    },
    PlayerStats {
        player_id: PlayerId,
    },
    ChatStats {
        chat_id: ChatId,
    },
    NextGame {
        chat_id: ChatId,
        player_id: PlayerId,
    },
    Migrate {
        old_chat_id: ChatId,
        new_chat_id: ChatId,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Line {
    Command(Command),
    Event(InboundEvent),
}

pub struct Harness {
    registry: SessionRegistry,
    provider: StaticSettingsProvider,
    store: Arc<InMemoryStatsStore>,
}

impl Harness {
    pub fn new(
        registry: SessionRegistry,
        provider: StaticSettingsProvider,
        store: Arc<InMemoryStatsStore>,
    ) -> Self {
        Self {
            registry,
            provider,
            store,
        }
    }

    /// Handles one input line and returns the output lines.
    pub async fn handle_line(&self, line: &str) -> Vec<Value> {
        let line = line.trim();
        if line.is_empty() {
            return vec![];
        }
        match serde_json::from_str::<Line>(line) {
            Ok(Line::Event(inbound)) => self.route(inbound).await,
            Ok(Line::Command(command)) => vec![self.command(command).await],
            Err(e) => {
                log::warn!("Undecodable input line: {}", e);
                vec![json!({ "error": format!("invalid input: {e}") })]
            }
        }
    }

    /// Creates a session on demand for joins and starts, then dispatches.
    async fn route(&self, inbound: InboundEvent) -> Vec<Value> {
        let chat_id = inbound.chat_id;
        let player_id = inbound.player_id;

        let opens_session = matches!(
            inbound.event,
            EngineEvent::Join { .. } | EngineEvent::Start
        );
        let mut out = vec![];
        if opens_session && self.registry.get(chat_id).await.is_none() {
            match self
                .registry
                .create_from_provider(chat_id, &self.provider)
                .await
            {
                Ok(opened) => out.extend(opened.notices.iter().map(intent_value)),
                // Lost a race against another creator; dispatch to theirs.
                Err(SessionError::SessionAlreadyActive(_)) => {}
                Err(e) => return vec![error_value(chat_id, player_id, e)],
            }
        }

        match self.registry.dispatch(inbound).await {
            Ok(intents) => out.extend(intents.iter().map(intent_value)),
            Err(e) => out.push(error_value(chat_id, player_id, e)),
        }
        out
    }

    async fn command(&self, command: Command) -> Value {
        match command {
            Command::Status { chat_id } => match self.registry.snapshot(chat_id).await {
                Ok(snapshot) => json!({ "status": snapshot }),
                Err(e) => json!({ "error": e.client_message() }),
            },
            Command::Close { chat_id } => {
                let intents = self.registry.remove(chat_id).await;
                json!({ "closed": chat_id, "intents": intents })
            }
            Command::Sessions => json!({ "sessions": self.registry.active_sessions().await }),
            Command::Leaderboard { limit } => {
                json!({ "leaderboard": self.store.leaderboard(limit).await })
            }
            Command::PlayerStats { player_id } => {
                json!({ "player_stats": self.store.player_stats(player_id).await })
            }
            Command::ChatStats { chat_id } => {
                json!({ "chat_stats": self.store.chat_stats(chat_id).await })
            }
            Command::NextGame { chat_id, player_id } => {
                let subscribed = self.registry.subscribe_next_game(chat_id, player_id).await;
                json!({ "next_game": chat_id, "subscribed": subscribed })
            }
            Command::Migrate {
                old_chat_id,
                new_chat_id,
            } => match self.registry.migrate(old_chat_id, new_chat_id).await {
                Ok(()) => json!({ "migrated": old_chat_id, "to": new_chat_id }),
                Err(e) => json!({ "error": e.client_message() }),
            },
        }
    }
}

fn intent_value(intent: &DisplayIntent) -> Value {
    serde_json::to_value(intent).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

fn error_value(chat_id: ChatId, player_id: PlayerId, error: SessionError) -> Value {
    log::debug!("Chat {}: rejected event from {}: {}", chat_id, player_id, error);
    intent_value(&DisplayIntent::error(chat_id, player_id, error))
}
