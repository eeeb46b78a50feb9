//! Session registry for spawning and routing to per-chat session actors.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    sync::Arc,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    actor::{SessionActor, SessionHandle},
    messages::{ClosedSession, SessionReply},
};
use crate::{
    deck::WordBank,
    game::{
        ChatId, Content, DisplayIntent, InboundEvent, PairId, PlayerId, Session, SessionError,
        SessionResult, SessionSettings, SessionSnapshot, constants::DEFAULT_RECENT_PAIR_WINDOW,
    },
    settings::SettingsProvider,
    stats::ResultSink,
};

/// Registry-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of most recently dealt pairs excluded per chat
    pub recent_pair_window: usize,

    /// Per-session mailbox size
    pub inbox_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            recent_pair_window: DEFAULT_RECENT_PAIR_WINDOW,
            inbox_capacity: 100,
        }
    }
}

/// A freshly created session and the notices owed to its subscribers
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub handle: SessionHandle,

    /// One private `NextGameOpened` intent per next-game subscriber
    pub notices: Vec<DisplayIntent>,
}

/// Registry owning every live session, one per chat
pub struct SessionRegistry {
    /// Shared word bank
    deck: Arc<WordBank>,

    /// Where finished sessions deliver their result
    sink: Arc<dyn ResultSink>,

    config: RegistryConfig,

    /// Live session handles
    sessions: Arc<RwLock<HashMap<ChatId, SessionHandle>>>,

    /// Recently dealt pair ids per chat, newest last
    recent_pairs: Arc<RwLock<HashMap<ChatId, VecDeque<PairId>>>>,

    /// Players waiting to hear about each chat's next lobby
    next_game: Arc<RwLock<HashMap<ChatId, BTreeSet<PlayerId>>>>,
}

impl SessionRegistry {
    /// Create a new session registry
    ///
    /// # Arguments
    ///
    /// * `deck` - Word bank shared by all sessions
    /// * `sink` - Stats collaborator receiving game results
    /// * `config` - Registry configuration
    ///
    /// # Returns
    ///
    /// * `SessionRegistry` - Empty registry
    pub fn new(deck: Arc<WordBank>, sink: Arc<dyn ResultSink>, config: RegistryConfig) -> Self {
        Self {
            deck,
            sink,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recent_pairs: Arc::new(RwLock::new(HashMap::new())),
            next_game: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn deck(&self) -> &Arc<WordBank> {
        &self.deck
    }

    /// Create and spawn a session for a chat
    ///
    /// # Arguments
    ///
    /// * `chat_id` - Chat the session belongs to
    /// * `settings` - Settings snapshot, fixed for the session's lifetime
    ///
    /// # Returns
    ///
    /// * `SessionResult<OpenedSession>` - Handle to the spawned actor, plus
    ///   the notices for players subscribed to this chat's next game
    pub async fn create(
        &self,
        chat_id: ChatId,
        settings: SessionSettings,
    ) -> SessionResult<OpenedSession> {
        settings.validate().map_err(SessionError::InvalidSettings)?;
        if !self.deck.has_deck(&settings.deck_language, &settings.deck_id) {
            return Err(SessionError::DataUnavailable(format!(
                "no deck '{}' for language '{}'",
                settings.deck_id, settings.deck_language
            )));
        }

        let excluded: HashSet<PairId> = self
            .recent_pairs
            .read()
            .await
            .get(&chat_id)
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default();

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&chat_id) {
            if !existing.is_closed() {
                return Err(SessionError::SessionAlreadyActive(chat_id));
            }
            log::warn!(
                "Chat {}: replacing stale session {}",
                chat_id,
                existing.game_id()
            );
        }

        let session = Session::new(chat_id, settings, self.deck.clone(), excluded);
        let (actor, handle) =
            SessionActor::new(session, self.sink.clone(), self.config.inbox_capacity);
        sessions.insert(chat_id, handle.clone());
        drop(sessions);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!(
            "Created and spawned session {} for chat {}",
            handle.game_id(),
            chat_id
        );

        let notices = self.take_next_game_notices(chat_id).await;
        Ok(OpenedSession { handle, notices })
    }

    /// Create a session with settings fetched from the settings collaborator
    pub async fn create_from_provider(
        &self,
        chat_id: ChatId,
        provider: &dyn SettingsProvider,
    ) -> SessionResult<OpenedSession> {
        let settings = provider
            .settings_for(chat_id)
            .await
            .map_err(|e| SessionError::DataUnavailable(e.to_string()))?;
        self.create(chat_id, settings).await
    }

    /// Get a session handle
    pub async fn get(&self, chat_id: ChatId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(&chat_id).cloned()
    }

    /// Remove a chat's session, terminating any game in progress.
    ///
    /// Idempotent: removing a chat without a session returns no intents.
    pub async fn remove(&self, chat_id: ChatId) -> Vec<DisplayIntent> {
        let handle = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&chat_id)
        };
        let Some(handle) = handle else {
            return vec![];
        };

        let intents = match handle.close().await {
            Ok(reply) => self.settle(chat_id, reply).await.unwrap_or_default(),
            // Actor already gone; nothing left to tear down.
            Err(_) => vec![],
        };
        log::info!("Removed session for chat {}", chat_id);
        intents
    }

    /// Route one inbound event to its chat's session.
    ///
    /// A session that reached TERMINATED is unregistered before this returns.
    pub async fn dispatch(&self, inbound: InboundEvent) -> SessionResult<Vec<DisplayIntent>> {
        let InboundEvent {
            chat_id,
            player_id,
            event,
        } = inbound;

        let handle = self
            .get(chat_id)
            .await
            .ok_or(SessionError::NoActiveSession(chat_id))?;

        match handle.request(player_id, event).await {
            Ok(reply) => self.settle(chat_id, reply).await,
            Err(e) => {
                self.unregister(chat_id, handle.game_id()).await;
                Err(e)
            }
        }
    }

    /// Read-only status view of a chat's session
    pub async fn snapshot(&self, chat_id: ChatId) -> SessionResult<SessionSnapshot> {
        let handle = self
            .get(chat_id)
            .await
            .ok_or(SessionError::NoActiveSession(chat_id))?;
        handle.snapshot().await
    }

    /// Chat ids with a live session, ascending
    pub async fn active_sessions(&self) -> Vec<ChatId> {
        let sessions = self.sessions.read().await;
        let mut chats: Vec<ChatId> = sessions.keys().copied().collect();
        chats.sort_unstable();
        chats
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Pair ids excluded from the chat's next game, oldest first
    pub async fn recent_pairs(&self, chat_id: ChatId) -> Vec<PairId> {
        self.recent_pairs
            .read()
            .await
            .get(&chat_id)
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ask to be notified privately when the chat's next lobby opens.
    ///
    /// Returns false if the player was already subscribed.
    pub async fn subscribe_next_game(&self, chat_id: ChatId, player_id: PlayerId) -> bool {
        let added = self
            .next_game
            .write()
            .await
            .entry(chat_id)
            .or_default()
            .insert(player_id);
        if added {
            log::debug!("Chat {}: player {} waits for the next game", chat_id, player_id);
        }
        added
    }

    pub async fn unsubscribe_next_game(&self, chat_id: ChatId, player_id: PlayerId) -> bool {
        let mut next_game = self.next_game.write().await;
        let Some(players) = next_game.get_mut(&chat_id) else {
            return false;
        };
        let removed = players.remove(&player_id);
        if players.is_empty() {
            next_game.remove(&chat_id);
        }
        removed
    }

    /// Players subscribed to the chat's next game, ascending
    pub async fn next_game_subscribers(&self, chat_id: ChatId) -> Vec<PlayerId> {
        self.next_game
            .read()
            .await
            .get(&chat_id)
            .map(|players| players.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move everything the registry keeps for `old` to `new` after the
    /// platform upgraded a chat: the live session, the recent-pair history
    /// and the next-game subscriptions.
    ///
    /// # Arguments
    ///
    /// * `old` - Chat id being retired
    /// * `new` - Chat id replacing it
    ///
    /// # Returns
    ///
    /// * `SessionResult<()>` - `SessionAlreadyActive(new)` if `new` already
    ///   runs a live session; nothing is moved in that case
    pub async fn migrate(&self, old: ChatId, new: ChatId) -> SessionResult<()> {
        if old == new {
            return Ok(());
        }

        let moved = {
            let mut sessions = self.sessions.write().await;
            if sessions.get(&new).is_some_and(|handle| !handle.is_closed()) {
                return Err(SessionError::SessionAlreadyActive(new));
            }
            let moved = sessions.remove(&old);
            if let Some(handle) = &moved {
                sessions.insert(new, handle.rekeyed(new));
            }
            moved
        };

        if let Some(handle) = moved {
            // A closed actor is unregistered by the next dispatch.
            if let Err(e) = handle.migrate(new).await {
                log::debug!("Chat {}: session {} not migrated: {}", old, handle.game_id(), e);
            }
        }

        {
            let mut recent_pairs = self.recent_pairs.write().await;
            if let Some(history) = recent_pairs.remove(&old) {
                let merged = recent_pairs.entry(new).or_default();
                for pair_id in history {
                    merged.push_back(pair_id);
                }
                while merged.len() > self.config.recent_pair_window {
                    merged.pop_front();
                }
            }
        }

        {
            let mut next_game = self.next_game.write().await;
            if let Some(players) = next_game.remove(&old) {
                next_game.entry(new).or_default().extend(players);
            }
        }

        log::info!("Migrated chat {} to {}", old, new);
        Ok(())
    }

    async fn take_next_game_notices(&self, chat_id: ChatId) -> Vec<DisplayIntent> {
        let players = self.next_game.write().await.remove(&chat_id);
        players
            .into_iter()
            .flatten()
            .map(|player| DisplayIntent::private(chat_id, player, Content::NextGameOpened))
            .collect()
    }

    /// Applies the bookkeeping for a reply and unwraps its outcome.
    async fn settle(
        &self,
        chat_id: ChatId,
        reply: SessionReply,
    ) -> SessionResult<Vec<DisplayIntent>> {
        if let Some(closed) = reply.closed {
            self.on_closed(chat_id, closed).await;
        }
        reply.outcome
    }

    async fn on_closed(&self, chat_id: ChatId, closed: ClosedSession) {
        self.unregister(chat_id, closed.game_id).await;
        if let Some(pair_id) = closed.pair_id {
            self.remember_pair(chat_id, pair_id).await;
        }
    }

    /// Drops the chat's handle only if it still belongs to `game_id`, so a
    /// session created in the meantime survives.
    async fn unregister(&self, chat_id: ChatId, game_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&chat_id)
            .is_some_and(|handle| handle.game_id() == game_id)
        {
            sessions.remove(&chat_id);
            log::debug!("Unregistered session {} for chat {}", game_id, chat_id);
        }
    }

    async fn remember_pair(&self, chat_id: ChatId, pair_id: PairId) {
        let window = self.config.recent_pair_window;
        if window == 0 {
            return;
        }
        let mut recent_pairs = self.recent_pairs.write().await;
        let recent = recent_pairs.entry(chat_id).or_default();
        recent.push_back(pair_id);
        while recent.len() > window {
            recent.pop_front();
        }
    }
}
