//! Session actor implementation with async message handling.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::messages::{ClosedSession, SessionMessage, SessionReply};
use crate::{
    game::{ChatId, EngineEvent, PlayerId, Session, SessionError, SessionResult, SessionSnapshot},
    stats::ResultSink,
};

/// Session actor handle for sending messages
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    chat_id: ChatId,
    game_id: Uuid,
}

impl SessionHandle {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// True once the actor has stopped draining its inbox
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, message: SessionMessage) -> SessionResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SessionError::SessionClosed(self.chat_id))
    }

    /// Apply an event and wait for the session's reply
    pub async fn request(
        &self,
        player: PlayerId,
        event: EngineEvent,
    ) -> SessionResult<SessionReply> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Event {
            player,
            event,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::SessionClosed(self.chat_id))
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Snapshot { response: tx }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed(self.chat_id))
    }

    pub async fn close(&self) -> SessionResult<SessionReply> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Close { response: tx }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed(self.chat_id))
    }

    /// Re-key the actor's session to `chat_id`
    pub async fn migrate(&self, chat_id: ChatId) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionMessage::Migrate {
            chat_id,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::SessionClosed(self.chat_id))
    }

    /// Same actor, addressed under another chat id
    pub(crate) fn rekeyed(&self, chat_id: ChatId) -> SessionHandle {
        SessionHandle {
            chat_id,
            ..self.clone()
        }
    }
}

/// Actor exclusively owning one chat's session
pub struct SessionActor {
    session: Session,
    inbox: mpsc::Receiver<SessionMessage>,
    sink: Arc<dyn ResultSink>,
}

impl SessionActor {
    /// Create a new session actor
    ///
    /// # Arguments
    ///
    /// * `session` - Freshly created session, still in the lobby
    /// * `sink` - Destination for the final game result
    /// * `inbox_capacity` - Bounded mailbox size
    ///
    /// # Returns
    ///
    /// * `(SessionActor, SessionHandle)` - Actor and handle for sending messages
    pub fn new(
        session: Session,
        sink: Arc<dyn ResultSink>,
        inbox_capacity: usize,
    ) -> (Self, SessionHandle) {
        let (sender, inbox) = mpsc::channel(inbox_capacity.max(1));
        let handle = SessionHandle {
            sender,
            chat_id: session.chat_id(),
            game_id: session.game_id(),
        };
        let actor = Self {
            session,
            inbox,
            sink,
        };
        (actor, handle)
    }

    /// Run the actor until its session terminates or every handle is dropped
    pub async fn run(mut self) {
        let chat_id = self.session.chat_id();
        let game_id = self.session.game_id();
        log::info!("Session {} for chat {} starting", game_id, chat_id);

        while let Some(message) = self.inbox.recv().await {
            if self.handle_message(message).await {
                break;
            }
        }

        // Queued requests see a dropped reply channel and surface SessionClosed.
        self.inbox.close();
        log::info!("Session {} for chat {} closed", game_id, chat_id);
    }

    /// Returns true when the actor should stop.
    async fn handle_message(&mut self, message: SessionMessage) -> bool {
        match message {
            SessionMessage::Event {
                player,
                event,
                response,
            } => {
                log::debug!(
                    "Chat {}: {} from player {}",
                    self.session.chat_id(),
                    event.name(),
                    player
                );
                let outcome = self.session.handle(player, event);
                let closed = self.finish_if_terminated().await;
                let stop = closed.is_some();
                let _ = response.send(SessionReply { outcome, closed });
                stop
            }

            SessionMessage::Snapshot { response } => {
                let _ = response.send(self.session.snapshot());
                false
            }

            SessionMessage::Close { response } => {
                let intents = self.session.close();
                let closed = self.finish_if_terminated().await;
                let _ = response.send(SessionReply {
                    outcome: Ok(intents),
                    closed,
                });
                true
            }

            SessionMessage::Migrate { chat_id, response } => {
                self.session.migrate(chat_id);
                let _ = response.send(());
                false
            }
        }
    }

    /// Delivers the result to the sink the first time the session is seen
    /// terminated.
    async fn finish_if_terminated(&mut self) -> Option<ClosedSession> {
        if !self.session.is_terminated() {
            return None;
        }
        let result = self.session.take_result();
        if let Some(result) = &result {
            match self.sink.record(result.clone()).await {
                Ok(()) => log::info!(
                    "Chat {}: result of game {} delivered",
                    result.chat_id,
                    result.game_id
                ),
                Err(e) => log::error!(
                    "Chat {}: failed to deliver result of game {}: {}",
                    result.chat_id,
                    result.game_id,
                    e
                ),
            }
        }
        Some(ClosedSession {
            game_id: self.session.game_id(),
            pair_id: self.session.pair().map(|p| p.id.clone()),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deck::WordBank,
        game::{SessionSettings, intents::Content},
        stats::InMemoryStatsStore,
    };
    use std::collections::HashSet;

    fn spawn(store: Arc<InMemoryStatsStore>) -> SessionHandle {
        let session = Session::new(
            7,
            SessionSettings::default(),
            Arc::new(WordBank::builtin()),
            HashSet::new(),
        );
        let (actor, handle) = SessionActor::new(session, store, 8);
        tokio::spawn(actor.run());
        handle
    }

    fn join(name: &str) -> EngineEvent {
        EngineEvent::Join {
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_event_round_trip() {
        let handle = spawn(Arc::new(InMemoryStatsStore::new()));
        let reply = handle.request(1, join("ann")).await.unwrap();
        assert!(!reply.is_closed());
        let intents = reply.outcome.unwrap();
        assert!(matches!(
            intents[0].content,
            Content::PlayerJoined { roster_size: 1, .. }
        ));

        let reply = handle.request(1, join("ann")).await.unwrap();
        assert_eq!(reply.outcome.unwrap_err(), SessionError::AlreadyJoined);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.players.len(), 1);
    }

    #[tokio::test]
    async fn test_abort_records_once_and_stops() {
        let store = Arc::new(InMemoryStatsStore::new());
        let handle = spawn(store.clone());
        for id in 1..=3 {
            handle.request(id, join("p")).await.unwrap().outcome.unwrap();
        }
        handle.request(1, EngineEvent::Start).await.unwrap().outcome.unwrap();

        let reply = handle.request(2, EngineEvent::Abort).await.unwrap();
        let closed = reply.closed.unwrap();
        assert!(closed.pair_id.is_some());
        assert!(closed.result.unwrap().is_aborted());
        assert_eq!(store.result_count().await, 1);

        let err = handle.request(3, EngineEvent::Leave).await.unwrap_err();
        assert_eq!(err, SessionError::SessionClosed(7));
    }

    #[tokio::test]
    async fn test_close_terminates_lobby() {
        let store = Arc::new(InMemoryStatsStore::new());
        let handle = spawn(store.clone());
        handle.request(1, join("ann")).await.unwrap().outcome.unwrap();

        let reply = handle.close().await.unwrap();
        let closed = reply.closed.unwrap();
        assert!(closed.pair_id.is_none());
        assert_eq!(
            closed.result.unwrap().reason,
            crate::game::EndReason::Closed
        );
        assert!(matches!(
            reply.outcome.unwrap()[0].content,
            Content::GameOver { .. }
        ));
        assert!(handle.snapshot().await.is_err());
    }

    #[tokio::test]
    async fn test_migrate_rekeys_live_session() {
        let handle = spawn(Arc::new(InMemoryStatsStore::new()));
        handle.request(1, join("ann")).await.unwrap().outcome.unwrap();

        handle.migrate(-1007).await.unwrap();
        let intents = handle.request(2, join("bob")).await.unwrap().outcome.unwrap();
        assert_eq!(intents[0].chat_id, -1007);
        assert_eq!(handle.snapshot().await.unwrap().players.len(), 2);
    }
}
