use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::Event;
use super::key::ConversationId;
use super::registry::ConnectionRegistry;
use super::store::{Message, MessageStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Connection-open with a blank participant id. The connection is
    /// rejected and never enters a room.
    #[error("connection is missing a participant id")]
    MissingParticipant,
    /// Persistence failed. The message was not fanned out; the connection
    /// stays open and registry state is untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates connection lifecycle, message ingest, persistence and
/// fan-out. One instance per process, shared by every websocket connection.
pub struct ChatHub {
    registry: ConnectionRegistry,
    store: Arc<dyn MessageStore>,
    // Last assigned timestamp per conversation. Holding a conversation's
    // entry locked across persist + enqueue keeps fan-out in acceptance
    // order and timestamps monotonic even when the wall clock steps back.
    sequencers: parking_lot::Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<i64>>>>,
}

impl ChatHub {
    pub fn new(store: Arc<dyn MessageStore>) -> ChatHub {
        ChatHub {
            registry: ConnectionRegistry::new(),
            store,
            sequencers: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    /// Bind a freshly opened connection into the room for the two users.
    pub fn on_connection_open(
        &self,
        connection_id: Uuid,
        user_a: &str,
        user_b: &str,
        outbound: mpsc::Sender<Event>,
    ) -> Result<ConversationId, ChatError> {
        if user_a.trim().is_empty() || user_b.trim().is_empty() {
            return Err(ChatError::MissingParticipant);
        }

        let conversation = ConversationId::pair(user_a, user_b);
        self.registry.bind(connection_id, conversation.clone(), outbound);
        tracing::debug!("connection {connection_id} bound to {conversation}");
        Ok(conversation)
    }

    /// Ingest one inbound message: validate, persist, fan out to every
    /// current member of the conversation (sender included).
    pub async fn on_message(
        &self,
        connection_id: Uuid,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), ChatError> {
        let body = body.trim();
        if body.is_empty() {
            // blank input has no visible effect, not even an error
            tracing::debug!("connection {connection_id} sent a blank body, dropping");
            return Ok(());
        }

        let conversation = ConversationId::pair(from, to);
        let sequencer = self.sequencer(&conversation);
        let mut last_stamp = sequencer.lock().await;

        let created_at = now_millis().max(*last_stamp);
        let stored = self
            .store
            .append(Message {
                from: from.to_owned(),
                to: to.to_owned(),
                body: body.to_owned(),
                created_at,
            })
            .await?;
        *last_stamp = stored.created_at;

        for member in self.registry.members_of(&conversation) {
            member.push(Event::Message(stored.clone()));
        }
        Ok(())
    }

    /// Wipe the message store and notify the caller's room. The wipe is
    /// system-wide, not scoped to the caller's conversation.
    pub async fn on_clear(&self, connection_id: Uuid) -> Result<(), ChatError> {
        let Some(conversation) = self.registry.conversation_of(connection_id) else {
            return Ok(());
        };

        self.store.delete_all().await?;
        tracing::info!("connection {connection_id} cleared the message store");

        for member in self.registry.members_of(&conversation) {
            member.push(Event::Cleared);
        }
        Ok(())
    }

    pub fn on_connection_close(&self, connection_id: Uuid) {
        if let Some(conversation) = self.registry.unbind(connection_id) {
            tracing::debug!("connection {connection_id} left {conversation}");
            if self.registry.members_of(&conversation).is_empty() {
                self.sequencers.lock().remove(&conversation);
            }
        }
    }

    fn sequencer(&self, conversation: &ConversationId) -> Arc<tokio::sync::Mutex<i64>> {
        self.sequencers
            .lock()
            .entry(conversation.clone())
            .or_default()
            .clone()
    }
}

fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
