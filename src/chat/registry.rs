use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::Event;
use super::key::ConversationId;

/// Depth of each connection's outbound queue. A member that falls this far
/// behind starts losing events instead of delaying the rest of the room.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Handle for pushing events towards one live connection.
#[derive(Clone)]
pub struct Outbound {
    connection_id: Uuid,
    sender: mpsc::Sender<Event>,
}

impl Outbound {
    pub fn new(connection_id: Uuid, sender: mpsc::Sender<Event>) -> Outbound {
        Outbound { connection_id, sender }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Enqueue without waiting. A full queue or a gone receiver drops the
    /// event for this member only.
    pub fn push(&self, event: Event) {
        if let Err(error) = self.sender.try_send(event) {
            tracing::debug!(
                "dropping event for connection {}: {error}",
                self.connection_id
            );
        }
    }
}

struct Binding {
    conversation: ConversationId,
    outbound: Outbound,
}

#[derive(Default)]
struct Inner {
    bindings: HashMap<Uuid, Binding>,
    members: HashMap<ConversationId, HashSet<Uuid>>,
}

/// Live connections and the conversation each one is currently bound to.
/// Both directions of the mapping live behind one lock, so a bind or unbind
/// is atomic with respect to `members_of` snapshots: a connection is never
/// observable in two member sets at once.
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry { inner: Mutex::new(Inner::default()) }
    }

    /// Bind a connection to a conversation, replacing any prior binding.
    pub fn bind(&self, connection_id: Uuid, conversation: ConversationId, sender: mpsc::Sender<Event>) {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.bindings.remove(&connection_id) {
            if let Some(set) = inner.members.get_mut(&previous.conversation) {
                set.remove(&connection_id);
                if set.is_empty() {
                    inner.members.remove(&previous.conversation);
                }
            }
        }

        inner.members.entry(conversation.clone()).or_default().insert(connection_id);
        inner.bindings.insert(connection_id, Binding {
            conversation,
            outbound: Outbound::new(connection_id, sender),
        });
    }

    /// Remove a connection from both mappings. Unbinding an unknown
    /// connection is a no-op. Returns the conversation it was bound to.
    pub fn unbind(&self, connection_id: Uuid) -> Option<ConversationId> {
        let mut inner = self.inner.lock();
        let previous = inner.bindings.remove(&connection_id)?;
        if let Some(set) = inner.members.get_mut(&previous.conversation) {
            set.remove(&connection_id);
            if set.is_empty() {
                inner.members.remove(&previous.conversation);
            }
        }
        Some(previous.conversation)
    }

    /// Snapshot of the conversation's current live members.
    pub fn members_of(&self, conversation: &ConversationId) -> Vec<Outbound> {
        let inner = self.inner.lock();
        let Some(set) = inner.members.get(conversation) else {
            return Vec::new();
        };
        set.iter()
            .filter_map(|connection_id| inner.bindings.get(connection_id))
            .map(|binding| binding.outbound.clone())
            .collect()
    }

    pub fn conversation_of(&self, connection_id: Uuid) -> Option<ConversationId> {
        self.inner
            .lock()
            .bindings
            .get(&connection_id)
            .map(|binding| binding.conversation.clone())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn queue() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
        mpsc::channel(OUTBOUND_QUEUE_DEPTH)
    }

    #[test]
    fn bind_makes_the_connection_visible_to_members_of() {
        let registry = ConnectionRegistry::new();
        let conversation = ConversationId::pair("alice", "bob");
        let connection_id = Uuid::now_v7();
        let (sender, _receiver) = queue();

        registry.bind(connection_id, conversation.clone(), sender);

        let members = registry.members_of(&conversation);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].connection_id(), connection_id);
    }

    #[test]
    fn rebind_moves_the_connection_between_conversations() {
        let registry = ConnectionRegistry::new();
        let first = ConversationId::pair("alice", "bob");
        let second = ConversationId::pair("alice", "carol");
        let connection_id = Uuid::now_v7();
        let (sender, _receiver) = queue();

        registry.bind(connection_id, first.clone(), sender.clone());
        registry.bind(connection_id, second.clone(), sender);

        assert!(registry.members_of(&first).is_empty());
        assert_eq!(registry.members_of(&second).len(), 1);
        assert_eq!(registry.conversation_of(connection_id), Some(second));
    }

    #[test]
    fn unbind_removes_the_connection_and_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conversation = ConversationId::pair("alice", "bob");
        let connection_id = Uuid::now_v7();
        let (sender, _receiver) = queue();

        registry.bind(connection_id, conversation.clone(), sender);
        assert_eq!(registry.unbind(connection_id), Some(conversation.clone()));
        assert!(registry.members_of(&conversation).is_empty());
        assert_eq!(registry.conversation_of(connection_id), None);

        assert_eq!(registry.unbind(connection_id), None);
    }

    #[test]
    fn members_of_an_unknown_conversation_is_empty_not_an_error() {
        let registry = ConnectionRegistry::new();
        assert!(registry.members_of(&ConversationId::pair("nobody", "noone")).is_empty());
    }

    #[test]
    fn a_conversation_holds_every_tab_of_both_users() {
        let registry = ConnectionRegistry::new();
        let conversation = ConversationId::pair("alice", "bob");

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (sender, receiver) = queue();
            receivers.push(receiver);
            registry.bind(Uuid::now_v7(), conversation.clone(), sender);
        }

        assert_eq!(registry.members_of(&conversation).len(), 3);
    }

    #[test]
    fn a_full_queue_drops_instead_of_blocking() {
        let (sender, mut receiver) = mpsc::channel(1);
        let outbound = Outbound::new(Uuid::now_v7(), sender);

        outbound.push(Event::Cleared);
        outbound.push(Event::Cleared);

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }
}
