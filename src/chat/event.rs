use serde::Serialize;

use super::store::StoredMessage;

/// Outbound push event, serialized as-is onto each member's websocket.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Message(StoredMessage),
    Cleared,
}
