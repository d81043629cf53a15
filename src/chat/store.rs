use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::key::ConversationId;

/// A message accepted by the hub, not yet persisted.
#[derive(Clone, Debug)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub body: String,
    pub created_at: i64,
}

/// A persisted, immutable message. Insertion order (sqlite rowid) breaks
/// `created_at` ties on retrieval.
#[derive(Clone, Debug, Serialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub body: String,
    pub created_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt message id: {0}")]
    Corrupt(#[from] uuid::Error),
}

/// Durable append-only log of chat messages, queryable by the unordered
/// pair of participants.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: Message) -> Result<StoredMessage, StoreError>;
    async fn query_by_pair(&self, user_a: &str, user_b: &str) -> Result<Vec<StoredMessage>, StoreError>;
    async fn delete_all(&self) -> Result<(), StoreError>;
}

pub struct SqliteMessageStore {
    db_pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(db_pool: SqlitePool) -> SqliteMessageStore {
        SqliteMessageStore { db_pool }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, message: Message) -> Result<StoredMessage, StoreError> {
        let id = Uuid::now_v7();
        let conversation = ConversationId::pair(&message.from, &message.to);
        sqlx::query(
            "INSERT INTO messages (id,conversation_id,sender_id,recipient_id,body,created_at)
             VALUES (?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(conversation.as_str())
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&self.db_pool)
        .await?;

        Ok(StoredMessage {
            id,
            from: message.from,
            to: message.to,
            body: message.body,
            created_at: message.created_at,
        })
    }

    async fn query_by_pair(&self, user_a: &str, user_b: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let conversation = ConversationId::pair(user_a, user_b);
        let rows: Vec<(String, String, String, String, i64)> = sqlx::query_as(
            "SELECT id,sender_id,recipient_id,body,created_at FROM messages
             WHERE conversation_id=? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation.as_str())
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter()
            .map(|(id, from, to, body, created_at)| {
                Ok(StoredMessage {
                    id: Uuid::parse_str(&id)?,
                    from,
                    to,
                    body,
                    created_at,
                })
            })
            .collect()
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages")
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteMessageStore {
    use sqlx::sqlite::SqlitePoolOptions;

    // one connection, otherwise every pool checkout would see its own
    // empty in-memory database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::ensure_schema(&db_pool).await.unwrap();
    SqliteMessageStore::new(db_pool)
}

#[cfg(test)]
mod test {
    use super::*;

    fn message(from: &str, to: &str, body: &str, created_at: i64) -> Message {
        Message {
            from: from.to_owned(),
            to: to.to_owned(),
            body: body.to_owned(),
            created_at,
        }
    }

    #[tokio::test]
    async fn append_then_query_the_reversed_pair_round_trips_every_field() {
        let store = memory_store().await;
        let stored = store.append(message("u1", "u2", "hi", 1000)).await.unwrap();

        let history = store.query_by_pair("u2", "u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, stored.id);
        assert_eq!(history[0].from, "u1");
        assert_eq!(history[0].to, "u2");
        assert_eq!(history[0].body, "hi");
        assert_eq!(history[0].created_at, 1000);
    }

    #[tokio::test]
    async fn both_directions_of_a_pair_land_in_one_conversation() {
        let store = memory_store().await;
        store.append(message("alice", "bob", "hello", 1)).await.unwrap();
        store.append(message("bob", "alice", "hey", 2)).await.unwrap();

        let history = store.query_by_pair("alice", "bob").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, "alice");
        assert_eq!(history[1].from, "bob");
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let store = memory_store().await;
        for body in ["first", "second", "third"] {
            store.append(message("alice", "bob", body, 500)).await.unwrap();
        }

        let bodies: Vec<String> = store
            .query_by_pair("alice", "bob")
            .await
            .unwrap()
            .into_iter()
            .map(|stored| stored.body)
            .collect();
        assert_eq!(bodies, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn query_of_an_unknown_pair_is_empty_not_an_error() {
        let store = memory_store().await;
        assert!(store.query_by_pair("nobody", "noone").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_all_empties_every_pair() {
        let store = memory_store().await;
        store.append(message("alice", "bob", "one", 1)).await.unwrap();
        store.append(message("alice", "carol", "two", 2)).await.unwrap();

        store.delete_all().await.unwrap();

        assert!(store.query_by_pair("alice", "bob").await.unwrap().is_empty());
        assert!(store.query_by_pair("alice", "carol").await.unwrap().is_empty());
    }
}
