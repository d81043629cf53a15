use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

// users:    unique: user_id; unique: handle
// messages: unique: id; queried by (conversation_id, created_at)

pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(url)
        .await?;
    ensure_schema(&db_pool).await?;
    Ok(db_pool)
}

pub async fn ensure_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            handle TEXT NOT NULL UNIQUE,
            alias TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT NOT NULL UNIQUE,
            conversation_id TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS messages_by_conversation
         ON messages (conversation_id, created_at)",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}
