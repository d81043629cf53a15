use axum::{Router, routing::get};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;

use uuid::Uuid;

use crate::AppState;

mod clients;
mod login;
mod lockin;
mod logout;

pub use clients::{Clients, Provider};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

pub(crate) async fn ensure_user(db_pool: &SqlitePool, user_id: &str) -> Result<(), sqlx::Error> {
    if sqlx::query_as::<_, ()>("SELECT 1 FROM users WHERE user_id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let handle = "user".to_owned() + &Uuid::now_v7().simple().to_string();
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
        ];

    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let alias = format!("{} {}", adjectives.choose(&mut rand::rng()).unwrap(), nouns.choose(&mut rand::rng()).unwrap());

    tracing::info!("registering @{handle}#{user_id} as {alias}");
    sqlx::query("insert into users (user_id,handle,alias) VALUES (?,?,?)")
        .bind(user_id)
        .bind(handle)
        .bind(alias)
        .execute(db_pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn ensure_user_registers_once_and_is_idempotent() {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::ensure_schema(&db_pool).await.unwrap();

        ensure_user(&db_pool, "google:123").await.unwrap();
        ensure_user(&db_pool, "google:123").await.unwrap();

        let users: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM users")
            .fetch_all(&db_pool)
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, "google:123");
    }
}
