use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, include_res, session::USER_ID};

#[debug_handler]
pub async fn index(
    State(db_pool): State<SqlitePool>,
    session: Session
) -> AppResult<Response> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Ok(
            Redirect::to("/login")
                .into_response()
        );
    };

    let mut user_items = String::new();
    let users: Vec<(String, String)> = sqlx::query_as("SELECT user_id,alias FROM users ORDER BY alias")
        .fetch_all(&db_pool)
        .await?;
    for (id, alias) in users {
        if id == user_id {
            continue;
        }

        user_items += &include_res!(str, "/pages/user_item.html")
            .replace("{id}", &id)
            .replace("{alias}", &alias);
    }

    Ok(
        Html(
            include_res!(str, "/pages/index.html")
                .replace("{user_items}", &user_items)
        ).into_response()
    )
}
