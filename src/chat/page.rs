use std::collections::HashMap;
use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, include_res, res, session::USER_ID};

use super::history;
use super::hub::ChatHub;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_page(
    Path(peer_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(hub): State<Arc<ChatHub>>,
    session: Session,
) -> AppResult<Response> {
    let sorry = res::sorry("chat");

    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Ok(Redirect::to(&format!("/login?return_url=/c/{peer_id}")).into_response());
    };

    let Some((peer_alias,)): Option<(String,)> =
        sqlx::query_as("SELECT alias FROM users WHERE user_id=?")
            .bind(&peer_id)
            .fetch_optional(&db_pool)
            .await?
    else {
        return sorry;
    };

    let my_alias = sqlx::query_as::<_, (String,)>("SELECT alias FROM users WHERE user_id=?")
        .bind(&user_id)
        .fetch_optional(&db_pool)
        .await?
        .map_or_else(|| user_id.clone(), |(alias,)| alias);

    let messages = history::load(hub.store(), &user_id, &peer_id).await?;
    let aliases = HashMap::from([
        (user_id.clone(), my_alias.clone()),
        (peer_id.clone(), peer_alias.clone()),
    ]);

    let body = include_res!(str, "/pages/chat/chat.html")
        .replace("{peer_id}", &peer_id)
        .replace("{peer_alias}", &peer_alias)
        .replace("{me_id}", &user_id)
        .replace("{me_alias}", &my_alias)
        .replace("{messages}", &history::render(&messages, &aliases));

    Ok(Html(body).into_response())
}
