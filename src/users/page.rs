use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, include_res, res, session::USER_ID};

#[debug_handler]
pub(crate) async fn profile(
    Path(user_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let sorry = res::sorry("profile");

    if session.get::<String>(USER_ID).await?.is_none() {
        return sorry;
    }

    let Some((handle, alias)): Option<(String, String)> =
        sqlx::query_as("SELECT handle,alias FROM users WHERE user_id=?")
            .bind(&user_id)
            .fetch_optional(&db_pool)
            .await?
    else {
        return sorry;
    };

    Ok(Html(
        include_res!(str, "/pages/profile.html")
        .replace("{alias}", &alias)
        .replace("{handle}", &handle)
        .replace("{user_id}", &user_id)
    ).into_response())
}
