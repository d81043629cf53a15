use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, AppState, session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID}};

use super::{Clients, clients::Provider, ensure_user};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<Provider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = state.ok_or_else(|| anyhow::anyhow!("OAuth return without state"))?;
    let code = code.ok_or_else(|| anyhow::anyhow!("OAuth return without code"))?;

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err(anyhow::anyhow!("no csrf_state in session"))?;
    };

    if state != stored_state {
        return Err(anyhow::anyhow!("csrf tokens don't match"))?;
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err(anyhow::anyhow!("no pkce_verifier in session"))?;
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let userinfo: serde_json::Value = http_client.get(provider.userinfo_url())
        .bearer_auth(token_result.access_token().secret())
        .header(reqwest::header::USER_AGENT, "murmurs")
        .send()
        .await?
        .json()
        .await?;

    let user_id = provider.user_id(&userinfo)?;
    ensure_user(&db_pool, &user_id).await?;
    session.insert(USER_ID, user_id.clone()).await?;

    tracing::info!("welcome u/{user_id}");

    let return_url: String = session.get(RETURN_URL).await?.unwrap_or("/".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
