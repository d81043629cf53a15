use std::sync::Arc;

use axum::{Router, routing::get};
use murmurs::{AppState, auth, chat, db, users};
use murmurs::chat::{hub::ChatHub, store::SqliteMessageStore};
use tower_http::cors::CorsLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(2)));

    let db_pool = db::connect(dotenv::var("DATABASE_URL")?.as_str()).await?;
    let clients = auth::Clients::from_env().map_err(|error| error.0)?;
    let hub = Arc::new(ChatHub::new(Arc::new(SqliteMessageStore::new(db_pool.clone()))));

    let app_state = AppState {
        db_pool,
        clients,
        hub,
    };

    let app = Router::new()
        .route("/", get(users::index))

        .merge(auth::router())
        .nest("/c", chat::router())
        .nest("/u", users::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let address = dotenv::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("listening on {address}");
    axum::serve(listener, app).await?;
    Ok(())
}
