pub mod event;
pub mod history;
pub mod hub;
pub mod key;
pub mod registry;
pub mod store;

mod page;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(page::chat_page))
        .route("/{user_id}/ws", get(ws::chat_ws))
}
