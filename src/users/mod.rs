mod index;
mod page;

use axum::{Router, routing::get};

use crate::AppState;

pub use index::index;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(page::profile))
}
