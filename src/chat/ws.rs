use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State, WebSocketUpgrade, ws::WebSocket}, response::{IntoResponse, Response}};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, session::USER_ID};

use super::hub::ChatHub;
use super::registry::OUTBOUND_QUEUE_DEPTH;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Inbound {
    Input { from: String, to: String, body: String },
    Clear,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    Path(peer_id): Path<String>,
    State(hub): State<Arc<ChatHub>>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Err(anyhow::anyhow!("websocket without a signed-in session"))?;
    };

    Ok(ws
        .on_upgrade(async move |socket| drive_socket(socket, hub, user_id, peer_id).await)
        .into_response())
}

async fn drive_socket(socket: WebSocket, hub: Arc<ChatHub>, user_id: String, peer_id: String) {
    let connection_id = Uuid::now_v7();
    let (outbound, mut queue) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

    if let Err(error) = hub.on_connection_open(connection_id, &user_id, &peer_id, outbound) {
        tracing::warn!("rejecting connection {connection_id}: {error}");
        return;
    }

    let (mut sink, mut stream) = socket.split();

    let pump = tokio::spawn(async move {
        while let Some(event) = queue.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(text.into()).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let Ok(inbound) = serde_json::from_slice(&frame.into_data()) else {
            continue;
        };

        match inbound {
            Inbound::Input { from, to, body } => {
                if let Err(error) = hub.on_message(connection_id, &from, &to, &body).await {
                    tracing::warn!("message from connection {connection_id} not delivered: {error}");
                }
            }
            Inbound::Clear => {
                if let Err(error) = hub.on_clear(connection_id).await {
                    tracing::warn!("clear from connection {connection_id} failed: {error}");
                }
            }
        }
    }

    hub.on_connection_close(connection_id);
    pump.abort();
}
