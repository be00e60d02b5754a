//! Websocket upgrade handler and per-connection I/O pump, in the shape of
//! `moire-web`'s `tcp::handle_conn`: a reader loop driving the dispatcher,
//! and a dedicated writer task draining an outbound channel so a slow
//! client can never block the room's broadcast fan-out.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use driftboard_types::ConnectionId;

use crate::dispatcher::Session;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::state::AppState;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

fn next_conn_id() -> ConnectionId {
    ConnectionId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_conn(socket, state))
}

async fn handle_conn(socket: WebSocket, state: AppState) {
    let conn_id = next_conn_id();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "failed to encode outbound event");
                    continue;
                }
            };
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(conn_id);
    info!(conn_id = %conn_id, "connection accepted");

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(conn_id = %conn_id, %err, "websocket read error");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                dispatch_text(&mut session, &text, &state, &tx).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    session.handle_disconnect(&state.rooms, &state.registry).await;
    writer.abort();
    info!(conn_id = %conn_id, "connection closed");
}

async fn dispatch_text(session: &mut Session, text: &str, state: &AppState, tx: &mpsc::UnboundedSender<ServerEvent>) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(%err, "malformed client message");
            return;
        }
    };
    match event {
        ClientEvent::Join(payload) => session.handle_join(payload, &state.rooms, &state.registry, tx).await,
        ClientEvent::Msg(op) => session.handle_op(op, &state.rooms, &state.registry, tx).await,
        ClientEvent::Cursor(cursor) => session.handle_cursor(cursor, &state.registry).await,
    }
}

