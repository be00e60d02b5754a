//! Session Dispatcher: join/op/cursor/disconnect for a single connection.
//! Pure-ish logic separated from the websocket plumbing in `ws.rs` so it
//! can be exercised without a live socket.

use driftboard_room::{now_ms, RoomsManager};
use driftboard_types::{
    ConnectionId, CursorIn, CursorOut, Envelope, JoinAck, JoinPayload, OpAck, RawOp, RoomId, UserId, UserJoined,
    UserLeft, UserMode,
};
use driftboard_validator::validate;

use crate::protocol::ServerEvent;
use crate::registry::ConnectionRegistry;

const NAME_MAX_LEN: usize = 32;
const CLIENT_ID_MAX_LEN: usize = 64;

/// Per-connection session state: `unjoined` until a successful `join`.
pub struct Session {
    conn_id: ConnectionId,
    room_id: Option<RoomId>,
    user_id: Option<UserId>,
    mode: UserMode,
}

impl Session {
    pub fn new(conn_id: ConnectionId) -> Self {
        Self {
            conn_id,
            room_id: None,
            user_id: None,
            mode: UserMode::Edit,
        }
    }

    pub async fn handle_join(
        &mut self,
        payload: JoinPayload,
        rooms: &RoomsManager,
        registry: &ConnectionRegistry,
        outbound: &tokio::sync::mpsc::UnboundedSender<ServerEvent>,
    ) {
        if self.room_id.is_some() {
            let _ = outbound.send(ServerEvent::JoinAck(JoinAck::err("already joined")));
            return;
        }

        let room_id = RoomId::new(payload.room_id);
        let user_id = resolve_user_id(payload.client_id, self.conn_id);
        let name = normalize_name(payload.name, &user_id);
        let mode = payload.mode.unwrap_or_default();

        let handle = rooms.get_or_create(room_id.clone()).await;
        let user = handle.add_user(self.conn_id, user_id.clone(), name, mode).await;

        registry.register(room_id.clone(), self.conn_id, outbound.clone()).await;

        let (seq, users, snapshot) = handle.sync().await;
        let sync_frame = driftboard_types::SyncFrame {
            room_id: room_id.clone(),
            seq,
            users,
            strokes: snapshot.committed,
            undone: snapshot.undone,
            in_progress: snapshot.in_progress,
        };
        let _ = outbound.send(ServerEvent::Sync(sync_frame));

        registry
            .broadcast(
                &room_id,
                ServerEvent::UserJoined(UserJoined { user: user.clone() }),
                Some(self.conn_id),
            )
            .await;

        let _ = outbound.send(ServerEvent::JoinAck(JoinAck::ok(room_id.clone(), user)));

        self.room_id = Some(room_id);
        self.user_id = Some(user_id);
        self.mode = mode;
    }

    pub async fn handle_op(
        &self,
        op: RawOp,
        rooms: &RoomsManager,
        registry: &ConnectionRegistry,
        outbound: &tokio::sync::mpsc::UnboundedSender<ServerEvent>,
    ) {
        let (Some(room_id), Some(user_id)) = (&self.room_id, &self.user_id) else {
            let _ = outbound.send(ServerEvent::OpAck(OpAck::err("not joined")));
            return;
        };

        if self.mode == UserMode::View {
            let _ = outbound.send(ServerEvent::OpAck(OpAck::err("view-mode connections cannot submit ops")));
            return;
        }

        let validated = match validate(op) {
            Ok(op) => op,
            Err(err) => {
                let _ = outbound.send(ServerEvent::OpAck(OpAck::err(err.to_string())));
                return;
            }
        };

        let handle = rooms.get_or_create(room_id.clone()).await;
        match handle.apply_op(user_id.clone(), validated).await {
            Err(err) => {
                let _ = outbound.send(ServerEvent::OpAck(OpAck::err(err.to_string())));
            }
            Ok(None) => {
                let _ = outbound.send(ServerEvent::OpAck(OpAck::no_op()));
            }
            Ok(Some(applied)) => {
                let envelope = Envelope {
                    seq: applied.seq,
                    op: applied.op,
                    by: user_id.clone(),
                    ts: now_ms(),
                };
                registry.broadcast(room_id, ServerEvent::Op(envelope), None).await;
                let _ = outbound.send(ServerEvent::OpAck(OpAck::applied(applied.seq)));
            }
        }
    }

    pub async fn handle_cursor(&self, cursor: CursorIn, registry: &ConnectionRegistry) {
        let Some(room_id) = &self.room_id else {
            return;
        };
        let Some(user_id) = &self.user_id else {
            return;
        };
        if !cursor.x.is_finite() || !cursor.y.is_finite() {
            return;
        }
        registry
            .broadcast(
                room_id,
                ServerEvent::Cursor(CursorOut {
                    user_id: user_id.clone(),
                    x: cursor.x,
                    y: cursor.y,
                }),
                Some(self.conn_id),
            )
            .await;
    }

    pub async fn handle_disconnect(&mut self, rooms: &RoomsManager, registry: &ConnectionRegistry) {
        let Some(room_id) = self.room_id.take() else {
            return;
        };
        let handle = rooms.get_or_create(room_id.clone()).await;
        let empty = handle.remove_user(self.conn_id).await;
        registry.unregister(&room_id, self.conn_id).await;

        if let Some(user_id) = self.user_id.take() {
            registry
                .broadcast(&room_id, ServerEvent::UserLeft(UserLeft { user_id }), None)
                .await;
        }
        rooms.leave(&room_id, empty).await;
    }
}

/// Resolves to `clientId` (truncated) when present and non-empty after
/// truncation, else the connection id.
fn resolve_user_id(client_id: Option<String>, conn_id: ConnectionId) -> UserId {
    match client_id.map(|raw| truncate_chars(raw.trim(), CLIENT_ID_MAX_LEN)) {
        Some(id) if !id.is_empty() => UserId::new(id),
        _ => UserId::new(conn_id.to_string()),
    }
}

/// Trims and truncates to 32 code units; falls back to `User-<first 4 of
/// userId>` when empty.
fn normalize_name(name: Option<String>, user_id: &UserId) -> String {
    let trimmed = name.map(|n| truncate_chars(n.trim(), NAME_MAX_LEN)).unwrap_or_default();
    if trimmed.is_empty() {
        let prefix: String = user_id.as_str().chars().take(4).collect();
        format!("User-{prefix}")
    } else {
        trimmed
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_falls_back_to_user_prefix() {
        let user_id = UserId::new("abcdef");
        assert_eq!(normalize_name(None, &user_id), "User-abcd");
        assert_eq!(normalize_name(Some("   ".into()), &user_id), "User-abcd");
    }

    #[test]
    fn name_is_trimmed_and_truncated() {
        let user_id = UserId::new("x");
        let long = "a".repeat(40);
        assert_eq!(normalize_name(Some(format!("  {long}  ")), &user_id), "a".repeat(32));
    }

    #[test]
    fn client_id_resolves_over_connection_id_when_non_empty() {
        let resolved = resolve_user_id(Some("alice".into()), ConnectionId::FIRST);
        assert_eq!(resolved, UserId::new("alice"));
    }

    #[test]
    fn blank_client_id_falls_back_to_connection_id() {
        let resolved = resolve_user_id(Some("   ".into()), ConnectionId(7));
        assert_eq!(resolved, UserId::new("7"));
    }

    #[test]
    fn client_id_is_truncated_to_64_chars() {
        let long = "x".repeat(100);
        let resolved = resolve_user_id(Some(long.clone()), ConnectionId::FIRST);
        assert_eq!(resolved.as_str().len(), 64);
    }
}
