//! Per-room fan-out registry: which outbound channel belongs to which
//! connection. Kept separate from `driftboard_room::RoomHandle` so the room
//! actor stays transport-agnostic and unit-testable without a socket.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use driftboard_types::{ConnectionId, RoomId};

use crate::protocol::ServerEvent;

#[derive(Clone)]
pub struct ConnectionRegistry {
    rooms: Arc<Mutex<HashMap<RoomId, HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register(&self, room_id: RoomId, conn_id: ConnectionId, tx: mpsc::UnboundedSender<ServerEvent>) {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(room_id).or_default().insert(conn_id, tx);
    }

    pub async fn unregister(&self, room_id: &RoomId, conn_id: ConnectionId) {
        let mut rooms = self.rooms.lock().await;
        if let Some(members) = rooms.get_mut(room_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Sends `event` to every connection in `room_id` except `exclude` (if
    /// given). `exclude = None` means "including the sender", which is how
    /// how op-envelope fan-out is defined: sent to every member including
    /// the one who made the change.
    pub async fn broadcast(&self, room_id: &RoomId, event: ServerEvent, exclude: Option<ConnectionId>) {
        let rooms = self.rooms.lock().await;
        let Some(members) = rooms.get(room_id) else {
            return;
        };
        for (conn_id, tx) in members {
            if Some(*conn_id) == exclude {
                continue;
            }
            let _ = tx.send(event.clone());
        }
    }

    pub async fn send_to(&self, room_id: &RoomId, conn_id: ConnectionId, event: ServerEvent) {
        let rooms = self.rooms.lock().await;
        if let Some(tx) = rooms.get(room_id).and_then(|members| members.get(&conn_id)) {
            let _ = tx.send(event);
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
