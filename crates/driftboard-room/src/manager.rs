//! Directory of live rooms: creates a room actor on first join, hands out
//! its handle to later joiners, and tears one down (forcing a final
//! persist) once its last member leaves.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use driftboard_store::Store;
use driftboard_types::RoomId;

use crate::room::{self, RoomHandle};

#[derive(Clone)]
pub struct RoomsManager {
    store: Store,
    rooms: Arc<Mutex<HashMap<RoomId, RoomHandle>>>,
}

impl RoomsManager {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the handle for `room_id`, spawning its actor (and loading
    /// any prior snapshot) if this is the first joiner.
    ///
    /// The directory mutex is only ever held for a plain map lookup/insert,
    /// never across `room::spawn`'s own disk read or a loser's shutdown —
    /// both of those are awaited with the lock released, so a cold start
    /// for one room can never stall a concurrent join/leave for another
    /// (spec §5).
    pub async fn get_or_create(&self, room_id: RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.lock().await.get(&room_id) {
            return handle.clone();
        }

        let handle = room::spawn(room_id.clone(), self.store.clone()).await;

        let mut rooms = self.rooms.lock().await;
        match rooms.get(&room_id) {
            Some(existing) => {
                // Another joiner won the race and already spawned this
                // room's actor; drop the lock before tearing ours down.
                let existing = existing.clone();
                drop(rooms);
                handle.shutdown().await;
                existing
            }
            None => {
                rooms.insert(room_id, handle.clone());
                handle
            }
        }
    }

    /// Call after a connection leaves a room. If that connection was the
    /// room's last member, shuts the room's actor down (forcing a final
    /// persist — see DESIGN.md) and drops it from the directory.
    pub async fn leave(&self, room_id: &RoomId, empty: bool) {
        if !empty {
            return;
        }
        let handle = self.rooms.lock().await.remove(room_id);
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
