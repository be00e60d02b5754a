use driftboard_room::RoomsManager;

use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomsManager,
    pub registry: ConnectionRegistry,
}

impl AppState {
    pub fn new(rooms: RoomsManager) -> Self {
        Self {
            rooms,
            registry: ConnectionRegistry::new(),
        }
    }
}
