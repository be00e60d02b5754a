//! Per-room actor and rooms directory.

mod manager;
mod palette;
mod room;
mod time;

pub use manager::RoomsManager;
pub use room::{AppliedOp, RoomHandle, PERSIST_THROTTLE_MS};
pub use time::now_ms;
