//! Shared domain and wire types for the room replication engine.
//!
//! Split out of the server crate so `driftboard-client` can depend on
//! `Stroke`/`ServerOp`/`Envelope` without pulling in `axum` or `tokio`.

pub mod ids;
pub mod ops;
pub mod persist;
pub mod stroke;
pub mod wire;

pub use ids::{ConnectionId, RoomId, StrokeId, UserId};
pub use ops::{RawOp, ServerOp, StrokeEndOp, StrokePointsOp, StrokeStartOp, ValidatedOp};
pub use persist::PersistedRoom;
pub use stroke::{
    clamp_width, MAX_POINTS_PER_MESSAGE, MAX_WIDTH, MIN_WIDTH, Point, Stroke, Tool, UserMode,
    UserRecord,
};
pub use wire::{
    CursorIn, CursorOut, Envelope, JoinAck, JoinPayload, OpAck, SyncFrame, UserJoined, UserLeft,
};
