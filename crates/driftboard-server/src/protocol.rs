//! Wire framing for the websocket transport. The core is transport-agnostic,
//! so this crate picks one concrete, socket.io-flavored encoding: every
//! message is a JSON object tagged by its event name.

use serde::{Deserialize, Serialize};

use driftboard_types::{CursorIn, CursorOut, Envelope, JoinAck, JoinPayload, OpAck, RawOp, SyncFrame, UserJoined, UserLeft};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join(JoinPayload),
    Msg(RawOp),
    Cursor(CursorIn),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    JoinAck(JoinAck),
    Sync(SyncFrame),
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    Op(Envelope),
    OpAck(OpAck),
    Cursor(CursorOut),
}
