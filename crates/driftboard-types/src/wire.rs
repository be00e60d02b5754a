use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, StrokeId, UserId};
use crate::ops::ServerOp;
use crate::stroke::{Stroke, UserMode, UserRecord};

/// `join` request payload (spec §6).
#[derive(Clone, Debug, Deserialize)]
pub struct JoinPayload {
    pub room_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<UserMode>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// `join` ack payload (spec §6): success carries the resolved room id and
/// the joiner's own user record, failure carries a message.
#[derive(Clone, Debug, Serialize)]
pub struct JoinAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl JoinAck {
    pub fn ok(room_id: RoomId, user: UserRecord) -> Self {
        Self {
            ok: true,
            room_id: Some(room_id),
            user: Some(user),
            err: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            room_id: None,
            user: None,
            err: Some(message.into()),
        }
    }
}

/// `sync` frame sent to a joining or reconnecting client (spec §6, §4.7).
#[derive(Clone, Debug, Serialize)]
pub struct SyncFrame {
    pub room_id: RoomId,
    pub seq: u64,
    pub users: Vec<UserRecord>,
    pub strokes: Vec<Stroke>,
    pub undone: Vec<StrokeId>,
    pub in_progress: Vec<Stroke>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserJoined {
    pub user: UserRecord,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserLeft {
    pub user_id: UserId,
}

/// Broadcast envelope, the unit of sequenced replication (spec §4, GLOSSARY).
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    pub seq: u64,
    pub op: ServerOp,
    pub by: UserId,
    pub ts: u64,
}

/// `msg` ack payload (spec §6): `{ok, seq?}`, `{ok, noOp:true}`, or
/// `{ok:false, err}`.
#[derive(Clone, Debug, Serialize)]
pub struct OpAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "noOp")]
    pub no_op: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl OpAck {
    pub fn applied(seq: u64) -> Self {
        Self {
            ok: true,
            seq: Some(seq),
            no_op: None,
            err: None,
        }
    }

    pub fn no_op() -> Self {
        Self {
            ok: true,
            seq: None,
            no_op: Some(true),
            err: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            seq: None,
            no_op: None,
            err: Some(message.into()),
        }
    }
}

/// Cursor update, client to server (spec §6): bypasses `seq` entirely.
#[derive(Clone, Debug, Deserialize)]
pub struct CursorIn {
    pub x: f64,
    pub y: f64,
}

/// Cursor update, server to other room members.
#[derive(Clone, Debug, Serialize)]
pub struct CursorOut {
    pub user_id: UserId,
    pub x: f64,
    pub y: f64,
}
