//! A single room's drawing state plus its membership table.
//!
//! `Room` itself is plain synchronous state; `spawn` below wraps one in a
//! dedicated `tokio` task that owns it exclusively; every mutation goes
//! through that task's command loop, so the room never needs a lock and a
//! throttled persist can run without holding one across the write.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use driftboard_state::{DrawingSnapshot, DrawingState, StateError};
use driftboard_store::Store;
use driftboard_types::{ConnectionId, PersistedRoom, RoomId, ServerOp, UserId, UserMode, UserRecord, ValidatedOp};

use crate::palette;
use crate::time::now_ms;

/// How long a room will go without writing its snapshot to disk again,
/// unless it's asked to shut down.
pub const PERSIST_THROTTLE_MS: u64 = 2_000;

/// Outcome of a successfully applied client op, as the dispatcher needs it:
/// the sequence number to stamp on the broadcast envelope, or `None` if the
/// op was a suppressed no-op undo/redo that must not be broadcast at all.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOp {
    pub seq: u64,
    pub op: ServerOp,
}

struct Room {
    id: RoomId,
    state: DrawingState,
    users: HashMap<ConnectionId, UserRecord>,
    seq: u64,
    last_persist_ms: u64,
}

impl Room {
    fn fresh(id: RoomId) -> Self {
        Self {
            id,
            state: DrawingState::new(),
            users: HashMap::new(),
            seq: 0,
            last_persist_ms: 0,
        }
    }

    fn from_persisted(id: RoomId, persisted: PersistedRoom) -> Result<Self, StateError> {
        let seq = persisted.seq;
        let state = DrawingState::restore(persisted)?;
        Ok(Self {
            id,
            state,
            users: HashMap::new(),
            seq,
            last_persist_ms: 0,
        })
    }

    fn colors_in_use(&self) -> Vec<&str> {
        self.users.values().map(|u| u.color.as_str()).collect()
    }

    fn add_user(&mut self, conn_id: ConnectionId, user_id: UserId, name: String, mode: UserMode) -> UserRecord {
        let color = palette::assign_color(&self.colors_in_use());
        let record = UserRecord {
            user_id,
            name,
            color,
            mode,
        };
        self.users.insert(conn_id, record.clone());
        record
    }

    /// Returns `true` if removing this connection leaves the room empty.
    fn remove_user(&mut self, conn_id: ConnectionId) -> bool {
        self.users.remove(&conn_id);
        self.users.is_empty()
    }

    fn apply_op(&mut self, user_id: &UserId, op: ValidatedOp, now_ms: u64) -> Result<Option<AppliedOp>, StateError> {
        let outcome = self.state.apply_client_op(user_id, op, now_ms)?;
        let Some(op) = outcome.broadcast else {
            return Ok(None);
        };
        self.seq += 1;
        Ok(Some(AppliedOp { seq: self.seq, op }))
    }

    fn snapshot(&self) -> (u64, Vec<UserRecord>, DrawingSnapshot) {
        (self.seq, self.users.values().cloned().collect(), self.state.snapshot_view())
    }

    fn persisted_snapshot(&self) -> PersistedRoom {
        self.state.persistence_view(self.seq)
    }

    /// Materializes a snapshot to write only if the throttle window has
    /// elapsed, and stamps `last_persist_ms` as if the write already
    /// happened — the caller is expected to actually perform it.
    fn snapshot_if_due(&mut self, now_ms: u64) -> Option<PersistedRoom> {
        if now_ms.saturating_sub(self.last_persist_ms) < PERSIST_THROTTLE_MS {
            return None;
        }
        self.last_persist_ms = now_ms;
        Some(self.persisted_snapshot())
    }
}

enum Command {
    AddUser {
        conn_id: ConnectionId,
        user_id: UserId,
        name: String,
        mode: UserMode,
        reply: oneshot::Sender<UserRecord>,
    },
    RemoveUser {
        conn_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    ApplyOp {
        user_id: UserId,
        op: ValidatedOp,
        reply: oneshot::Sender<Result<Option<AppliedOp>, StateError>>,
    },
    Sync {
        reply: oneshot::Sender<(u64, Vec<UserRecord>, DrawingSnapshot)>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// A cheap handle to a running room actor. Cloning it is cheap (it's just a
/// channel sender); the actor task itself owns the only `Room`.
#[derive(Clone)]
pub struct RoomHandle {
    id: RoomId,
    tx: mpsc::UnboundedSender<Command>,
}

impl RoomHandle {
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub async fn add_user(&self, conn_id: ConnectionId, user_id: UserId, name: String, mode: UserMode) -> UserRecord {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::AddUser {
            conn_id,
            user_id,
            name,
            mode,
            reply,
        });
        rx.await.expect("room actor dropped reply sender")
    }

    /// Returns `true` if the room is now empty.
    pub async fn remove_user(&self, conn_id: ConnectionId) -> bool {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::RemoveUser { conn_id, reply });
        rx.await.unwrap_or(true)
    }

    pub async fn apply_op(&self, user_id: UserId, op: ValidatedOp) -> Result<Option<AppliedOp>, StateError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::ApplyOp { user_id, op, reply });
        rx.await.expect("room actor dropped reply sender")
    }

    pub async fn sync(&self) -> (u64, Vec<UserRecord>, DrawingSnapshot) {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Sync { reply });
        rx.await.expect("room actor dropped reply sender")
    }

    /// Asks the actor to force one last persist and stop. Idempotent to
    /// call more than once; the second call will simply find the channel
    /// closed.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Boots a room actor, restoring prior state from `store` if present and
/// parseable. A present-but-invalid snapshot is logged and treated as no
/// prior state, same as the store's own tolerant read.
///
/// The snapshot read runs on the blocking pool rather than inline, so a
/// cold-start load for one room never stalls the caller's executor thread
/// (spec §5: cross-room operations must run fully in parallel).
pub async fn spawn(id: RoomId, store: Store) -> RoomHandle {
    let load_store = store.clone();
    let load_id = id.clone();
    let loaded = tokio::task::spawn_blocking(move || load_store.load(&load_id))
        .await
        .unwrap_or(None);

    let room = match loaded {
        Some(persisted) => match Room::from_persisted(id.clone(), persisted) {
            Ok(room) => room,
            Err(err) => {
                tracing::warn!(room_id = %id, %err, "persisted room failed invariant checks, starting fresh");
                Room::fresh(id.clone())
            }
        },
        None => Room::fresh(id.clone()),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(room, store, rx));
    RoomHandle { id, tx }
}

async fn run(mut room: Room, store: Store, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::AddUser {
                conn_id,
                user_id,
                name,
                mode,
                reply,
            } => {
                let record = room.add_user(conn_id, user_id, name, mode);
                let _ = reply.send(record);
            }
            Command::RemoveUser { conn_id, reply } => {
                let empty = room.remove_user(conn_id);
                let _ = reply.send(empty);
            }
            Command::ApplyOp { user_id, op, reply } => {
                let result = room.apply_op(&user_id, op, now_ms());
                if matches!(result, Ok(Some(_))) {
                    maybe_persist(&mut room, &store);
                }
                let _ = reply.send(result);
            }
            Command::Sync { reply } => {
                let _ = reply.send(room.snapshot());
            }
            Command::Shutdown { reply } => {
                persist_now(&room, &store).await;
                let _ = reply.send(());
                break;
            }
        }
    }
}

/// Dispatches a throttled write without blocking the actor's command loop
/// on disk I/O: the snapshot is materialized inline (cheap, it's just
/// cloning in-memory state) and the write itself runs on the blocking pool.
fn maybe_persist(room: &mut Room, store: &Store) {
    let Some(snapshot) = room.snapshot_if_due(now_ms()) else {
        return;
    };
    let store = store.clone();
    let room_id = room.id.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = store.save(&room_id, &snapshot) {
            tracing::warn!(room_id = %room_id, %err, "failed to persist room snapshot");
        }
    });
}

/// Forces a write regardless of the throttle window, used on shutdown so
/// the last writer out never loses unsaved history. Like `maybe_persist`,
/// the write itself runs on the blocking pool; unlike it, the caller awaits
/// completion so the room actor doesn't exit before the write lands.
async fn persist_now(room: &Room, store: &Store) {
    let snapshot = room.persisted_snapshot();
    let store = store.clone();
    let room_id = room.id.clone();
    let result = tokio::task::spawn_blocking(move || store.save(&room_id, &snapshot)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(room_id = %room.id, %err, "failed to persist room snapshot on shutdown");
        }
        Err(err) => {
            tracing::warn!(room_id = %room.id, %err, "persist-on-shutdown task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftboard_types::{StrokeEndOp, StrokeId, StrokeStartOp, Tool};

    fn persisted_restart_fixture() -> PersistedRoom {
        let stroke = |id: &str| driftboard_types::Stroke {
            id: StrokeId::new(id),
            owner: UserId::new("a"),
            tool: Tool::Brush,
            color: "#000".into(),
            width: 4,
            points: vec![(0.0, 0.0)],
            committed: true,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        PersistedRoom {
            seq: 12,
            strokes: vec![stroke("X"), stroke("Y"), stroke("Z")],
            undone: vec![StrokeId::new("Y")],
            committed_order: vec![StrokeId::new("X"), StrokeId::new("Y"), StrokeId::new("Z")],
            redo_stack: vec![StrokeId::new("Y")],
        }
    }

    /// Spec §8 scenario 6, "Restart durability": committedOrder [X,Y,Z],
    /// undone {Y}, redoStack [Y], seq=12. On first rejoin after restart,
    /// sync must report seq=12, three committed strokes, undone=[Y], and
    /// no in-progress strokes (they're never persisted).
    #[test]
    fn from_persisted_reports_the_restart_durability_scenario() {
        let room = Room::from_persisted(RoomId::new("r1"), persisted_restart_fixture()).unwrap();

        let (seq, users, snapshot) = room.snapshot();
        assert_eq!(seq, 12);
        assert!(users.is_empty());
        assert_eq!(snapshot.committed.len(), 3);
        assert_eq!(snapshot.undone, vec![StrokeId::new("Y")]);
        assert!(snapshot.in_progress.is_empty());
    }

    #[test]
    fn from_persisted_rejects_an_invariant_violating_snapshot() {
        let mut bad = persisted_restart_fixture();
        bad.undone.push(StrokeId::new("X")); // X has no entry in redo_stack but that's fine
        bad.redo_stack.push(StrokeId::new("Z")); // Z is committed but not undone: invalid
        assert!(Room::from_persisted(RoomId::new("r1"), bad).is_err());
    }

    #[test]
    fn apply_op_bumps_seq_only_when_the_op_broadcasts() {
        let mut room = Room::fresh(RoomId::new("r2"));
        let user = UserId::new("a");

        // An undo with nothing committed is a suppressed no-op: no seq bump.
        let outcome = room.apply_op(&user, ValidatedOp::Undo, 1).unwrap();
        assert!(outcome.is_none());
        assert_eq!(room.seq, 0);

        let start = ValidatedOp::StrokeStart(StrokeStartOp {
            stroke_id: StrokeId::new("A1"),
            tool: Tool::Brush,
            color: "#000".into(),
            width: 4,
            x: 0.0,
            y: 0.0,
        });
        let applied = room.apply_op(&user, start, 2).unwrap().unwrap();
        assert_eq!(applied.seq, 1);

        let end = ValidatedOp::StrokeEnd(StrokeEndOp {
            stroke_id: StrokeId::new("A1"),
        });
        let applied = room.apply_op(&user, end, 3).unwrap().unwrap();
        assert_eq!(applied.seq, 2);
    }

    #[test]
    fn snapshot_if_due_respects_the_throttle_window() {
        let mut room = Room::fresh(RoomId::new("r3"));

        // last_persist_ms starts at 0; the window has already elapsed by
        // the time the throttle constant's worth of ms has passed.
        assert!(room.snapshot_if_due(PERSIST_THROTTLE_MS).is_some());
        // Immediately after, the window has not yet elapsed again.
        assert!(room.snapshot_if_due(PERSIST_THROTTLE_MS + 500).is_none());
        // Once a full window has passed since the last persist, it's due again.
        assert!(room
            .snapshot_if_due(PERSIST_THROTTLE_MS + PERSIST_THROTTLE_MS + 1)
            .is_some());
    }

    #[tokio::test]
    async fn shutdown_forces_a_persist_even_within_the_throttle_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let room_id = RoomId::new("shutdown-room");

        let handle = spawn(room_id.clone(), store.clone()).await;
        handle
            .add_user(ConnectionId::FIRST, UserId::new("a"), "Ada".into(), UserMode::Edit)
            .await;
        handle
            .apply_op(
                UserId::new("a"),
                ValidatedOp::StrokeStart(StrokeStartOp {
                    stroke_id: StrokeId::new("A1"),
                    tool: Tool::Brush,
                    color: "#000".into(),
                    width: 4,
                    x: 0.0,
                    y: 0.0,
                }),
            )
            .await
            .unwrap();
        handle
            .apply_op(
                UserId::new("a"),
                ValidatedOp::StrokeEnd(StrokeEndOp {
                    stroke_id: StrokeId::new("A1"),
                }),
            )
            .await
            .unwrap();

        // Well within the 2s throttle window, so nothing has hit disk yet.
        assert!(store.load(&room_id).is_none());

        handle.shutdown().await;

        let persisted = store.load(&room_id).expect("shutdown must force a persist");
        assert_eq!(persisted.seq, 2);
        assert_eq!(persisted.committed_order, vec![StrokeId::new("A1")]);
    }
}
