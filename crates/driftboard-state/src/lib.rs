//! Per-room drawing state machine: stroke registry, committed order, undone
//! set, redo stack. `apply_client_op` is the single mutating entry point the
//! rest of the system goes through, so every invariant is enforced in one
//! place.

use std::collections::{HashMap, HashSet};
use std::fmt;

use driftboard_types::{
    PersistedRoom, ServerOp, Stroke, StrokeEndOp, StrokeId, StrokePointsOp, StrokeStartOp, UserId,
    ValidatedOp,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    UnknownStroke(StrokeId),
    DuplicateStroke(StrokeId),
    AlreadyCommitted(StrokeId),
    NotOwner {
        stroke_id: StrokeId,
        requester: UserId,
    },
    CorruptSnapshot(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStroke(id) => write!(f, "unknown stroke id: {id}"),
            Self::DuplicateStroke(id) => write!(f, "stroke id already exists: {id}"),
            Self::AlreadyCommitted(id) => write!(f, "stroke already committed: {id}"),
            Self::NotOwner {
                stroke_id,
                requester,
            } => write!(f, "user {requester} does not own stroke {stroke_id}"),
            Self::CorruptSnapshot(reason) => write!(f, "corrupt snapshot: {reason}"),
        }
    }
}

impl std::error::Error for StateError {}

/// Result of a successfully applied op: `None` means a suppressed no-op
/// undo/redo — the caller must not bump `seq` or emit an envelope for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub broadcast: Option<ServerOp>,
}

/// What a late joiner needs to render the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSnapshot {
    pub committed: Vec<Stroke>,
    pub in_progress: Vec<Stroke>,
    pub undone: Vec<StrokeId>,
}

#[derive(Debug, Default, Clone)]
pub struct DrawingState {
    strokes: HashMap<StrokeId, Stroke>,
    committed: HashSet<StrokeId>,
    committed_order: Vec<StrokeId>,
    undone: HashSet<StrokeId>,
    redo_stack: Vec<StrokeId>,
}

impl DrawingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single mutating entry point for every client op.
    pub fn apply_client_op(
        &mut self,
        user_id: &UserId,
        op: ValidatedOp,
        now_ms: u64,
    ) -> Result<ApplyOutcome, StateError> {
        match op {
            ValidatedOp::StrokeStart(start) => self.apply_stroke_start(user_id, start, now_ms),
            ValidatedOp::StrokePoints(points) => self.apply_stroke_points(user_id, points, now_ms),
            ValidatedOp::StrokeEnd(end) => self.apply_stroke_end(user_id, end, now_ms),
            ValidatedOp::Undo => Ok(ApplyOutcome {
                broadcast: self.apply_undo(),
            }),
            ValidatedOp::Redo => Ok(ApplyOutcome {
                broadcast: self.apply_redo(),
            }),
        }
    }

    fn apply_stroke_start(
        &mut self,
        user_id: &UserId,
        start: StrokeStartOp,
        now_ms: u64,
    ) -> Result<ApplyOutcome, StateError> {
        if self.strokes.contains_key(&start.stroke_id) {
            return Err(StateError::DuplicateStroke(start.stroke_id));
        }
        let stroke = Stroke {
            id: start.stroke_id.clone(),
            owner: user_id.clone(),
            tool: start.tool,
            color: start.color.clone(),
            width: start.width,
            points: vec![(start.x, start.y)],
            committed: false,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        self.strokes.insert(start.stroke_id.clone(), stroke);
        Ok(ApplyOutcome {
            broadcast: Some(ServerOp::StrokeStart(start)),
        })
    }

    fn apply_stroke_points(
        &mut self,
        user_id: &UserId,
        points: StrokePointsOp,
        now_ms: u64,
    ) -> Result<ApplyOutcome, StateError> {
        let stroke = self.writable_stroke_mut(user_id, &points.stroke_id)?;
        stroke.points.extend(points.points.iter().copied());
        stroke.updated_at_ms = now_ms;
        Ok(ApplyOutcome {
            broadcast: Some(ServerOp::StrokePoints(points)),
        })
    }

    fn apply_stroke_end(
        &mut self,
        user_id: &UserId,
        end: StrokeEndOp,
        now_ms: u64,
    ) -> Result<ApplyOutcome, StateError> {
        let stroke = self.writable_stroke_mut(user_id, &end.stroke_id)?;
        stroke.committed = true;
        stroke.updated_at_ms = now_ms;
        self.committed.insert(end.stroke_id.clone());
        self.committed_order.push(end.stroke_id.clone());
        self.redo_stack.clear();
        self.undone.remove(&end.stroke_id);
        Ok(ApplyOutcome {
            broadcast: Some(ServerOp::StrokeEnd(end)),
        })
    }

    /// Looks up a stroke that `stroke_points`/`stroke_end` may mutate:
    /// must exist, must not already be committed, must be owned by the
    /// caller.
    fn writable_stroke_mut(
        &mut self,
        user_id: &UserId,
        stroke_id: &StrokeId,
    ) -> Result<&mut Stroke, StateError> {
        let stroke = self
            .strokes
            .get_mut(stroke_id)
            .ok_or_else(|| StateError::UnknownStroke(stroke_id.clone()))?;
        if stroke.committed {
            return Err(StateError::AlreadyCommitted(stroke_id.clone()));
        }
        if &stroke.owner != user_id {
            return Err(StateError::NotOwner {
                stroke_id: stroke_id.clone(),
                requester: user_id.clone(),
            });
        }
        Ok(stroke)
    }

    /// Tail-to-head scan for the latest committed, non-undone stroke:
    /// global order, independent of author.
    fn apply_undo(&mut self) -> Option<ServerOp> {
        let target = self
            .committed_order
            .iter()
            .rev()
            .find(|id| self.committed.contains(*id) && !self.undone.contains(*id))
            .cloned()?;
        self.undone.insert(target.clone());
        self.redo_stack.push(target.clone());
        Some(ServerOp::Undo { stroke_id: target })
    }

    /// Pops the redo stack until it finds an id still eligible (committed
    /// and undone); anything popped that no longer qualifies is discarded
    /// as stale.
    fn apply_redo(&mut self) -> Option<ServerOp> {
        while let Some(id) = self.redo_stack.pop() {
            if self.committed.contains(&id) && self.undone.contains(&id) {
                self.undone.remove(&id);
                return Some(ServerOp::Redo { stroke_id: id });
            }
        }
        None
    }

    pub fn snapshot_view(&self) -> DrawingSnapshot {
        let committed = self
            .committed_order
            .iter()
            .filter_map(|id| self.strokes.get(id))
            .cloned()
            .collect();
        let in_progress = self
            .strokes
            .values()
            .filter(|s| !s.committed)
            .cloned()
            .collect();
        let undone = self
            .committed_order
            .iter()
            .filter(|id| self.undone.contains(*id))
            .cloned()
            .collect();
        DrawingSnapshot {
            committed,
            in_progress,
            undone,
        }
    }

    pub fn persistence_view(&self, seq: u64) -> PersistedRoom {
        let strokes = self
            .committed_order
            .iter()
            .filter_map(|id| self.strokes.get(id))
            .cloned()
            .collect();
        let undone = self
            .committed_order
            .iter()
            .filter(|id| self.undone.contains(*id))
            .cloned()
            .collect();
        PersistedRoom {
            seq,
            strokes,
            undone,
            committed_order: self.committed_order.clone(),
            redo_stack: self.redo_stack.clone(),
        }
    }

    /// Rebuilds a Drawing State from a persisted snapshot, re-validating
    /// every invariant rather than trusting the file on disk (see
    /// DESIGN.md for why this differs from a naive restore).
    pub fn restore(persisted: PersistedRoom) -> Result<Self, StateError> {
        let mut strokes = HashMap::with_capacity(persisted.strokes.len());
        let mut committed = HashSet::with_capacity(persisted.strokes.len());
        for mut stroke in persisted.strokes {
            stroke.committed = true;
            committed.insert(stroke.id.clone());
            if strokes.insert(stroke.id.clone(), stroke).is_some() {
                return Err(StateError::CorruptSnapshot(
                    "duplicate stroke id in persisted strokes".into(),
                ));
            }
        }

        let mut seen_in_order = HashSet::with_capacity(persisted.committed_order.len());
        for id in &persisted.committed_order {
            if !committed.contains(id) {
                return Err(StateError::CorruptSnapshot(format!(
                    "committed_order references unknown stroke {id}"
                )));
            }
            if !seen_in_order.insert(id.clone()) {
                return Err(StateError::CorruptSnapshot(format!(
                    "committed_order contains duplicate {id}"
                )));
            }
        }
        if seen_in_order.len() != committed.len() {
            return Err(StateError::CorruptSnapshot(
                "committed_order does not cover every committed stroke".into(),
            ));
        }

        let undone: HashSet<StrokeId> = persisted.undone.into_iter().collect();
        for id in &undone {
            if !committed.contains(id) {
                return Err(StateError::CorruptSnapshot(format!(
                    "undone references stroke {id} that is not committed"
                )));
            }
        }

        for id in &persisted.redo_stack {
            if !committed.contains(id) || !undone.contains(id) {
                return Err(StateError::CorruptSnapshot(format!(
                    "redo_stack entry {id} is not both committed and undone"
                )));
            }
        }

        Ok(Self {
            strokes,
            committed,
            committed_order: persisted.committed_order,
            undone,
            redo_stack: persisted.redo_stack,
        })
    }
}
