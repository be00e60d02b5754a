//! A client-side mirror of `DrawingState`, replicating §4.2's op semantics
//! without the server's ownership/existence checks — the server has
//! already validated everything by the time an envelope reaches here.

use std::collections::{HashMap, HashSet};

use driftboard_types::{Envelope, ServerOp, Stroke, StrokeId, SyncFrame};

#[derive(Debug, Default, Clone)]
pub struct DrawingMirror {
    strokes: HashMap<StrokeId, Stroke>,
    committed_order: Vec<StrokeId>,
    undone: HashSet<StrokeId>,
}

impl DrawingMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mirror wholesale with a sync snapshot.
    pub fn reset_from_sync(&mut self, frame: &SyncFrame) {
        self.strokes.clear();
        self.committed_order.clear();
        self.undone.clear();

        self.committed_order = frame.strokes.iter().map(|s| s.id.clone()).collect();
        for stroke in frame.strokes.iter().cloned() {
            self.strokes.insert(stroke.id.clone(), stroke);
        }
        for stroke in frame.in_progress.iter().cloned() {
            self.strokes.insert(stroke.id.clone(), stroke);
        }
        self.undone = frame.undone.iter().cloned().collect();
    }

    /// Applies one broadcast envelope. `stroke_points` with no matching
    /// in-progress entry is logged and dropped rather than panicking —
    /// the one tolerance case worth calling out, for a near-join race.
    pub fn apply(&mut self, envelope: &Envelope) {
        match &envelope.op {
            ServerOp::StrokeStart(start) => {
                self.strokes.insert(
                    start.stroke_id.clone(),
                    Stroke {
                        id: start.stroke_id.clone(),
                        owner: envelope.by.clone(),
                        tool: start.tool,
                        color: start.color.clone(),
                        width: start.width,
                        points: vec![(start.x, start.y)],
                        committed: false,
                        created_at_ms: envelope.ts,
                        updated_at_ms: envelope.ts,
                    },
                );
            }
            ServerOp::StrokePoints(points) => match self.strokes.get_mut(&points.stroke_id) {
                Some(stroke) => {
                    stroke.points.extend(points.points.iter().copied());
                    stroke.updated_at_ms = envelope.ts;
                }
                None => {
                    tracing::warn!(stroke_id = %points.stroke_id, "stroke_points for unknown in-progress stroke, dropping");
                }
            },
            ServerOp::StrokeEnd(end) => match self.strokes.get_mut(&end.stroke_id) {
                Some(stroke) => {
                    stroke.committed = true;
                    stroke.updated_at_ms = envelope.ts;
                    self.committed_order.push(end.stroke_id.clone());
                    self.undone.remove(&end.stroke_id);
                }
                None => {
                    tracing::warn!(stroke_id = %end.stroke_id, "stroke_end for unknown stroke, dropping");
                }
            },
            ServerOp::Undo { stroke_id } => {
                self.undone.insert(stroke_id.clone());
            }
            ServerOp::Redo { stroke_id } => {
                self.undone.remove(stroke_id);
            }
        }
    }

    /// Active (committed, non-undone) strokes in commit order, for rendering.
    pub fn active_committed(&self) -> Vec<&Stroke> {
        self.committed_order
            .iter()
            .filter(|id| !self.undone.contains(*id))
            .filter_map(|id| self.strokes.get(id))
            .collect()
    }

    pub fn in_progress(&self) -> Vec<&Stroke> {
        self.strokes.values().filter(|s| !s.committed).collect()
    }

    pub fn is_undone(&self, id: &StrokeId) -> bool {
        self.undone.contains(id)
    }
}
