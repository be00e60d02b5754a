use serde::{Deserialize, Serialize};

use crate::ids::StrokeId;
use crate::stroke::{Point, Tool};

/// Shape of a client op exactly as it arrives over the wire (spec §4.1,
/// §6). Deserialization alone enforces basic JSON typing (a `width` that
/// isn't a number fails here); everything the validator additionally
/// checks — non-empty ids, known tool names, finite numbers, point-count
/// truncation — happens in `driftboard-validator` against this type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum RawOp {
    StrokeStart {
        stroke_id: String,
        tool: String,
        color: String,
        width: f64,
        x: f64,
        y: f64,
    },
    StrokePoints {
        stroke_id: String,
        points: Vec<Point>,
    },
    StrokeEnd {
        stroke_id: String,
    },
    Undo,
    Redo,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeStartOp {
    pub stroke_id: StrokeId,
    pub tool: Tool,
    pub color: String,
    pub width: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokePointsOp {
    pub stroke_id: StrokeId,
    pub points: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeEndOp {
    pub stroke_id: StrokeId,
}

/// A client op that has passed `driftboard-validator` and is ready to be
/// handed to `DrawingState::apply_client_op`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValidatedOp {
    StrokeStart(StrokeStartOp),
    StrokePoints(StrokePointsOp),
    StrokeEnd(StrokeEndOp),
    Undo,
    Redo,
}

/// The op as broadcast to every room member (spec §4.2). For
/// `stroke_start`/`stroke_points`/`stroke_end` this is a verbatim echo of
/// the validated client op; for `undo`/`redo` it carries the stroke id the
/// Drawing State actually chose, which the client never supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerOp {
    StrokeStart(StrokeStartOp),
    StrokePoints(StrokePointsOp),
    StrokeEnd(StrokeEndOp),
    Undo { stroke_id: StrokeId },
    Redo { stroke_id: StrokeId },
}
