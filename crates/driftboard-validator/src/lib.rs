//! Schema-checks and clamps inbound client ops before they reach room
//! state (spec §4.1). Stateless: ownership and existence checks are the
//! Drawing State's job, not this one's.

use std::fmt;

use driftboard_types::{
    MAX_POINTS_PER_MESSAGE, RawOp, StrokeEndOp, StrokeId, StrokePointsOp, StrokeStartOp, Tool,
    ValidatedOp, clamp_width,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyStrokeId,
    UnknownTool(String),
    EmptyColor,
    NonFiniteNumber { field: &'static str },
    EmptyPointList,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStrokeId => write!(f, "stroke id must not be empty"),
            Self::UnknownTool(tool) => write!(f, "unknown tool: {tool}"),
            Self::EmptyColor => write!(f, "color must not be empty"),
            Self::NonFiniteNumber { field } => write!(f, "{field} must be a finite number"),
            Self::EmptyPointList => write!(f, "points must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates and normalizes a raw client op. Never touches room state.
pub fn validate(op: RawOp) -> Result<ValidatedOp, ValidationError> {
    match op {
        RawOp::StrokeStart {
            stroke_id,
            tool,
            color,
            width,
            x,
            y,
        } => {
            if stroke_id.trim().is_empty() {
                return Err(ValidationError::EmptyStrokeId);
            }
            let tool = Tool::parse(&tool).ok_or(ValidationError::UnknownTool(tool))?;
            if color.trim().is_empty() {
                return Err(ValidationError::EmptyColor);
            }
            if !x.is_finite() {
                return Err(ValidationError::NonFiniteNumber { field: "x" });
            }
            if !y.is_finite() {
                return Err(ValidationError::NonFiniteNumber { field: "y" });
            }
            Ok(ValidatedOp::StrokeStart(StrokeStartOp {
                stroke_id: StrokeId::new(stroke_id),
                tool,
                color,
                width: clamp_width(width),
                x,
                y,
            }))
        }
        RawOp::StrokePoints { stroke_id, points } => {
            if stroke_id.trim().is_empty() {
                return Err(ValidationError::EmptyStrokeId);
            }
            if points.is_empty() {
                return Err(ValidationError::EmptyPointList);
            }
            for (x, y) in &points {
                if !x.is_finite() || !y.is_finite() {
                    return Err(ValidationError::NonFiniteNumber { field: "points" });
                }
            }
            let mut points = points;
            points.truncate(MAX_POINTS_PER_MESSAGE);
            Ok(ValidatedOp::StrokePoints(StrokePointsOp {
                stroke_id: StrokeId::new(stroke_id),
                points,
            }))
        }
        RawOp::StrokeEnd { stroke_id } => {
            if stroke_id.trim().is_empty() {
                return Err(ValidationError::EmptyStrokeId);
            }
            Ok(ValidatedOp::StrokeEnd(StrokeEndOp {
                stroke_id: StrokeId::new(stroke_id),
            }))
        }
        RawOp::Undo => Ok(ValidatedOp::Undo),
        RawOp::Redo => Ok(ValidatedOp::Redo),
    }
}
