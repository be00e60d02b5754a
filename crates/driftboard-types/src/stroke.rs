use serde::{Deserialize, Serialize};

use crate::ids::{StrokeId, UserId};

/// Minimum and maximum stored stroke width, inclusive. Inbound widths are
/// clamped into this range rather than rejected.
pub const MIN_WIDTH: u32 = 1;
pub const MAX_WIDTH: u32 = 64;

/// Maximum points accepted from a single `stroke_points` message; any extra
/// points are truncated by the validator before they ever reach room state.
pub const MAX_POINTS_PER_MESSAGE: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Brush,
    Eraser,
    Rectangle,
    Circle,
    Square,
}

impl Tool {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "brush" => Some(Self::Brush),
            "eraser" => Some(Self::Eraser),
            "rectangle" => Some(Self::Rectangle),
            "circle" => Some(Self::Circle),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMode {
    Edit,
    View,
}

impl Default for UserMode {
    fn default() -> Self {
        Self::Edit
    }
}

/// A single 2D point in an in-progress or committed stroke's point list.
/// Serialized as a plain `[x, y]` pair to match the wire format in spec §4.1.
pub type Point = (f64, f64);

/// The atomic unit of drawing history (spec §3).
///
/// Once `committed` is true, `tool`, `color`, `width`, and `owner` never
/// change again (invariant 5); only `points` may still change while
/// `committed` is false, and `points` is frozen the instant `committed`
/// flips to true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub owner: UserId,
    pub tool: Tool,
    pub color: String,
    pub width: u32,
    pub points: Vec<Point>,
    pub committed: bool,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// A room member as seen by other members (spec §3 Room fields).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub name: String,
    pub color: String,
    pub mode: UserMode,
}

pub fn clamp_width(raw: f64) -> u32 {
    if !raw.is_finite() {
        return MIN_WIDTH;
    }
    (raw.round() as i64).clamp(MIN_WIDTH as i64, MAX_WIDTH as i64) as u32
}
