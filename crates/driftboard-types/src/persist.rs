use serde::{Deserialize, Serialize};

use crate::ids::StrokeId;
use crate::stroke::Stroke;

/// On-disk shape of a room snapshot (spec §4.3, §6 "Persisted file
/// format"). In-progress strokes are deliberately never written here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedRoom {
    pub seq: u64,
    pub strokes: Vec<Stroke>,
    pub undone: Vec<StrokeId>,
    pub committed_order: Vec<StrokeId>,
    pub redo_stack: Vec<StrokeId>,
}
