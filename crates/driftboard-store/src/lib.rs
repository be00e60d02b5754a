//! Per-room snapshot persistence (spec §4.3): atomic-by-rename JSON files
//! keyed by a sanitized room id, under a lazily-created data directory.
//!
//! Reads are tolerant: a missing or malformed file is reported the same
//! way as "no prior state" rather than failing the room boot (spec §7
//! "Snapshot corruption on boot").

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use driftboard_types::{PersistedRoom, RoomId};

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Encode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn room_path(&self, room_id: &RoomId) -> PathBuf {
        self.data_dir
            .join(format!("room_{}.json", sanitize_room_id(room_id.as_str())))
    }

    /// Loads a prior snapshot. Returns `None` for "no prior state" whether
    /// that's because the file doesn't exist or because it failed to
    /// parse — both are treated identically (spec §4.3, §7).
    pub fn load(&self, room_id: &RoomId) -> Option<PersistedRoom> {
        let path = self.room_path(room_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(room_id = %room_id, path = %path.display(), %err, "failed to read room snapshot");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(room_id = %room_id, path = %path.display(), %err, "malformed room snapshot, treating as no prior state");
                None
            }
        }
    }

    /// Writes a snapshot atomically: serialize, write a sibling temp path,
    /// rename over the final path. The data directory is created lazily
    /// on first write.
    pub fn save(&self, room_id: &RoomId, snapshot: &PersistedRoom) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|err| StoreError::Io(format!("create data dir: {err}")))?;

        let path = self.room_path(room_id);
        let temp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec(snapshot)
            .map_err(|err| StoreError::Encode(format!("encode room snapshot: {err}")))?;
        fs::write(&temp_path, &body)
            .map_err(|err| StoreError::Io(format!("write {}: {err}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .map_err(|err| StoreError::Io(format!("rename into {}: {err}", path.display())))?;
        Ok(())
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_` (spec §4.3).
/// This collapses distinct room ids that differ only in substituted
/// characters — no collision check is performed, matching the source
/// (see DESIGN.md Open Question).
fn sanitize_room_id(room_id: &str) -> String {
    room_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
