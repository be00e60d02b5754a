//! Client Reorder Buffer: buffers out-of-order envelopes until contiguous
//! sequence numbers arrive, then applies them to a local mirror of the
//! room's Drawing State.

mod mirror;

use std::collections::BTreeMap;

pub use mirror::DrawingMirror;

use driftboard_types::{Envelope, SyncFrame};

pub struct ReorderBuffer {
    expected_seq: u64,
    buffered: BTreeMap<u64, Envelope>,
    mirror: DrawingMirror,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self {
            expected_seq: 1,
            buffered: BTreeMap::new(),
            mirror: DrawingMirror::new(),
        }
    }

    pub fn expected_seq(&self) -> u64 {
        self.expected_seq
    }

    pub fn mirror(&self) -> &DrawingMirror {
        &self.mirror
    }

    /// A sync snapshot resets everything: `expectedSeq := sync.seq + 1`,
    /// the buffer is cleared, and the mirror is rebuilt from the snapshot.
    pub fn on_sync(&mut self, frame: SyncFrame) {
        self.expected_seq = frame.seq + 1;
        self.buffered.clear();
        self.mirror.reset_from_sync(&frame);
    }

    /// Feeds one arriving envelope. Duplicates/stale envelopes are
    /// discarded; early arrivals are buffered; the contiguous case applies
    /// the envelope and then drains any buffered entries it unblocks.
    pub fn on_envelope(&mut self, envelope: Envelope) {
        if envelope.seq < self.expected_seq {
            return;
        }
        if envelope.seq > self.expected_seq {
            self.buffered.insert(envelope.seq, envelope);
            return;
        }
        self.mirror.apply(&envelope);
        self.expected_seq += 1;
        while let Some(next) = self.buffered.remove(&self.expected_seq) {
            self.mirror.apply(&next);
            self.expected_seq += 1;
        }
    }
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftboard_types::{ServerOp, StrokeEndOp, StrokeId, UserId};

    fn envelope(seq: u64) -> Envelope {
        Envelope {
            seq,
            op: ServerOp::StrokeEnd(StrokeEndOp {
                stroke_id: StrokeId::new(format!("s{seq}")),
            }),
            by: UserId::new("a"),
            ts: seq,
        }
    }

    #[test]
    fn out_of_order_arrivals_apply_in_sequence_order() {
        let mut buffer = ReorderBuffer::new();
        buffer.expected_seq = 5;

        buffer.on_envelope(envelope(7));
        assert_eq!(buffer.expected_seq(), 5);
        buffer.on_envelope(envelope(6));
        assert_eq!(buffer.expected_seq(), 5);
        buffer.on_envelope(envelope(5));
        assert_eq!(buffer.expected_seq(), 8);
    }

    #[test]
    fn stale_envelope_below_expected_seq_is_discarded() {
        let mut buffer = ReorderBuffer::new();
        buffer.expected_seq = 10;
        buffer.on_envelope(envelope(3));
        assert_eq!(buffer.expected_seq(), 10);
        assert!(buffer.buffered.is_empty());
    }

    #[test]
    fn sync_resets_expected_seq_to_one_past_snapshot_seq() {
        let mut buffer = ReorderBuffer::new();
        let frame = SyncFrame {
            room_id: driftboard_types::RoomId::new("r"),
            seq: 12,
            users: vec![],
            strokes: vec![],
            undone: vec![],
            in_progress: vec![],
        };
        buffer.on_sync(frame);
        assert_eq!(buffer.expected_seq(), 13);
    }

    #[test]
    fn stroke_points_without_in_progress_entry_is_dropped_not_panicking() {
        let mut mirror = DrawingMirror::new();
        let envelope = Envelope {
            seq: 1,
            op: ServerOp::StrokePoints(driftboard_types::StrokePointsOp {
                stroke_id: StrokeId::new("ghost"),
                points: vec![(1.0, 1.0)],
            }),
            by: UserId::new("a"),
            ts: 1,
        };
        mirror.apply(&envelope);
        assert!(mirror.in_progress().is_empty());
    }
}
