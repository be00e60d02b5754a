use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since epoch, the way `moire-web`'s own
/// `util::time` helpers compute `now_ms`/`now_nanos`.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
