//! Small time helpers shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Used only for diagnostic/snapshot timestamps — never consulted by the
/// matching engine itself, which is a pure function of its command
/// sequence.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
