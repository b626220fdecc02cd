use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Time-based unique token used for instance, set and dropset ids.
///
/// Millisecond timestamp, then a process-wide sequence number so ids minted
/// within the same millisecond still differ, then a random suffix so ids from
/// separate processes (or devices) don't collide.
pub fn new_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xffff;
    let salt: u16 = rand::thread_rng().gen();
    format!("{millis:x}-{seq:04x}{salt:04x}")
}

/// `m:ss` rendering for countdowns
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
