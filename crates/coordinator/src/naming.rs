//! Profile name synthesis for scans that arrive without one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last stamp handed out, process-wide.
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// `<device>_profile_<nanos>`, where the stamp is a nanosecond wall-clock
/// reading bumped past the previous one so successive calls never repeat.
pub fn synthesize_profile_name(device_name: &str) -> String {
    format!("{device_name}_profile_{}", next_stamp())
}

fn next_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
