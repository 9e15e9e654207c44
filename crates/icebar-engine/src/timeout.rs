//! Deadline utilities for the search loop.

use std::time::{Duration, Instant};

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

pub(crate) fn overall_timeout_duration(timeout_secs: u64) -> Option<Duration> {
    if timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(timeout_secs))
    }
}

/// Deadline for a run starting at `start`, with `spent` already charged
/// against the budget.
pub(crate) fn deadline_from(start: Instant, timeout_secs: u64, spent: Duration) -> Option<Instant> {
    overall_timeout_duration(timeout_secs)
        .map(|t| t.saturating_sub(spent))
        .and_then(|t| start.checked_add(t))
}

pub(crate) fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
