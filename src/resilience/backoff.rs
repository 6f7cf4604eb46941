//! Exponential backoff.

use std::time::Duration;

/// Delay before retry `attempt` (0-indexed): `base_ms * 2^attempt`, capped at `max_ms`.
///
/// No jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor);
    Duration::from_millis(delay_ms.min(max_ms))
}
