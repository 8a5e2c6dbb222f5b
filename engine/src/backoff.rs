use std::time::Duration;

/// Progressive delay before retry `attempt` (1-based): `min(attempt * step, cap)`.
pub fn progressive_backoff(attempt: u32, step: Duration, cap: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    step.saturating_mul(attempt).min(cap)
}
