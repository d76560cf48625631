//! Backoff math for the outbox's retry loop.
//!
//! Unlike the host's own jittered retry primitive, this subsystem's backoff
//! is deliberately exact: `nextAttemptAt` must be reproducible in tests and
//! observable in `getStats()`, so no randomness is mixed in.

/// Compute the next retry delay in milliseconds.
///
/// Formula: `min(max_delay_ms, base_delay_ms * 2^(attempts_so_far - 1))`,
/// using a saturating shift so an unbounded `attempts` counter never panics
/// or overflows. `attempts_so_far` is 1-based (the count of attempts made,
/// including the one that just failed).
#[must_use]
pub fn backoff_delay_ms(attempts_so_far: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    let exponent = attempts_so_far.saturating_sub(1).min(62);
    let exponential = base_delay_ms.saturating_mul(1u64 << exponent);
    exponential.min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_uses_base_delay() {
        assert_eq!(backoff_delay_ms(1, 1000, 60_000), 1000);
    }

    #[test]
    fn grows_exponentially() {
        assert_eq!(backoff_delay_ms(2, 1000, 60_000), 2000);
        assert_eq!(backoff_delay_ms(3, 1000, 60_000), 4000);
        assert_eq!(backoff_delay_ms(4, 1000, 60_000), 8000);
    }

    #[test]
    fn caps_at_max_delay() {
        assert_eq!(backoff_delay_ms(10, 1000, 60_000), 60_000);
    }

    #[test]
    fn never_overflows_or_panics_at_huge_attempt_counts() {
        let delay = backoff_delay_ms(u32::MAX, 1000, 60_000);
        assert_eq!(delay, 60_000);
    }

    #[test]
    fn zero_attempts_behaves_like_first_attempt() {
        assert_eq!(backoff_delay_ms(0, 1000, 60_000), 1000);
    }
}
