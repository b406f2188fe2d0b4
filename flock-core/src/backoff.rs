use crate::BACKOFF_STEP_SECS;
use std::time::Duration;

/// Delay before the next reconnect attempt.
///
/// `5 * (2 * retry + 1)` seconds, so 5s, 15s, 25s, 35s and so on. There is no
/// upper bound; callers that want one should cap `retry` themselves.
pub fn reconnect_delay(retry: u32) -> Duration {
    Duration::from_secs(BACKOFF_STEP_SECS * (2 * u64::from(retry) + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_growth() {
        let delays: Vec<_> = (0..4).map(reconnect_delay).map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![5, 15, 25, 35]);
    }

    #[test]
    fn large_retry_counts_do_not_overflow() {
        assert_eq!(
            reconnect_delay(u32::MAX),
            Duration::from_secs(5 * (2 * u64::from(u32::MAX) + 1))
        );
    }
}
