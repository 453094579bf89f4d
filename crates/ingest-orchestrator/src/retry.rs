//! Per-item retry/backoff policy: transient errors are retried
//! with jittered exponential backoff up to `retry_max`; permanent errors
//! skip straight to a terminal state without consuming the retry budget.

use std::time::Duration;

use rand::Rng;

use ingest_core::IngestError;

/// `base * 2^attempt`, plus up to 25% jitter so a batch of simultaneously
/// failing items doesn't retry in lockstep.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exp = base.as_millis().saturating_mul(1u128 << attempt.min(16));
    #[allow(clippy::cast_possible_truncation)]
    let exp_ms = exp.min(u128::from(u64::MAX)) as u64;
    let jitter_ceiling = (exp_ms / 4).max(1);
    let jitter = rand::thread_rng().gen_range(0..=jitter_ceiling);
    Duration::from_millis(exp_ms + jitter)
}

/// What the Orchestrator should do with an item after a stage returned
/// `err` at `retry_count` prior attempts.
pub enum RetryDecision {
    /// Back off for `delay`, then re-enqueue at the stage it failed from.
    Retry { delay: Duration },
    /// Terminal skip that does not count against the retry budget
    /// (inaccessible content, for example).
    TerminalSkip,
    /// Terminal error: retries exhausted, or the error kind is not
    /// recoverable at all.
    TerminalError,
}

#[must_use]
pub fn decide(err: &IngestError, retry_count: u32, retry_max: u32, base: Duration) -> RetryDecision {
    if err.is_terminal_skip() {
        return RetryDecision::TerminalSkip;
    }
    if err.is_recoverable() && retry_count < retry_max {
        return RetryDecision::Retry {
            delay: backoff_delay(retry_count, base),
        };
    }
    RetryDecision::TerminalError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempt() {
        let d0 = backoff_delay(0, Duration::from_millis(100));
        let d3 = backoff_delay(3, Duration::from_millis(100));
        assert!(d3 > d0);
    }

    #[test]
    fn inaccessible_is_terminal_skip_regardless_of_retry_count() {
        let err = IngestError::Inaccessible {
            reason: "members-only".into(),
        };
        assert!(matches!(
            decide(&err, 0, 3, Duration::from_millis(100)),
            RetryDecision::TerminalSkip
        ));
    }

    #[test]
    fn transient_io_retries_until_max_then_terminal() {
        let err = IngestError::transient_io("timeout");
        assert!(matches!(
            decide(&err, 2, 3, Duration::from_millis(100)),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            decide(&err, 3, 3, Duration::from_millis(100)),
            RetryDecision::TerminalError
        ));
    }

    #[test]
    fn db_conflict_is_not_recoverable_via_this_policy() {
        let err = IngestError::db_conflict("duplicate key");
        assert!(matches!(
            decide(&err, 0, 3, Duration::from_millis(100)),
            RetryDecision::TerminalError
        ));
    }
}
