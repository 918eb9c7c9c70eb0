use std::time::Duration;

use rand::Rng;

/// Exponential backoff: `base * 2^attempt + uniform(0, jitter_ceiling)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub jitter_ceiling: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, jitter_ceiling: Duration) -> Self {
        Self {
            base,
            jitter_ceiling,
        }
    }

    /// Deterministic part of the delay for a zero-based attempt index.
    pub fn floor(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = u64::try_from(self.jitter_ceiling.as_nanos()).unwrap_or(u64::MAX);
        let jitter = if ceiling == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rng.gen_range(0..ceiling))
        };
        self.floor(attempt).saturating_add(jitter)
    }
}

/// Process-wide retry budget shared by metadata and binary requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff,
        }
    }
}
