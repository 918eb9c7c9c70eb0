use std::future::Future;

use hoard_core::{FailureKind, RetryPolicy};

use crate::{EngineEvent, ProgressSink};

/// Result of a retried operation plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, FailureKind>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget
/// is spent. Transient failures sleep per the backoff policy in between.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    sink: &dyn ProgressSink,
    mut operation: F,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FailureKind>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt + 1,
                }
            }
            Err(reason) if reason.is_transient() && attempt + 1 < policy.max_retries => {
                let delay = policy.backoff.delay(attempt);
                sink.emit(EngineEvent::Retrying {
                    url: url.to_string(),
                    attempt,
                    delay,
                    reason,
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(reason) => {
                return Attempted {
                    result: Err(reason),
                    attempts: attempt + 1,
                }
            }
        }
    }
}
