//! Bounded retry with a fixed delay
//!
//! Used to poll for something that is expected to appear shortly, such as a
//! fresh upload becoming visible in the catalog. Every attempt either
//! finds the value, misses, or errors; errors count as misses. There is no
//! sleep after the last attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempt count and constant delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRetry {
    pub attempts: u32,
    pub delay: Duration,
}

impl FixedRetry {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// How a bounded retry ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Confirmed { value: T, attempts: u32 },
    /// Every attempt missed. `last_error` is the error of the final attempt, if it errored.
    Exhausted { attempts: u32, last_error: Option<E> },
}

/// Run `operation` up to `policy.attempts` times. The attempt number
/// (starting at 1) is passed in.
pub async fn retry_fixed<F, Fut, T, E>(
    operation_name: &str,
    policy: FixedRetry,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        match operation(attempt).await {
            Ok(Some(value)) => {
                tracing::debug!(operation = operation_name, attempt, "Confirmed");
                return RetryOutcome::Confirmed {
                    value,
                    attempts: attempt,
                };
            }
            Ok(None) => {
                tracing::debug!(operation = operation_name, attempt, "Not found yet");
                last_error = None;
            }
            Err(err) => {
                tracing::warn!(operation = operation_name, attempt, error = %err, "Attempt failed");
                last_error = Some(err);
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::error!(
        operation = operation_name,
        attempts = policy.attempts,
        "Gave up waiting for confirmation"
    );
    RetryOutcome::Exhausted {
        attempts: policy.attempts,
        last_error,
    }
}
