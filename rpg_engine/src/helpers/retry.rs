use std::time::Duration;

use log::*;

/// A sleep provider, injectable so polling loops are testable without real delays.
#[allow(async_fn_in_trait)]
pub trait Delay: Clone + Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// The production [`Delay`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A bounded fixed-interval polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { attempts: 30, interval: Duration::from_millis(500) }
    }
}

/// Polls `check` until it yields `Some(T)` or the attempt ceiling is reached. The loop blocks the caller for at
/// most `attempts * interval`; there is no background task.
pub async fn poll_until<T, E, F, Fut, D>(policy: PollPolicy, delay: &D, mut check: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, E>>,
    D: Delay,
{
    for attempt in 1..=policy.attempts {
        if let Some(value) = check().await? {
            trace!("Poll succeeded on attempt {attempt}/{}", policy.attempts);
            return Ok(Some(value));
        }
        if attempt < policy.attempts {
            delay.sleep(policy.interval).await;
        }
    }
    debug!("Poll gave up after {} attempts", policy.attempts);
    Ok(None)
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    /// Counts sleeps instead of sleeping.
    #[derive(Clone, Default)]
    struct InstantDelay {
        sleeps: Arc<AtomicUsize>,
    }

    impl Delay for InstantDelay {
        async fn sleep(&self, _duration: Duration) {
            self.sleeps.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn succeeds_as_soon_as_the_check_passes() {
        let delay = InstantDelay::default();
        let calls = AtomicUsize::new(0);
        let policy = PollPolicy { attempts: 10, interval: Duration::from_millis(500) };
        let result = poll_until(policy, &delay, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, ()>((n == 3).then_some("done"))
        })
        .await
        .unwrap();
        assert_eq!(result, Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(delay.sleeps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_ceiling() {
        let delay = InstantDelay::default();
        let calls = AtomicUsize::new(0);
        let policy = PollPolicy { attempts: 5, interval: Duration::from_millis(1) };
        let result = poll_until(policy, &delay, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<()>, ()>(None)
        })
        .await
        .unwrap();
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // No sleep after the final attempt.
        assert_eq!(delay.sleeps.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn check_errors_abort_the_loop() {
        let delay = InstantDelay::default();
        let result = poll_until(PollPolicy::default(), &delay, || async { Err::<Option<()>, _>("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
