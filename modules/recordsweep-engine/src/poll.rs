//! Bounded polling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Poll `probe` every `interval` until it resolves with `Some`, or until
/// `budget` elapses, in which case `None` is returned.
///
/// The probe runs once immediately and once more at the deadline itself;
/// sleeps that would straddle the deadline are cut short rather than
/// overshooting it. This is the only wait mechanism in the workspace — every
/// "is the page ready yet" check goes through here so no wait is unbounded.
pub async fn poll_until<T, F, Fut>(interval: Duration, budget: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + budget;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn resolves_as_soon_as_the_probe_succeeds() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::from_millis(500), Duration::from_secs(60), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n >= 3 {
                    Some(n)
                } else {
                    None
                }
            }
        })
        .await;

        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_the_budget_with_a_final_probe_at_the_deadline() {
        let calls = AtomicU32::new(0);
        let result: Option<()> = poll_until(Duration::from_secs(1), Duration::from_secs(10), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert_eq!(result, None);
        // t = 0s..10s inclusive.
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_still_probes_once() {
        let calls = AtomicU32::new(0);
        let result: Option<()> = poll_until(Duration::from_millis(500), Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
