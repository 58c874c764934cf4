use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Source of wall-clock time and of the sleep used between polls.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Wait until the wall clock reaches `when`, re-reading it every `quantum`.
///
/// A single sleep for `when - now` would be measured on a monotonic clock
/// that stops while the machine is suspended. Short polls against the wall
/// clock fire on time after a resume.
///
/// Returns `false` if `cancel` fired before the deadline.
pub async fn wall_clock_wait<C: Clock + ?Sized>(
    clock: &C,
    when: DateTime<Utc>,
    quantum: Duration,
    cancel: &CancellationToken,
) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if clock.now() >= when {
            return true;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            _ = clock.sleep(quantum) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ManualClock;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn returns_immediately_when_due() {
        let clock = ManualClock::at(1_700_000_000);
        let cancel = CancellationToken::new();
        assert!(wall_clock_wait(&clock, clock.now(), Duration::from_secs(1), &cancel).await);
        assert_eq!(clock.sleeps(), 0);
    }

    #[tokio::test]
    async fn polls_until_deadline() {
        let clock = ManualClock::at(1_700_000_000);
        let start = clock.now();
        let cancel = CancellationToken::new();
        let when = start + TimeDelta::seconds(5);
        assert!(wall_clock_wait(&clock, when, Duration::from_secs(1), &cancel).await);
        assert_eq!(clock.now(), when);
        assert_eq!(clock.sleeps(), 5);
    }

    #[tokio::test]
    async fn honours_wall_clock_jumps() {
        let clock = ManualClock::at(1_700_000_000);
        let when = clock.now() + TimeDelta::hours(1);
        // Simulates a resume from suspend: wall time leaps past the deadline.
        clock.advance(TimeDelta::hours(2));
        let cancel = CancellationToken::new();
        assert!(wall_clock_wait(&clock, when, Duration::from_secs(1), &cancel).await);
        assert_eq!(clock.sleeps(), 0);
    }

    #[tokio::test]
    async fn cancellation_aborts_wait() {
        let clock = ManualClock::at(1_700_000_000);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let when = clock.now() + TimeDelta::days(1);
        assert!(!wall_clock_wait(&clock, when, Duration::from_secs(1), &cancel).await);
    }

    #[tokio::test]
    async fn system_clock_wait_is_cancellable() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let when = Utc::now() + TimeDelta::days(1);
        assert!(!wall_clock_wait(&SystemClock, when, Duration::from_millis(10), &cancel).await);
    }
}
