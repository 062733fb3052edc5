//! Trailing-edge debouncing with a reset-on-push deadline.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiet window before a region query fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Holds the latest pushed value until the input has been quiet for the
/// configured window.
///
/// Each push replaces the pending value and restarts the window. Earlier
/// values are discarded, never queued.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Debounce with a quiet window of `quiet`.
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Configured quiet window.
    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Replace the pending value and restart the window from now.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.quiet));
    }

    /// Instant at which the pending value fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Take the pending value if its window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.pending.take() {
            Some((value, deadline)) if deadline <= now => Some(value),
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::time::advance;

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_window() {
        let mut debouncer = Debouncer::default();
        debouncer.push(1);
        advance(Duration::from_millis(249)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);
        advance(Duration::from_millis(1)).await;
        assert_eq!(debouncer.take_due(Instant::now()), Some(1));
        assert_eq!(debouncer.deadline(), None);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn push_resets_the_window_and_keeps_the_latest() {
        let mut debouncer = Debouncer::default();
        debouncer.push(1);
        advance(Duration::from_millis(200)).await;
        debouncer.push(2);
        advance(Duration::from_millis(200)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);
        advance(Duration::from_millis(50)).await;
        assert_eq!(debouncer.take_due(Instant::now()), Some(2));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn cancel_clears_pending_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push("region");
        debouncer.cancel();
        advance(Duration::from_millis(20)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);
    }
}
