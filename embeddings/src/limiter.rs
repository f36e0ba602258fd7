//! Sliding-window call budget for the embedding provider.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Timestamps of provider calls made within a trailing window.
///
/// The window never holds more than `max_calls` timestamps: a call that would
/// exceed the budget is rejected instead of queued.
#[derive(Debug)]
pub struct RateWindow {
    calls: VecDeque<Instant>,
    window: Duration,
    max_calls: usize,
}

impl RateWindow {
    /// Create a window allowing `max_calls` calls per `window`.
    pub fn new(window: Duration, max_calls: usize) -> Self {
        Self {
            calls: VecDeque::with_capacity(max_calls),
            window,
            max_calls,
        }
    }

    /// Drop timestamps older than the window.
    pub fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.calls.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prune, then record a call at `now` if the budget allows it.
    ///
    /// Returns `false` when the budget is exhausted; the window is left
    /// unchanged apart from pruning.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.prune(now);
        if self.calls.len() >= self.max_calls {
            return false;
        }
        self.calls.push_back(now);
        true
    }

    /// Time until the oldest call leaves the window, if the window is full.
    pub fn retry_after(&self, now: Instant) -> Option<Duration> {
        if self.calls.len() < self.max_calls {
            return None;
        }
        self.calls
            .front()
            .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
