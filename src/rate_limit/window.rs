//! Sliding-window admission bookkeeping
//!
//! Holds the timestamps admitted within the trailing window. Callers pass the
//! current instant in, which keeps the window independent of any clock.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of asking the window for admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call was admitted and recorded
    Granted,
    /// The window is full; ask again after this long
    Wait(Duration),
}

/// Timestamps of admitted calls within the trailing window
///
/// Invariant: after any call to [`SlidingWindow::admit`], no more than
/// `max_requests` recorded timestamps are younger than `time_window`.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    max_requests: usize,
    time_window: Duration,
    admitted: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Create an empty window
    pub fn new(max_requests: u32, time_window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1) as usize,
            time_window,
            admitted: VecDeque::with_capacity(max_requests as usize),
        }
    }

    /// Drop timestamps that have left the window
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) >= self.time_window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit a call at `now`, or report how long until a slot frees up
    pub fn admit(&mut self, now: Instant) -> Admission {
        self.prune(now);
        if self.admitted.len() < self.max_requests {
            self.admitted.push_back(now);
            return Admission::Granted;
        }
        match self.admitted.front() {
            Some(&oldest) => match oldest.checked_add(self.time_window) {
                Some(frees_at) => Admission::Wait(frees_at.saturating_duration_since(now)),
                // The oldest call never leaves a window this long
                None => Admission::Wait(self.time_window),
            },
            None => {
                self.admitted.push_back(now);
                Admission::Granted
            }
        }
    }

    /// Calls currently counted against the window
    pub fn in_window(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.admitted.len()
    }

    /// Timestamp of the oldest call still in the window
    pub fn oldest(&self) -> Option<Instant> {
        self.admitted.front().copied()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.max_requests
    }

    /// Configured window length
    pub fn time_window(&self) -> Duration {
        self.time_window
    }
}
