//! Shared sliding-window rate limiter
//!
//! One limiter is created per engine and cloned into every partition fetch,
//! so the request budget is global rather than per partition. Waiters queue
//! on a fair async mutex and the holder sleeps until the window frees a slot,
//! which keeps admission in arrival order.

use super::window::{Admission, SlidingWindow};
use crate::config::RateLimitConfig;
use crate::pause::{blocking_pause, pause};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sliding-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    window: Arc<Mutex<SlidingWindow>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Arc::new(Mutex::new(SlidingWindow::new(
                config.max_requests_per_window,
                config.time_window,
            ))),
            config: *config,
        }
    }

    /// Create a rate limiter with default settings
    pub fn default_limiter() -> Self {
        Self::new(&RateLimitConfig::default())
    }

    /// Settings this limiter enforces
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a request can be made
    pub async fn acquire(&self) {
        let never = CancellationToken::new();
        self.acquire_or_cancel(&never).await;
    }

    /// Wait until a request can be made, giving up if `cancel` fires
    ///
    /// Returns `true` once admitted.
    pub async fn acquire_or_cancel(&self, cancel: &CancellationToken) -> bool {
        let mut window = tokio::select! {
            biased;
            () = cancel.cancelled() => return false,
            guard = self.window.lock() => guard,
        };
        loop {
            match window.admit(Instant::now()) {
                Admission::Granted => return true,
                Admission::Wait(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit window full, waiting");
                    if !pause(wait, cancel).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Block the current thread until a request can be made
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_acquire(&self) {
        let never = CancellationToken::new();
        self.blocking_acquire_or_cancel(&never);
    }

    /// Block the current thread until admitted or `cancel` fires
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_acquire_or_cancel(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        let mut window = self.window.blocking_lock();
        loop {
            match window.admit(Instant::now()) {
                Admission::Granted => return true,
                Admission::Wait(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit window full, waiting");
                    if !blocking_pause(wait, cancel) {
                        return false;
                    }
                }
            }
        }
    }

    /// Try to acquire a slot, returning immediately
    ///
    /// Returns `false` when the window is full or another caller holds the
    /// limiter.
    pub fn try_acquire(&self) -> bool {
        match self.window.try_lock() {
            Ok(mut window) => window.admit(Instant::now()) == Admission::Granted,
            Err(_) => false,
        }
    }

    /// Calls currently counted against the window
    pub async fn in_window(&self) -> usize {
        self.window.lock().await.in_window(Instant::now())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::default_limiter()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
