//! Rate limiting module
//!
//! Sliding-window admission control shared by every caller of one engine.
//!
//! # Overview
//!
//! - [`SlidingWindow`] - the admission bookkeeping, free of clocks and locks
//! - [`RateLimiter`] - the shared, cloneable limiter used by both execution
//!   models; admission is serialised behind one async-aware mutex

mod limiter;
mod window;

pub use limiter::RateLimiter;
pub use window::{Admission, SlidingWindow};

#[cfg(test)]
mod tests;
