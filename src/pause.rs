//! Cancellable pauses for both execution models
//!
//! The async pause yields to the scheduler; the blocking pause parks the
//! current thread in short slices so a cancelled token is noticed promptly.
//! Both return `false` when the token fired before the pause elapsed.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest stretch a blocking pause sleeps without checking the token
const BLOCKING_SLICE: Duration = Duration::from_millis(25);

/// Sleep on the async runtime unless cancelled first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Sleep on the current thread unless cancelled first
pub fn blocking_pause(duration: Duration, cancel: &CancellationToken) -> bool {
    // No representable deadline means the pause only ends on cancellation
    let deadline = std::time::Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = std::time::Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(BLOCKING_SLICE)
            }
            None => BLOCKING_SLICE,
        };
        std::thread::sleep(slice);
    }
}
