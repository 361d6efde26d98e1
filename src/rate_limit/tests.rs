//! Tests for the rate limiting module

use super::*;
use crate::config::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// ============================================================================
// SlidingWindow Tests
// ============================================================================

#[test]
fn test_window_admits_up_to_capacity() {
    let start = Instant::now();
    let mut window = SlidingWindow::new(2, Duration::from_secs(60));

    assert_eq!(window.admit(start), Admission::Granted);
    assert_eq!(window.admit(start + Duration::from_secs(5)), Admission::Granted);
    assert_eq!(
        window.admit(start + Duration::from_secs(20)),
        Admission::Wait(Duration::from_secs(40))
    );
    assert_eq!(window.in_window(start + Duration::from_secs(20)), 2);
}

#[test]
fn test_window_prunes_expired_entries() {
    let start = Instant::now();
    let mut window = SlidingWindow::new(2, Duration::from_secs(60));

    window.admit(start);
    window.admit(start + Duration::from_secs(30));

    // The first entry leaves the window exactly at start + 60s
    assert_eq!(
        window.admit(start + Duration::from_secs(60)),
        Admission::Granted
    );
    assert_eq!(window.oldest(), Some(start + Duration::from_secs(30)));
    assert_eq!(window.in_window(start + Duration::from_secs(95)), 1);
}

#[test]
fn test_window_wait_is_not_recorded() {
    let start = Instant::now();
    let mut window = SlidingWindow::new(1, Duration::from_secs(10));

    window.admit(start);
    for _ in 0..3 {
        assert!(matches!(window.admit(start), Admission::Wait(_)));
    }
    assert_eq!(window.in_window(start), 1);
}

#[test]
fn test_window_longer_than_clock_range() {
    let start = Instant::now();
    let mut window = SlidingWindow::new(1, Duration::MAX);

    assert_eq!(window.admit(start), Admission::Granted);
    assert_eq!(window.admit(start), Admission::Wait(Duration::MAX));
    assert_eq!(window.in_window(start + Duration::from_secs(3600)), 1);
}

#[test]
fn test_window_capacity_floor() {
    let window = SlidingWindow::new(0, Duration::from_secs(1));
    assert_eq!(window.capacity(), 1);
    assert_eq!(window.time_window(), Duration::from_secs(1));
}

// ============================================================================
// RateLimiter Tests (async)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_acquire_within_capacity_does_not_wait() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(3, Duration::from_secs(60)));
    let start = Instant::now();

    for _ in 0..3 {
        limiter.acquire().await;
    }

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.in_window().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_third_acquire_waits_for_oldest_to_expire() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(2, Duration::from_secs(60)));

    let first = Instant::now();
    limiter.acquire().await;
    tokio::time::advance(Duration::from_secs(10)).await;
    limiter.acquire().await;

    let before_third = Instant::now();
    limiter.acquire().await;

    let required = (first + Duration::from_secs(60)) - before_third;
    assert!(before_third.elapsed() >= required);
    assert_eq!(required, Duration::from_secs(50));
}

#[tokio::test(start_paused = true)]
async fn test_acquire_stays_pending_until_window_frees() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(1, Duration::from_secs(30)));
    limiter.acquire().await;

    assert_err!(tokio::time::timeout(Duration::from_secs(29), limiter.acquire()).await);
    assert_ok!(tokio::time::timeout(Duration::from_secs(2), limiter.acquire()).await);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_budget() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(2, Duration::from_secs(10)));
    let admitted = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let limiter = limiter.clone();
        let admitted = admitted.clone();
        handles.push(tokio::spawn(async move {
            limiter.acquire().await;
            admitted.lock().await.push(Instant::now());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut times = admitted.lock().await.clone();
    times.sort();
    assert_eq!(times.len(), 6);
    for pair in times.windows(3) {
        assert!(pair[2] - pair[0] >= Duration::from_secs(10));
    }
}

#[tokio::test(start_paused = true)]
async fn test_acquire_or_cancel_gives_up() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(1, Duration::from_secs(60)));
    limiter.acquire().await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    assert!(!limiter.acquire_or_cancel(&cancel).await);
    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(limiter.in_window().await, 1);
}

#[tokio::test]
async fn test_try_acquire() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(2, Duration::from_secs(60)));
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
}

#[test]
fn test_default_limiter_uses_default_config() {
    let limiter = RateLimiter::default();
    assert_eq!(limiter.config(), &RateLimitConfig::default());
}

// ============================================================================
// RateLimiter Tests (blocking)
// ============================================================================

#[test]
fn test_blocking_acquire_waits_for_window() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(2, Duration::from_millis(150)));
    let start = std::time::Instant::now();

    limiter.blocking_acquire();
    limiter.blocking_acquire();
    assert!(start.elapsed() < Duration::from_millis(150));

    limiter.blocking_acquire();
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[test]
fn test_blocking_acquire_shared_across_threads() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(2, Duration::from_millis(100)));
    let start = std::time::Instant::now();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let limiter = limiter.clone();
            scope.spawn(move || limiter.blocking_acquire());
        }
    });

    // Four admissions at two per window need at least one full window
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_blocking_acquire_or_cancel() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(1, Duration::from_secs(60)));
    limiter.blocking_acquire();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        trigger.cancel();
    });

    assert!(!limiter.blocking_acquire_or_cancel(&cancel));
    handle.join().unwrap();
}

#[test]
fn test_blocking_acquire_with_unbounded_window_waits_for_cancel() {
    let limiter = RateLimiter::new(&RateLimitConfig::new(1, Duration::MAX));
    limiter.blocking_acquire();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        trigger.cancel();
    });

    assert!(!limiter.blocking_acquire_or_cancel(&cancel));
    handle.join().unwrap();
}
