//! Partition fetch module
//!
//! Drives one partition's endpoint through successive pages until the data
//! is exhausted, under the shared rate limiter, with retry and backoff.
//!
//! # Overview
//!
//! The page loop is written once, as the [`PartitionFetch`] state machine.
//! Two drivers run it:
//! - [`run_partition`] on the async runtime, where every wait yields
//! - [`run_partition_blocking`] on the current thread, where every wait parks
//!   only that thread
//!
//! Both report a [`FetchOutcome`]; [`fetch_partition`] and
//! [`fetch_partition_blocking`] turn a failed outcome into an `Err` for
//! callers that fetch a single partition directly.

mod state;
mod types;

pub use state::{PartitionFetch, Transition};
pub use types::{FailureKind, FetchOutcome, PartitionResult};

use crate::config::PaginationConfig;
use crate::error::Result;
use crate::invoker::{BlockingInvoker, Invoker};
use crate::pagination::RequestArgs;
use crate::pause::{blocking_pause, pause};
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drive one partition to completion on the async runtime
///
/// Cancellation is observed while waiting for admission, during an
/// in-flight call and during every pause. A successful fetch stays
/// successful if the token fires during its final pause.
pub async fn run_partition<I: Invoker>(
    invoker: &I,
    limiter: &RateLimiter,
    config: &PaginationConfig,
    args: Arc<RequestArgs>,
    cancel: &CancellationToken,
) -> FetchOutcome<I::Item> {
    let mut fetch = PartitionFetch::new(config, args);

    while !fetch.is_done() {
        let request = fetch.request();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = async {
                if limiter.acquire_or_cancel(cancel).await {
                    Some(invoker.invoke(request).await)
                } else {
                    None
                }
            } => result,
        };
        let Some(result) = result else {
            fetch.cancel();
            break;
        };

        let transition = match result {
            Ok(response) => fetch.on_response(response),
            Err(failure) => fetch.on_error(failure),
        };
        match transition {
            Transition::Continue(delay) => {
                if !pause(delay, cancel).await {
                    fetch.cancel();
                }
            }
            Transition::Complete(delay) => {
                pause(delay, cancel).await;
            }
            Transition::Abort => {}
        }
    }

    fetch.into_outcome()
}

/// Drive one partition to completion on the current thread
///
/// Cancellation is observed while waiting for admission and during every
/// pause; an in-flight blocking call runs to completion. Must not be called
/// from within an async runtime.
pub fn run_partition_blocking<I: BlockingInvoker>(
    invoker: &I,
    limiter: &RateLimiter,
    config: &PaginationConfig,
    args: Arc<RequestArgs>,
    cancel: &CancellationToken,
) -> FetchOutcome<I::Item> {
    let mut fetch = PartitionFetch::new(config, args);

    while !fetch.is_done() {
        if !limiter.blocking_acquire_or_cancel(cancel) {
            fetch.cancel();
            break;
        }

        let transition = match invoker.invoke(fetch.request()) {
            Ok(response) => fetch.on_response(response),
            Err(failure) => fetch.on_error(failure),
        };
        match transition {
            Transition::Continue(delay) => {
                if !blocking_pause(delay, cancel) {
                    fetch.cancel();
                }
            }
            Transition::Complete(delay) => {
                blocking_pause(delay, cancel);
            }
            Transition::Abort => {}
        }
    }

    fetch.into_outcome()
}

/// Fetch every page of a single partition, failing on a terminal error
pub async fn fetch_partition<I: Invoker>(
    invoker: &I,
    limiter: &RateLimiter,
    config: &PaginationConfig,
    args: &RequestArgs,
) -> Result<Vec<I::Item>> {
    let never = CancellationToken::new();
    run_partition(invoker, limiter, config, Arc::new(args.clone()), &never)
        .await
        .into_items()
}

/// Blocking counterpart of [`fetch_partition`]
pub fn fetch_partition_blocking<I: BlockingInvoker>(
    invoker: &I,
    limiter: &RateLimiter,
    config: &PaginationConfig,
    args: &RequestArgs,
) -> Result<Vec<I::Item>> {
    let never = CancellationToken::new();
    run_partition_blocking(invoker, limiter, config, Arc::new(args.clone()), &never).into_items()
}
