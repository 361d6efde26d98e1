//! Page loop state machine
//!
//! [`PartitionFetch`] holds every decision of the page loop: which page to
//! request, when the data is exhausted, when to retry and for how long to
//! wait. It performs no I/O and never sleeps. The async and blocking drivers
//! feed it invocation results and carry out the pauses it asks for.

use super::types::FetchOutcome;
use crate::backoff::BackoffPolicy;
use crate::config::PaginationConfig;
use crate::error::Error;
use crate::invoker::{ErrorKind, InvokeError, Response};
use crate::pagination::{PageCursor, PageRequest, RequestArgs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// What the driver does after feeding in one result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Pause, then issue [`PartitionFetch::request`] again
    Continue(Duration),
    /// Pause, then stop; the fetch succeeded
    Complete(Duration),
    /// Stop now; the fetch failed
    Abort,
}

/// State of one partition's page loop
#[derive(Debug)]
pub struct PartitionFetch<T> {
    config: PaginationConfig,
    backoff: BackoffPolicy,
    args: Arc<RequestArgs>,
    page_index: u32,
    attempt: u32,
    items: Vec<T>,
    pages_fetched: u32,
    requests_made: u32,
    retries_made: u32,
    error: Option<Error>,
    done: bool,
}

impl<T> PartitionFetch<T> {
    /// Start a fetch at page 0
    pub fn new(config: &PaginationConfig, args: Arc<RequestArgs>) -> Self {
        Self {
            config: *config,
            backoff: BackoffPolicy::from_config(config),
            args,
            page_index: 0,
            attempt: 0,
            items: Vec::new(),
            pages_fetched: 0,
            requests_made: 0,
            retries_made: 0,
            error: None,
            done: false,
        }
    }

    /// Request for the current page
    pub fn request(&self) -> PageRequest {
        PageRequest::new(
            self.page_index,
            PageCursor::from_config(&self.config, self.page_index),
            Arc::clone(&self.args),
        )
    }

    /// Check if the loop has stopped
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Current zero-based page index
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Calls made so far
    pub fn requests_made(&self) -> u32 {
        self.requests_made
    }

    /// Retries scheduled so far
    pub fn retries_made(&self) -> u32 {
        self.retries_made
    }

    /// Items accumulated so far
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Feed in a successful invocation
    pub fn on_response(&mut self, response: Response<T>) -> Transition {
        self.requests_made += 1;
        self.pages_fetched += 1;
        self.attempt = 0;
        let pause = self.config.post_request_delay;

        match response {
            Response::Single(item) => {
                debug!(page = self.page_index, "Single value returned, fetch complete");
                self.items.push(item);
                self.finish()
            }
            Response::Items(items) if items.is_empty() => {
                debug!(page = self.page_index, "Empty page, fetch complete");
                self.finish()
            }
            Response::Items(items) => {
                let count = items.len();
                self.items.extend(items);
                debug!(
                    page = self.page_index,
                    count,
                    total = self.items.len(),
                    "Fetched page"
                );
                if !self.config.supports_pagination || count < self.config.page_size as usize {
                    return self.finish();
                }
                self.page_index += 1;
                Transition::Continue(pause)
            }
        }
    }

    /// Feed in a failed invocation
    pub fn on_error(&mut self, failure: InvokeError) -> Transition {
        self.requests_made += 1;

        if failure.kind() == ErrorKind::NotFound {
            error!(page = self.page_index, error = %failure, "Endpoint not found, not retrying");
            return self.fail(Error::NotFound {
                message: failure.to_string(),
            });
        }

        self.attempt += 1;
        if self.attempt >= self.config.max_retries {
            error!(
                page = self.page_index,
                attempts = self.attempt,
                error = %failure,
                "Retries exhausted"
            );
            return self.fail(Error::RetriesExhausted {
                attempts: self.attempt,
                last_error: failure,
            });
        }

        let delay = self.backoff.delay_for(self.attempt, &failure);
        self.retries_made += 1;
        warn!(
            page = self.page_index,
            attempt = self.attempt,
            max_retries = self.config.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Request failed, retrying"
        );
        Transition::Continue(delay)
    }

    /// Stop the loop because the caller cancelled
    pub fn cancel(&mut self) {
        if !self.done {
            debug!(page = self.page_index, "Fetch cancelled");
            self.fail(Error::Cancelled);
        }
    }

    /// Consume the state into its outcome
    pub fn into_outcome(self) -> FetchOutcome<T> {
        FetchOutcome {
            items: self.items,
            pages_fetched: self.pages_fetched,
            requests_made: self.requests_made,
            retries_made: self.retries_made,
            error: self.error,
        }
    }

    fn finish(&mut self) -> Transition {
        self.done = true;
        Transition::Complete(self.config.post_request_delay)
    }

    fn fail(&mut self, error: Error) -> Transition {
        self.done = true;
        self.error = Some(error);
        Transition::Abort
    }
}
