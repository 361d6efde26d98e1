//! Invoker types and traits
//!
//! Defines the contract between the fetch engine and whatever performs the
//! actual network call.

use crate::pagination::PageRequest;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// `Retry-After: <seconds>` embedded in an error message
static RETRY_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry-after:\s*(\d+)").expect("valid regex"));

/// Longest server retry hint the fetch loop will wait out
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

static STATUS_429: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b429\b").expect("valid regex"));

static STATUS_404: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b404\b").expect("valid regex"));

// ============================================================================
// Invoke Error
// ============================================================================

/// How the fetch loop treats a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 429 / "Too Many Requests"; retried after the server hint or backoff
    RateLimited,
    /// 404 / "Not Found"; never retried
    NotFound,
    /// Anything else; retried with backoff
    Transient,
}

/// A failed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeError {
    /// HTTP status, when the call got that far
    pub status: Option<u16>,
    /// Human-readable failure text
    pub message: String,
    /// Server-supplied retry hint, when known outside the message
    pub retry_after: Option<Duration>,
}

impl InvokeError {
    /// Create an error from a message alone
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create an error with an HTTP status
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a 404 error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(404, message)
    }

    /// Create a 429 error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_status(429, message)
    }

    /// Attach a server-supplied retry hint
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Server retry hint, from the explicit field or a `Retry-After: N` in
    /// the message, capped at [`MAX_RETRY_AFTER`]
    pub fn retry_after_hint(&self) -> Option<Duration> {
        self.retry_after
            .or_else(|| {
                RETRY_AFTER
                    .captures(&self.message)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .map(Duration::from_secs)
            })
            .map(|hint| hint.min(MAX_RETRY_AFTER))
    }

    /// Classify this failure
    pub fn kind(&self) -> ErrorKind {
        match self.status {
            Some(404) => return ErrorKind::NotFound,
            Some(429) => return ErrorKind::RateLimited,
            _ => {}
        }
        if self.retry_after_hint().is_some()
            || self.message.contains("Too Many Requests")
            || STATUS_429.is_match(&self.message)
        {
            return ErrorKind::RateLimited;
        }
        if self.message.contains("Not Found") || STATUS_404.is_match(&self.message) {
            return ErrorKind::NotFound;
        }
        ErrorKind::Transient
    }

    /// Check if the fetch loop may retry this failure
    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::NotFound
    }
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for InvokeError {}

// ============================================================================
// Response
// ============================================================================

/// Data returned by one successful invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Response<T> {
    /// A page of items; an empty page signals the end of the data
    Items(Vec<T>),
    /// A single non-list value; the fetch completes with it
    Single(T),
}

impl<T> Response<T> {
    /// Number of items carried
    pub fn len(&self) -> usize {
        match self {
            Self::Items(items) => items.len(),
            Self::Single(_) => 1,
        }
    }

    /// Check if this carries no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<Vec<T>> for Response<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Items(items)
    }
}

/// Outcome of one invocation
pub type InvokeResult<T> = std::result::Result<Response<T>, InvokeError>;

// ============================================================================
// Invoker Traits
// ============================================================================

/// Performs one call for one page on the async runtime
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Item type produced by the endpoint
    type Item: Send;

    /// Perform the call described by `request`
    async fn invoke(&self, request: PageRequest) -> InvokeResult<Self::Item>;
}

/// Performs one call for one page on the current thread
pub trait BlockingInvoker: Send {
    /// Item type produced by the endpoint
    type Item: Send;

    /// Perform the call described by `request`
    fn invoke(&self, request: PageRequest) -> InvokeResult<Self::Item>;
}

#[async_trait]
impl<I: Invoker + ?Sized> Invoker for Arc<I> {
    type Item = I::Item;

    async fn invoke(&self, request: PageRequest) -> InvokeResult<Self::Item> {
        (**self).invoke(request).await
    }
}

impl<I: BlockingInvoker + Sync + ?Sized> BlockingInvoker for Arc<I> {
    type Item = I::Item;

    fn invoke(&self, request: PageRequest) -> InvokeResult<Self::Item> {
        (**self).invoke(request)
    }
}

// ============================================================================
// Closure Adapters
// ============================================================================

/// Async invoker backed by a closure
#[derive(Clone)]
pub struct FnInvoker<F> {
    f: F,
}

/// Wrap an async closure as an [`Invoker`]
pub fn invoker_fn<F, Fut, T>(f: F) -> FnInvoker<F>
where
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = InvokeResult<T>> + Send + 'static,
{
    FnInvoker { f }
}

#[async_trait]
impl<F, Fut, T> Invoker for FnInvoker<F>
where
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = InvokeResult<T>> + Send + 'static,
    T: Send + 'static,
{
    type Item = T;

    async fn invoke(&self, request: PageRequest) -> InvokeResult<T> {
        (self.f)(request).await
    }
}

impl<F> std::fmt::Debug for FnInvoker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnInvoker").finish_non_exhaustive()
    }
}

/// Blocking invoker backed by a closure
#[derive(Clone)]
pub struct BlockingFnInvoker<F> {
    f: F,
}

/// Wrap a blocking closure as a [`BlockingInvoker`]
pub fn blocking_invoker_fn<F, T>(f: F) -> BlockingFnInvoker<F>
where
    F: Fn(PageRequest) -> InvokeResult<T> + Send,
{
    BlockingFnInvoker { f }
}

impl<F, T> BlockingInvoker for BlockingFnInvoker<F>
where
    F: Fn(PageRequest) -> InvokeResult<T> + Send,
    T: Send,
{
    type Item = T;

    fn invoke(&self, request: PageRequest) -> InvokeResult<T> {
        (self.f)(request)
    }
}

impl<F> std::fmt::Debug for BlockingFnInvoker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingFnInvoker").finish_non_exhaustive()
    }
}
