//! Invoker module
//!
//! The invoker is the caller-supplied capability that performs one network
//! call for one page and returns its data or a failure. The engine never
//! looks past this boundary.
//!
//! # Overview
//!
//! - [`Invoker`] / [`BlockingInvoker`] - one call per page, async or blocking
//! - [`invoker_fn`] / [`blocking_invoker_fn`] - adapt plain closures
//! - [`InvokeError`] - failure carrying status and message for classification
//! - [`HttpInvoker`] - a `reqwest` adapter for JSON list endpoints

mod http;
mod types;

pub use http::HttpInvoker;
pub use types::{
    blocking_invoker_fn, invoker_fn, BlockingFnInvoker, BlockingInvoker, ErrorKind, FnInvoker,
    InvokeError, InvokeResult, Invoker, Response, MAX_RETRY_AFTER,
};
