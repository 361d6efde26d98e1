//! Pagination module
//!
//! Supports: Offset/take (`skip_take`), Page number (`page_page_size`)
//!
//! # Overview
//!
//! The pagination module translates a zero-based page index into the
//! cursor parameters an endpoint expects and merges them with the caller's
//! own endpoint arguments into one [`PageRequest`] per call.

mod types;

pub use types::{encode_query, PageCursor, PageRequest, RequestArgs};
