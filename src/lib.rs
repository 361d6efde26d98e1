// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # branch-fetch
//!
//! A resilient fetch engine for paginated list endpoints, run across many
//! independent backend partitions ("branches") at once.
//!
//! ## Features
//!
//! - **Exhaustive pagination**: `skip_take` and `page_page_size` addressing,
//!   stopping on a short or empty page
//! - **Global rate limiting**: one sliding-window budget shared by every
//!   partition of an operation
//! - **Retry with backoff**: exponential or constant, honouring server
//!   `Retry-After` hints; 404s are never retried
//! - **Failure isolation**: a failing partition is reported, never fatal to
//!   its siblings
//! - **Two execution models**: tokio tasks or blocking worker threads, with
//!   the same semantics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use branch_fetch::{Coordinator, EngineConfig, HttpInvoker, Partition, RequestArgs};
//!
//! #[tokio::main]
//! async fn main() -> branch_fetch::Result<()> {
//!     let config = EngineConfig::from_file("engine.yaml")?;
//!     let timeout = config.request_timeout;
//!     let coordinator = Coordinator::new(config)?;
//!
//!     let partitions = vec![Partition::new("north"), Partition::new("south")];
//!     let args = RequestArgs::new().with_arg("status", "active")?;
//!     let result = coordinator
//!         .fetch_all(&partitions, &args, |p| {
//!             HttpInvoker::new(&format!("https://{}.example.com/members", p.id), timeout)
//!         })
//!         .await?;
//!
//!     for failed in result.failed() {
//!         eprintln!("{}: {:?}", failed.partition_id, failed.error);
//!     }
//!     println!("{} records", result.data.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Coordinator                          │
//! │     fetch_all(partitions, args, factory) → AggregatedResult  │
//! └──────────────────────────────────────────────────────────────┘
//!                 │ one fetch per partition, bounded
//! ┌───────────────┴──────────────────────────────────────────────┐
//! │                    PartitionFetch (per page)                 │
//! │  RateLimiter.acquire → Invoker.invoke → next page / backoff  │
//! └──────────────────────────────────────────────────────────────┘
//!        │                   │                     │
//! ┌──────┴──────┐   ┌────────┴────────┐   ┌────────┴────────┐
//! │ RateLimiter │   │  PageCursor     │   │ BackoffPolicy   │
//! │ sliding     │   │  skip/take      │   │ exponential     │
//! │ window      │   │  page/page_size │   │ Retry-After     │
//! └─────────────┘   └─────────────────┘   └─────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Engine configuration
pub mod config;

/// Cancellable pauses
pub mod pause;

/// Shared sliding-window rate limiter
pub mod rate_limit;

/// Retry delay computation
pub mod backoff;

/// Page cursors and request arguments
pub mod pagination;

/// The per-page call capability
pub mod invoker;

/// Single-partition page loop
pub mod fetch;

/// Multi-partition fan-out and aggregation
pub mod coordinator;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use backoff::BackoffPolicy;
pub use config::{EngineConfig, PaginationConfig, RateLimitConfig};
pub use coordinator::{AggregatedResult, Coordinator, Partition, PartitionSummary};
pub use fetch::{fetch_partition, fetch_partition_blocking, FailureKind, PartitionResult};
pub use invoker::{
    blocking_invoker_fn, invoker_fn, BlockingInvoker, HttpInvoker, InvokeError, Invoker, Response,
};
pub use pagination::{PageCursor, PageRequest, RequestArgs};
pub use rate_limit::RateLimiter;
pub use tokio_util::sync::CancellationToken;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
