//! Multi-partition coordinator
//!
//! Runs one partition fetch per [`Partition`], at most
//! `max_concurrent_operations` at a time, all sharing one [`RateLimiter`].
//! A failing partition is reported in the [`AggregatedResult`] and never
//! stops its siblings.
//!
//! # Execution models
//!
//! - [`Coordinator::fetch_all`]: one tokio task per partition, gated by a
//!   `tokio::sync::Semaphore`
//! - [`Coordinator::fetch_all_blocking`]: `max_concurrent_operations` scoped
//!   worker threads pulling partitions from a shared queue
//!
//! Both aggregate the same way: items of successful partitions are merged in
//! the order the partitions were given, and every partition gets a
//! [`PartitionResult`], including ones that were cancelled before starting,
//! whose invoker could not be created, or whose invoker panicked.
//!
//! # Example
//!
//! ```rust,ignore
//! use branch_fetch::{Coordinator, EngineConfig, HttpInvoker, Partition, RequestArgs};
//!
//! let coordinator = Coordinator::new(EngineConfig::default())?;
//! let partitions = vec![Partition::new("north"), Partition::new("south")];
//! let result = coordinator
//!     .fetch_all(&partitions, &RequestArgs::new(), |p| {
//!         HttpInvoker::new(&format!("https://{}.example.com/members", p.id), timeout)
//!     })
//!     .await?;
//! ```

mod types;

pub use types::{AggregatedResult, Partition, PartitionSummary};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::fetch::{
    fetch_partition, fetch_partition_blocking, run_partition, run_partition_blocking,
    FetchOutcome, PartitionResult,
};
use crate::invoker::{BlockingInvoker, Invoker};
use crate::pagination::RequestArgs;
use crate::rate_limit::RateLimiter;
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

/// Fans partition fetches out under one rate limiter
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: EngineConfig,
    limiter: RateLimiter,
}

impl Coordinator {
    /// Create a coordinator with its own rate limiter
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let limiter = RateLimiter::new(&config.rate_limit);
        Ok(Self { config, limiter })
    }

    /// Share an existing rate limiter, e.g. with another coordinator
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    // ========================================================================
    // Async model
    // ========================================================================

    /// Fetch every partition on the async runtime
    ///
    /// `factory` builds the invoker for each partition. Returns `Err` only
    /// for duplicate partition ids; partition failures are reported in the
    /// result.
    pub async fn fetch_all<I, F>(
        &self,
        partitions: &[Partition],
        args: &RequestArgs,
        factory: F,
    ) -> Result<AggregatedResult<I::Item>>
    where
        I: Invoker + 'static,
        I::Item: Clone + 'static,
        F: FnMut(&Partition) -> Result<I>,
    {
        self.fetch_all_with_cancel(partitions, args, factory, &CancellationToken::new())
            .await
    }

    /// [`fetch_all`](Self::fetch_all) that stops when `cancel` fires
    pub async fn fetch_all_with_cancel<I, F>(
        &self,
        partitions: &[Partition],
        args: &RequestArgs,
        mut factory: F,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult<I::Item>>
    where
        I: Invoker + 'static,
        I::Item: Clone + 'static,
        F: FnMut(&Partition) -> Result<I>,
    {
        check_unique(partitions)?;
        info!(
            partitions = partitions.len(),
            max_concurrent = self.config.max_concurrent_operations,
            "Starting multi-partition fetch"
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.config.max_concurrent_operations,
        ));
        let args = Arc::new(args.clone());
        let mut slots = empty_slots(partitions.len());
        let mut tasks = JoinSet::new();

        for (index, partition) in partitions.iter().enumerate() {
            let invoker = match factory(partition) {
                Ok(invoker) => invoker,
                Err(e) => {
                    error!(partition = %partition.id, error = %e, "Failed to create invoker");
                    slots[index] = Some(PartitionResult::failed(partition.id.clone(), e));
                    continue;
                }
            };

            let id = partition.id.clone();
            let span = info_span!("partition", id = %id);
            let semaphore = Arc::clone(&semaphore);
            let limiter = self.limiter.clone();
            let config = self.config.pagination;
            let args = Arc::clone(&args);
            let cancel = cancel.clone();

            let task = async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let outcome = match permit {
                    None => FetchOutcome::failed(Error::Cancelled),
                    Some(_permit) => {
                        AssertUnwindSafe(run_partition(&invoker, &limiter, &config, args, &cancel))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|payload| FetchOutcome::failed(panicked(&id, payload)))
                    }
                };
                (index, report(id, outcome))
            };
            tasks.spawn(task.instrument(span));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Partition task did not complete"),
            }
        }

        Ok(aggregate(partitions, slots))
    }

    /// Fetch a single partition, failing on a terminal error
    pub async fn fetch_one<I: Invoker>(
        &self,
        invoker: &I,
        args: &RequestArgs,
    ) -> Result<Vec<I::Item>> {
        fetch_partition(invoker, &self.limiter, &self.config.pagination, args).await
    }

    // ========================================================================
    // Blocking model
    // ========================================================================

    /// Fetch every partition on worker threads, blocking the caller
    ///
    /// Must not be called from within an async runtime.
    pub fn fetch_all_blocking<I, F>(
        &self,
        partitions: &[Partition],
        args: &RequestArgs,
        factory: F,
    ) -> Result<AggregatedResult<I::Item>>
    where
        I: BlockingInvoker,
        I::Item: Clone,
        F: FnMut(&Partition) -> Result<I>,
    {
        self.fetch_all_blocking_with_cancel(partitions, args, factory, &CancellationToken::new())
    }

    /// [`fetch_all_blocking`](Self::fetch_all_blocking) that stops when
    /// `cancel` fires
    pub fn fetch_all_blocking_with_cancel<I, F>(
        &self,
        partitions: &[Partition],
        args: &RequestArgs,
        mut factory: F,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult<I::Item>>
    where
        I: BlockingInvoker,
        I::Item: Clone,
        F: FnMut(&Partition) -> Result<I>,
    {
        check_unique(partitions)?;
        info!(
            partitions = partitions.len(),
            max_concurrent = self.config.max_concurrent_operations,
            "Starting blocking multi-partition fetch"
        );

        let args = Arc::new(args.clone());
        let mut slots = empty_slots(partitions.len());

        let mut jobs = VecDeque::with_capacity(partitions.len());
        for (index, partition) in partitions.iter().enumerate() {
            match factory(partition) {
                Ok(invoker) => jobs.push_back((index, partition.id.clone(), invoker)),
                Err(e) => {
                    error!(partition = %partition.id, error = %e, "Failed to create invoker");
                    slots[index] = Some(PartitionResult::failed(partition.id.clone(), e));
                }
            }
        }

        let workers = self.config.max_concurrent_operations.min(jobs.len());
        let queue = Mutex::new(jobs);
        let limiter = &self.limiter;
        let config = &self.config.pagination;
        let (queue, args) = (&queue, &args);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut finished = Vec::new();
                        while let Some((index, id, invoker)) = next_job(queue) {
                            let span = info_span!("partition", id = %id);
                            let result = span.in_scope(|| {
                                let outcome = if cancel.is_cancelled() {
                                    FetchOutcome::failed(Error::Cancelled)
                                } else {
                                    std::panic::catch_unwind(AssertUnwindSafe(|| {
                                        run_partition_blocking(
                                            &invoker,
                                            limiter,
                                            config,
                                            Arc::clone(args),
                                            cancel,
                                        )
                                    }))
                                    .unwrap_or_else(|payload| {
                                        FetchOutcome::failed(panicked(&id, payload))
                                    })
                                };
                                report(id, outcome)
                            });
                            finished.push((index, result));
                        }
                        finished
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(finished) => {
                        for (index, result) in finished {
                            slots[index] = Some(result);
                        }
                    }
                    Err(_) => error!("Partition worker did not complete"),
                }
            }
        });

        Ok(aggregate(partitions, slots))
    }

    /// Blocking counterpart of [`fetch_one`](Self::fetch_one)
    pub fn fetch_one_blocking<I: BlockingInvoker>(
        &self,
        invoker: &I,
        args: &RequestArgs,
    ) -> Result<Vec<I::Item>> {
        fetch_partition_blocking(invoker, &self.limiter, &self.config.pagination, args)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn check_unique(partitions: &[Partition]) -> Result<()> {
    let mut seen = HashSet::with_capacity(partitions.len());
    for partition in partitions {
        if !seen.insert(partition.id.as_str()) {
            return Err(Error::DuplicatePartition {
                id: partition.id.clone(),
            });
        }
    }
    Ok(())
}

/// Pop the next queued partition; the lock is released before it runs
fn next_job<J>(queue: &Mutex<VecDeque<J>>) -> Option<J> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

fn empty_slots<T>(len: usize) -> Vec<Option<PartitionResult<T>>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

fn panicked(partition: &str, payload: Box<dyn Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    Error::PartitionPanicked {
        partition: partition.to_string(),
        message,
    }
}

/// Build and log the report for a finished partition
fn report<T>(partition_id: String, outcome: FetchOutcome<T>) -> PartitionResult<T> {
    let result = PartitionResult::from_outcome(partition_id, outcome);
    if result.success {
        info!(
            items = result.item_count(),
            requests = result.requests_made,
            retries = result.retries_made,
            "Partition fetched"
        );
    } else {
        error!(
            error = result.error.as_deref().unwrap_or_default(),
            requests = result.requests_made,
            "Partition failed"
        );
    }
    result
}

/// Merge partition reports in input order
fn aggregate<T: Clone>(
    partitions: &[Partition],
    slots: Vec<Option<PartitionResult<T>>>,
) -> AggregatedResult<T> {
    let mut data = Vec::new();
    let mut per_partition = BTreeMap::new();

    for (partition, slot) in partitions.iter().zip(slots) {
        let result = slot.unwrap_or_else(|| {
            PartitionResult::failed(
                partition.id.clone(),
                Error::partition(&partition.id, "fetch did not report a result"),
            )
        });
        if result.success {
            data.extend(result.items.iter().cloned());
        }
        per_partition.insert(partition.id.clone(), result);
    }

    let aggregated = AggregatedResult {
        data,
        per_partition,
    };
    info!(
        items = aggregated.data.len(),
        succeeded = aggregated.succeeded().count(),
        failed = aggregated.failed().count(),
        requests = aggregated.total_requests(),
        "Multi-partition fetch finished"
    );
    aggregated
}
