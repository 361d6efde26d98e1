//! Fetch result types
//!
//! What one partition fetch produces, both as the raw outcome handed back by
//! the drivers and as the immutable per-partition report.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a partition fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The endpoint reported 404; not retried
    NotFound,
    /// One page failed on every allowed attempt
    RetriesExhausted,
    /// The caller cancelled the fetch
    Cancelled,
    /// The partition's invoker panicked
    Panicked,
    /// The invoker for the partition could not be created
    Setup,
}

impl FailureKind {
    /// Classify a terminal fetch error
    pub fn of(error: &Error) -> Self {
        match error {
            Error::NotFound { .. } => Self::NotFound,
            Error::RetriesExhausted { .. } => Self::RetriesExhausted,
            Error::Cancelled => Self::Cancelled,
            Error::PartitionPanicked { .. } => Self::Panicked,
            _ => Self::Setup,
        }
    }
}

/// Raw result of driving one partition to completion
#[derive(Debug)]
pub struct FetchOutcome<T> {
    /// Items accumulated in page order
    pub items: Vec<T>,
    /// Successful calls
    pub pages_fetched: u32,
    /// Calls made, successful or not
    pub requests_made: u32,
    /// Retries scheduled after failed calls
    pub retries_made: u32,
    /// Terminal error, if the fetch failed
    pub error: Option<Error>,
}

impl<T> FetchOutcome<T> {
    /// An outcome for a fetch that failed before making any call
    pub fn failed(error: Error) -> Self {
        Self {
            items: Vec::new(),
            pages_fetched: 0,
            requests_made: 0,
            retries_made: 0,
            error: Some(error),
        }
    }

    /// Check if the fetch completed
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Items on success, the terminal error otherwise
    pub fn into_items(self) -> Result<Vec<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}

/// Report for one partition of a multi-partition fetch
///
/// Items fetched before a terminal failure are discarded, so a failed
/// partition always reports an empty `items`.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionResult<T> {
    /// Partition identifier
    pub partition_id: String,
    /// Items in page order
    pub items: Vec<T>,
    /// Whether the partition was fetched to exhaustion
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
    /// Failure classification
    pub failure: Option<FailureKind>,
    /// Calls made, successful or not
    pub requests_made: u32,
    /// Retries scheduled after failed calls
    pub retries_made: u32,
    /// When the fetch finished
    pub completed_at: DateTime<Utc>,
}

impl<T> PartitionResult<T> {
    /// Build the report for a finished fetch
    pub fn from_outcome(partition_id: impl Into<String>, outcome: FetchOutcome<T>) -> Self {
        let (items, success, error, failure) = match outcome.error {
            None => (outcome.items, true, None, None),
            Some(error) => (
                Vec::new(),
                false,
                Some(error.to_string()),
                Some(FailureKind::of(&error)),
            ),
        };
        Self {
            partition_id: partition_id.into(),
            items,
            success,
            error,
            failure,
            requests_made: outcome.requests_made,
            retries_made: outcome.retries_made,
            completed_at: Utc::now(),
        }
    }

    /// Report for a partition that failed before fetching
    pub fn failed(partition_id: impl Into<String>, error: Error) -> Self {
        Self::from_outcome(partition_id, FetchOutcome::failed(error))
    }

    /// Number of items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
