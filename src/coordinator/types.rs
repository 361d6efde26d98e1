//! Coordinator types
//!
//! Partitions going in and the aggregated result coming out.

use crate::fetch::{FailureKind, PartitionResult};
use crate::types::{JsonValue, ValueMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One independently reachable backend shard
///
/// `values` is opaque to the engine; the invoker factory reads whatever
/// context it needs (base URL, credentials, extra arguments) from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Unique identifier
    pub id: String,
    /// Invocation context for this partition
    #[serde(default)]
    pub values: ValueMap,
}

impl Partition {
    /// Create a partition with no context
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: ValueMap::new(),
        }
    }

    /// Add a context value
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a context value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Get a string context value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(JsonValue::as_str)
    }
}

/// Result of a multi-partition fetch
///
/// `data` holds the items of every successful partition, in the order the
/// partitions were given and page order within each. Failed partitions
/// appear only in `per_partition`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedResult<T> {
    /// Items from all successful partitions
    pub data: Vec<T>,
    /// Report for every partition, keyed by id
    pub per_partition: BTreeMap<String, PartitionResult<T>>,
}

impl<T> AggregatedResult<T> {
    /// Check if every partition succeeded
    pub fn is_complete(&self) -> bool {
        self.per_partition.values().all(|r| r.success)
    }

    /// Report for one partition
    pub fn partition(&self, id: &str) -> Option<&PartitionResult<T>> {
        self.per_partition.get(id)
    }

    /// Partitions that failed
    pub fn failed(&self) -> impl Iterator<Item = &PartitionResult<T>> {
        self.per_partition.values().filter(|r| !r.success)
    }

    /// Partitions that succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &PartitionResult<T>> {
        self.per_partition.values().filter(|r| r.success)
    }

    /// Calls made across all partitions
    pub fn total_requests(&self) -> u64 {
        self.per_partition
            .values()
            .map(|r| u64::from(r.requests_made))
            .sum()
    }

    /// Retries made across all partitions
    pub fn total_retries(&self) -> u64 {
        self.per_partition
            .values()
            .map(|r| u64::from(r.retries_made))
            .sum()
    }

    /// Take the merged items
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Item-free per-partition summaries
    pub fn summary(&self) -> Vec<PartitionSummary> {
        self.per_partition
            .values()
            .map(PartitionSummary::from_result)
            .collect()
    }
}

/// A partition report without its items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    /// Partition identifier
    pub partition_id: String,
    /// Whether the partition was fetched to exhaustion
    pub success: bool,
    /// Items fetched
    pub item_count: usize,
    /// Calls made
    pub requests_made: u32,
    /// Retries made
    pub retries_made: u32,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// When the fetch finished
    pub completed_at: DateTime<Utc>,
}

impl PartitionSummary {
    /// Summarise a partition report
    pub fn from_result<T>(result: &PartitionResult<T>) -> Self {
        Self {
            partition_id: result.partition_id.clone(),
            success: result.success,
            item_count: result.item_count(),
            requests_made: result.requests_made,
            retries_made: result.retries_made,
            error: result.error.clone(),
            failure: result.failure,
            completed_at: result.completed_at,
        }
    }
}
