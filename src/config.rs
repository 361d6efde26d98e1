//! Engine configuration
//!
//! This module contains the configuration structures recognised by the fetch
//! engine. Every structure can be loaded from YAML or JSON; any subset of
//! fields may be given and the rest fall back to their defaults.
//!
//! ```yaml
//! pagination:
//!   page_size: 50
//!   max_retries: 5
//!   base_delay: 1.5
//!   exponential: true
//!   supports_pagination: true
//!   pagination_type: skip_take
//!   post_request_delay: 1.0
//! rate_limit:
//!   max_requests_per_window: 40
//!   time_window: 60
//! max_concurrent_operations: 5
//! request_timeout: 30
//! ```

use crate::error::{Error, Result};
use crate::types::PaginationType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Pagination Config
// ============================================================================

/// Per-operation pagination and retry settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Number of items requested per page
    pub page_size: u32,
    /// Attempts allowed for a single page before the fetch fails
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    /// Double the delay on each further attempt
    pub exponential: bool,
    /// Whether the endpoint accepts paging parameters at all
    pub supports_pagination: bool,
    /// How pages are addressed
    #[serde(rename = "pagination_type")]
    pub strategy: PaginationType,
    /// Pause after every successful call
    #[serde(with = "duration_secs")]
    pub post_request_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_retries: 5,
            base_delay: Duration::from_millis(1500),
            exponential: true,
            supports_pagination: true,
            strategy: PaginationType::OffsetTake,
            post_request_delay: Duration::from_secs(1),
        }
    }
}

impl PaginationConfig {
    /// Create a pagination config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay and whether it grows exponentially
    #[must_use]
    pub fn with_backoff(mut self, base_delay: Duration, exponential: bool) -> Self {
        self.base_delay = base_delay;
        self.exponential = exponential;
        self
    }

    /// Set pagination strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: PaginationType) -> Self {
        self.strategy = strategy;
        self
    }

    /// Mark the endpoint as not paginated (single call)
    #[must_use]
    pub fn without_pagination(mut self) -> Self {
        self.supports_pagination = false;
        self
    }

    /// Set the pause after every successful call
    #[must_use]
    pub fn with_post_request_delay(mut self, delay: Duration) -> Self {
        self.post_request_delay = delay;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value(
                "page_size",
                "must be greater than zero",
            ));
        }
        if self.max_retries == 0 {
            return Err(Error::invalid_value(
                "max_retries",
                "must allow at least one attempt",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Rate Limit Config
// ============================================================================

/// Sliding-window admission settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls admitted within one window
    pub max_requests_per_window: u32,
    /// Length of the trailing window
    #[serde(with = "duration_secs")]
    pub time_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 40,
            time_window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit config
    pub fn new(max_requests_per_window: u32, time_window: Duration) -> Self {
        Self {
            max_requests_per_window,
            time_window,
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_requests_per_window == 0 {
            return Err(Error::invalid_value(
                "max_requests_per_window",
                "must be greater than zero",
            ));
        }
        if self.time_window.is_zero() {
            return Err(Error::invalid_value(
                "time_window",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Engine Config
// ============================================================================

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pagination and retry settings
    pub pagination: PaginationConfig,
    /// Global admission control
    pub rate_limit: RateLimitConfig,
    /// Partition fetches allowed in flight at once
    pub max_concurrent_operations: usize,
    /// Timeout applied to each HTTP call made by the bundled invoker
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            max_concurrent_operations: 5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Create an engine config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a YAML string and validate
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a JSON string and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML or JSON file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Set pagination settings
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set rate limit settings
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set concurrency limit
    #[must_use]
    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    /// Set per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.pagination.validate()?;
        self.rate_limit.validate()?;
        if self.max_concurrent_operations == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_operations",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Durations as fractional seconds
mod duration_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
