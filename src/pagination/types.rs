//! Pagination types
//!
//! Cursor computation, caller arguments and the per-call request handed to
//! the invoker.

use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use crate::types::{JsonValue, PaginationType, ValueMap};
use serde::Serialize;
use std::sync::Arc;

// ============================================================================
// Page Cursor
// ============================================================================

/// Page-addressing parameters for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageCursor {
    /// `take` items after skipping `skip`
    OffsetTake {
        /// Items requested
        take: u32,
        /// Items skipped
        skip: u64,
    },
    /// Zero-based `page` of `page_size` items
    PageNumber {
        /// Page number
        page: u32,
        /// Items per page
        page_size: u32,
    },
}

impl PageCursor {
    /// Cursor for a zero-based page index
    pub fn for_page(strategy: PaginationType, page_index: u32, page_size: u32) -> Self {
        match strategy {
            PaginationType::OffsetTake => Self::OffsetTake {
                take: page_size,
                skip: u64::from(page_index) * u64::from(page_size),
            },
            PaginationType::PageNumber => Self::PageNumber {
                page: page_index,
                page_size,
            },
        }
    }

    /// Cursor for a page under `config`, or `None` when the endpoint is not
    /// paginated
    pub fn from_config(config: &PaginationConfig, page_index: u32) -> Option<Self> {
        config
            .supports_pagination
            .then(|| Self::for_page(config.strategy, page_index, config.page_size))
    }

    /// Parameter names and values this cursor contributes
    pub fn params(&self) -> [(&'static str, u64); 2] {
        match *self {
            Self::OffsetTake { take, skip } => [("take", u64::from(take)), ("skip", skip)],
            Self::PageNumber { page, page_size } => {
                [("page", u64::from(page)), ("page_size", u64::from(page_size))]
            }
        }
    }

    /// Items requested by this cursor
    pub fn page_size(&self) -> u32 {
        match *self {
            Self::OffsetTake { take, .. } => take,
            Self::PageNumber { page_size, .. } => page_size,
        }
    }
}

// ============================================================================
// Request Arguments
// ============================================================================

/// Caller-supplied endpoint arguments
///
/// Values are scalars or arrays of scalars; nested objects are rejected when
/// inserted so every argument can be sent as a query parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestArgs(ValueMap);

impl RequestArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a map, validating every entry
    pub fn from_map(map: ValueMap) -> Result<Self> {
        let mut args = Self::new();
        for (name, value) in map {
            args.insert(name, value)?;
        }
        Ok(args)
    }

    /// Insert an argument, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate_arg(&name, &value)?;
        self.0.insert(name, value);
        Ok(())
    }

    /// Add an argument
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Parse a `name=value` pair; the value is read as a JSON scalar when it
    /// parses as one and as a plain string otherwise
    pub fn parse_pair(pair: &str) -> Result<(String, JsonValue)> {
        let (name, raw) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_argument(pair, "expected name=value"))?;
        let name = name.trim().to_string();
        let value = match serde_json::from_str::<JsonValue>(raw) {
            Ok(v @ (JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::Null)) => v,
            _ => JsonValue::String(raw.to_string()),
        };
        validate_arg(&name, &value)?;
        Ok((name, value))
    }

    /// Get an argument
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// Iterate over arguments in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &ValueMap {
        &self.0
    }
}

fn validate_arg(name: &str, value: &JsonValue) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(Error::invalid_argument(
            name,
            "name must be non-empty and contain no whitespace",
        ));
    }
    match value {
        JsonValue::Object(_) => Err(Error::invalid_argument(
            name,
            "nested objects cannot be sent as parameters",
        )),
        JsonValue::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => Err(
            Error::invalid_argument(name, "array values must be scalars"),
        ),
        _ => Ok(()),
    }
}

// ============================================================================
// Page Request
// ============================================================================

/// Everything the invoker needs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    page_index: u32,
    cursor: Option<PageCursor>,
    args: Arc<RequestArgs>,
}

impl PageRequest {
    /// Create a request for a page
    pub fn new(page_index: u32, cursor: Option<PageCursor>, args: Arc<RequestArgs>) -> Self {
        Self {
            page_index,
            cursor,
            args,
        }
    }

    /// Zero-based page index
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Cursor for this page, absent for unpaginated endpoints
    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    /// Caller arguments, without cursor parameters
    pub fn args(&self) -> &RequestArgs {
        &self.args
    }

    /// Caller arguments merged with cursor parameters; the cursor wins on
    /// name clashes
    pub fn params(&self) -> ValueMap {
        let mut params = self.args.as_map().clone();
        if let Some(cursor) = &self.cursor {
            for (name, value) in cursor.params() {
                params.insert(name.to_string(), JsonValue::from(value));
            }
        }
        params
    }

    /// Look up one merged parameter
    pub fn param(&self, name: &str) -> Option<JsonValue> {
        if let Some(cursor) = &self.cursor {
            if let Some((_, value)) = cursor.params().into_iter().find(|(n, _)| *n == name) {
                return Some(JsonValue::from(value));
            }
        }
        self.args.get(name).cloned()
    }

    /// Merged parameters as query-string pairs
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        encode_query(&self.params())
    }
}

/// Encode parameters as query-string pairs; arrays become repeated pairs and
/// nulls are omitted
pub fn encode_query(params: &ValueMap) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in params {
        match value {
            JsonValue::Null => {}
            JsonValue::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_to_string(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_to_string(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
