//! Common types used throughout branch-fetch
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// Ordered key-value map with string keys and JSON values
pub type ValueMap = BTreeMap<String, JsonValue>;

// ============================================================================
// Pagination Type
// ============================================================================

/// How an endpoint addresses its pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaginationType {
    /// `take` / `skip` offset addressing
    #[default]
    #[serde(rename = "skip_take")]
    OffsetTake,
    /// `page` / `page_size` addressing
    #[serde(rename = "page_page_size")]
    PageNumber,
}

impl PaginationType {
    /// Name used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffsetTake => "skip_take",
            Self::PageNumber => "page_page_size",
        }
    }
}

impl std::str::FromStr for PaginationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip_take" => Ok(Self::OffsetTake),
            "page_page_size" => Ok(Self::PageNumber),
            other => Err(format!(
                "unknown pagination type '{other}' (expected skip_take or page_page_size)"
            )),
        }
    }
}

impl std::fmt::Display for PaginationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_type_serde() {
        let kind: PaginationType = serde_json::from_str("\"page_page_size\"").unwrap();
        assert_eq!(kind, PaginationType::PageNumber);

        let json = serde_json::to_string(&PaginationType::OffsetTake).unwrap();
        assert_eq!(json, "\"skip_take\"");
    }

    #[test]
    fn test_pagination_type_default() {
        assert_eq!(PaginationType::default(), PaginationType::OffsetTake);
    }

    #[test]
    fn test_pagination_type_from_str() {
        assert_eq!(
            "skip_take".parse::<PaginationType>(),
            Ok(PaginationType::OffsetTake)
        );
        assert_eq!(
            "page_page_size".parse::<PaginationType>(),
            Ok(PaginationType::PageNumber)
        );
        assert!("cursor".parse::<PaginationType>().is_err());
        assert_eq!(PaginationType::PageNumber.to_string(), "page_page_size");
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
    }
}
