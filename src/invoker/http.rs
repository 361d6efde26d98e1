//! HTTP invoker for JSON list endpoints
//!
//! Sends each page as a GET with the merged request parameters in the query
//! string, layered over any arguments fixed for the invoker, and maps the
//! response onto [`Response`] / [`InvokeError`]:
//! - a JSON array becomes a page of items
//! - `null` becomes an empty page
//! - any other value becomes a single item
//! - a non-success status becomes an [`InvokeError`] carrying that status
//!   and any `Retry-After` header

use super::types::{InvokeError, InvokeResult, Invoker, Response};
use crate::error::Result;
use crate::pagination::{encode_query, PageRequest, RequestArgs};
use crate::types::{JsonValue, StringMap};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 512;

/// Invoker that performs one HTTP GET per page
#[derive(Clone)]
pub struct HttpInvoker {
    client: Client,
    url: Url,
    headers: StringMap,
    args: RequestArgs,
    records_path: Option<String>,
}

impl HttpInvoker {
    /// Create an invoker for `url` with its own client
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Self::with_client(Self::build_client(timeout)?, url)
    }

    /// Create an invoker for `url` sharing an existing client
    pub fn with_client(client: Client, url: &str) -> Result<Self> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
            headers: StringMap::new(),
            args: RequestArgs::new(),
            records_path: None,
        })
    }

    /// Build a client suitable for sharing between invokers
    pub fn build_client(timeout: Duration) -> Result<Client> {
        Ok(Client::builder()
            .timeout(timeout)
            .user_agent(format!("branch-fetch/{}", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    /// Add a header sent with every call
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several headers sent with every call
    #[must_use]
    pub fn with_headers(mut self, headers: &StringMap) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Arguments sent with every call; request parameters win on clashes
    #[must_use]
    pub fn with_args(mut self, args: RequestArgs) -> Self {
        self.args = args;
        self
    }

    /// Read records from a dot-separated path inside the response body
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Turn a parsed response body into page data
    pub(crate) fn decode(&self, body: JsonValue) -> Response<JsonValue> {
        let value = match &self.records_path {
            Some(path) => match extract_path(body, path) {
                Some(value) => value,
                None => {
                    debug!(path = %path, "Records path not present, treating page as empty");
                    JsonValue::Null
                }
            },
            None => body,
        };

        match value {
            JsonValue::Array(items) => Response::Items(items),
            JsonValue::Null => Response::Items(Vec::new()),
            other => Response::Single(other),
        }
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    type Item = JsonValue;

    async fn invoke(&self, request: PageRequest) -> InvokeResult<JsonValue> {
        let mut params = self.args.as_map().clone();
        params.extend(request.params());
        let mut req = self.client.get(self.url.clone()).query(&encode_query(&params));
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req
            .send()
            .await
            .map_err(|e| InvokeError::new(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = extract_retry_after(&response);
            let reason = status.canonical_reason().unwrap_or("Request failed");
            let body = response.text().await.unwrap_or_default();
            let mut error = InvokeError::with_status(
                status.as_u16(),
                format!("{reason}: {}", truncate(body.trim(), MAX_ERROR_BODY)),
            );
            if let Some(delay) = retry_after {
                error = error.with_retry_after(delay);
            }
            return Err(error);
        }

        debug!(page = request.page_index(), url = %self.url, "Request succeeded");
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| InvokeError::new(format!("Failed to parse JSON: {e}")))?;
        Ok(self.decode(body))
    }
}

impl std::fmt::Debug for HttpInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInvoker")
            .field("url", &self.url.as_str())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("records_path", &self.records_path)
            .finish_non_exhaustive()
    }
}

/// Retry-After header in whole seconds
fn extract_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Walk a dot-separated path; numeric segments index into arrays
fn extract_path(value: JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;
    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            JsonValue::Object(mut map) => map.remove(part)?,
            JsonValue::Array(mut items) => {
                let index: usize = part.parse().ok()?;
                if index >= items.len() {
                    return None;
                }
                items.swap_remove(index)
            }
            _ => return None,
        };
    }
    Some(current)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
