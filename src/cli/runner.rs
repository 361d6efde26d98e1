//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::EngineConfig;
use crate::coordinator::{AggregatedResult, Coordinator, Partition};
use crate::error::{Error, Result};
use crate::invoker::HttpInvoker;
use crate::pagination::RequestArgs;
use crate::types::{JsonValue, OptionStringExt, PaginationType, StringMap, ValueMap};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Partition id used when no partitions file is given
pub const DEFAULT_PARTITION: &str = "default";

/// One entry of a partitions file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionEntry {
    /// Partition identifier
    pub id: String,
    /// Endpoint URL for this partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra headers, e.g. this branch's credentials
    #[serde(default)]
    pub headers: StringMap,
    /// Extra endpoint arguments
    #[serde(default)]
    pub args: ValueMap,
}

impl PartitionEntry {
    /// Check that the entry's arguments can be sent
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::invalid_value("partitions[].id", "must not be empty"));
        }
        RequestArgs::from_map(self.args.clone())?;
        Ok(())
    }

    /// Carry this entry as a partition's invocation context
    pub fn into_partition(self) -> Partition {
        let mut partition = Partition::new(self.id);
        if let Some(url) = self.base_url {
            partition = partition.with_value("base_url", url);
        }
        if !self.headers.is_empty() {
            let headers = self
                .headers
                .into_iter()
                .map(|(k, v)| (k, JsonValue::String(v)))
                .collect();
            partition = partition.with_value("headers", JsonValue::Object(headers));
        }
        if !self.args.is_empty() {
            partition = partition.with_value("args", JsonValue::Object(self.args.into_iter().collect()));
        }
        partition
    }
}

/// Load a partitions file; JSON by extension, YAML otherwise
pub fn load_partitions(path: &Path) -> Result<Vec<PartitionEntry>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    let entries: Vec<PartitionEntry> = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    let mut seen = HashSet::new();
    for entry in &entries {
        entry.validate()?;
        if !seen.insert(entry.id.as_str()) {
            return Err(Error::DuplicatePartition {
                id: entry.id.clone(),
            });
        }
    }
    Ok(entries)
}

/// Options of the fetch command
#[derive(Debug, Clone, Default)]
struct FetchOptions {
    url: Option<String>,
    records_path: Option<String>,
    headers: StringMap,
    strict: bool,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                url,
                partitions,
                args,
                headers,
                records_path,
                page_size,
                max_retries,
                pagination,
                no_pagination,
                max_concurrent,
                strict,
            } => {
                let mut config = self.load_config()?;
                apply_overrides(
                    &mut config,
                    *page_size,
                    *max_retries,
                    *pagination,
                    *no_pagination,
                    *max_concurrent,
                );
                let entries = match partitions {
                    Some(path) => load_partitions(path)?,
                    None => vec![PartitionEntry {
                        id: DEFAULT_PARTITION.to_string(),
                        base_url: None,
                        headers: StringMap::new(),
                        args: ValueMap::new(),
                    }],
                };
                let options = FetchOptions {
                    url: url.clone(),
                    records_path: records_path.clone().none_if_empty(),
                    headers: parse_headers(headers)?,
                    strict: *strict,
                };
                self.fetch(config, entries, &parse_args(args)?, &options)
                    .await
            }
            Commands::Config => self.show_config(),
            Commands::Validate { partitions } => self.validate(partitions.as_deref()),
        }
    }

    /// Load the engine configuration
    fn load_config(&self) -> Result<EngineConfig> {
        match &self.cli.config {
            Some(path) => EngineConfig::from_file(path),
            None => Ok(EngineConfig::default()),
        }
    }

    /// Fetch all partitions and emit the results
    async fn fetch(
        &self,
        config: EngineConfig,
        entries: Vec<PartitionEntry>,
        args: &RequestArgs,
        options: &FetchOptions,
    ) -> Result<()> {
        let started = Instant::now();
        let client = HttpInvoker::build_client(config.request_timeout)?;
        let coordinator = Coordinator::new(config)?;
        let partitions: Vec<Partition> = entries
            .into_iter()
            .map(PartitionEntry::into_partition)
            .collect();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling fetch");
                trigger.cancel();
            }
        });

        let result = coordinator
            .fetch_all_with_cancel(
                &partitions,
                args,
                |partition: &Partition| build_invoker(&client, partition, options),
                &cancel,
            )
            .await;
        interrupt.abort();
        let result = result?;

        self.emit_result(&partitions, &result, started.elapsed().as_millis() as u64);

        if options.strict && !result.is_complete() {
            return Err(Error::Other(format!(
                "{} of {} partitions failed",
                result.failed().count(),
                result.per_partition.len()
            )));
        }
        Ok(())
    }

    /// Print the effective configuration
    fn show_config(&self) -> Result<()> {
        let config = self.load_config()?;
        print!("{}", config.to_yaml()?);
        Ok(())
    }

    /// Validate configuration and partitions file
    fn validate(&self, partitions: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        let count = match partitions {
            Some(path) => load_partitions(path)?.len(),
            None => 0,
        };

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration is valid ({} requests per {:?}, {} concurrent), {} partitions",
                    config.rate_limit.max_requests_per_window,
                    config.rate_limit.time_window,
                    config.max_concurrent_operations,
                    count
                )
            }
        }));
        Ok(())
    }

    /// Emit records, per-partition reports and a summary
    fn emit_result(
        &self,
        partitions: &[Partition],
        result: &AggregatedResult<JsonValue>,
        duration_ms: u64,
    ) {
        let failed = result.failed().count();
        let status = if failed == 0 {
            "SUCCEEDED"
        } else if failed == result.per_partition.len() {
            "FAILED"
        } else {
            "PARTIAL"
        };

        match self.cli.format {
            OutputFormat::Json => {
                for partition in partitions {
                    let Some(report) = result.partition(&partition.id) else {
                        continue;
                    };
                    for record in &report.items {
                        self.output_message(&json!({
                            "type": "RECORD",
                            "partition": partition.id,
                            "record": record
                        }));
                    }
                }
                for summary in result.summary() {
                    self.output_message(&json!({
                        "type": "PARTITION",
                        "partition": summary
                    }));
                }
                self.output_message(&json!({
                    "type": "FETCH_SUMMARY",
                    "summary": {
                        "status": status,
                        "total_records": result.data.len(),
                        "total_partitions": result.per_partition.len(),
                        "failed_partitions": failed,
                        "total_requests": result.total_requests(),
                        "total_retries": result.total_retries(),
                        "duration_ms": duration_ms
                    }
                }));
            }
            OutputFormat::Pretty => {
                for summary in result.summary() {
                    match &summary.error {
                        None => println!(
                            "{:<20} OK      {:>8} records  {:>5} requests  {:>3} retries",
                            summary.partition_id,
                            summary.item_count,
                            summary.requests_made,
                            summary.retries_made
                        ),
                        Some(error) => println!(
                            "{:<20} FAILED  {error}",
                            summary.partition_id
                        ),
                    }
                }
                println!(
                    "{status}: {} records from {} partitions ({failed} failed) in {duration_ms} ms",
                    result.data.len(),
                    result.per_partition.len()
                );
            }
        }
    }

    /// Output a message
    fn output_message(&self, msg: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn apply_overrides(
    config: &mut EngineConfig,
    page_size: Option<u32>,
    max_retries: Option<u32>,
    pagination: Option<PaginationType>,
    no_pagination: bool,
    max_concurrent: Option<usize>,
) {
    if let Some(size) = page_size {
        config.pagination.page_size = size;
    }
    if let Some(retries) = max_retries {
        config.pagination.max_retries = retries;
    }
    if let Some(strategy) = pagination {
        config.pagination.strategy = strategy;
    }
    if no_pagination {
        config.pagination.supports_pagination = false;
    }
    if let Some(max) = max_concurrent {
        config.max_concurrent_operations = max;
    }
}

fn parse_args(pairs: &[String]) -> Result<RequestArgs> {
    let mut args = RequestArgs::new();
    for pair in pairs {
        let (name, value) = RequestArgs::parse_pair(pair)?;
        args.insert(name, value)?;
    }
    Ok(args)
}

fn parse_headers(pairs: &[String]) -> Result<StringMap> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .ok_or_else(|| Error::invalid_argument(pair, "expected NAME:VALUE"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::invalid_argument(pair, "header name must not be empty"));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Build the HTTP invoker for one partition from its context
fn build_invoker(
    client: &Client,
    partition: &Partition,
    options: &FetchOptions,
) -> Result<HttpInvoker> {
    let url = partition
        .get_str("base_url")
        .or(options.url.as_deref())
        .ok_or_else(|| {
            Error::partition(&partition.id, "no base_url in partitions file and no --url given")
        })?;

    let mut invoker = HttpInvoker::with_client(client.clone(), url)?.with_headers(&options.headers);

    if let Some(JsonValue::Object(headers)) = partition.get("headers") {
        for (name, value) in headers {
            let value = value.as_str().ok_or_else(|| {
                Error::invalid_value(format!("headers.{name}"), "must be a string")
            })?;
            invoker = invoker.with_header(name.as_str(), value);
        }
    }
    if let Some(JsonValue::Object(args)) = partition.get("args") {
        let args = args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        invoker = invoker.with_args(RequestArgs::from_map(args)?);
    }
    if let Some(path) = &options.records_path {
        invoker = invoker.with_records_path(path.as_str());
    }
    Ok(invoker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_partitions_yaml() {
        let file = write_temp(
            ".yaml",
            r#"
- id: north
  base_url: https://north.example.com/members
  headers:
    Authorization: Bearer n
  args:
    status: active
- id: south
"#,
        );

        let entries = load_partitions(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].headers.get("Authorization").unwrap(), "Bearer n");
        assert_eq!(entries[1].base_url, None);

        let partition = entries[0].clone().into_partition();
        assert_eq!(
            partition.get_str("base_url"),
            Some("https://north.example.com/members")
        );
        assert_eq!(partition.get("args"), Some(&json!({"status": "active"})));
    }

    #[test]
    fn test_load_partitions_json() {
        let file = write_temp(".json", r#"[{"id": "a"}, {"id": "b", "args": {"ids": [1, 2]}}]"#);
        let entries = load_partitions(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_load_partitions_rejects_duplicates_and_nested_args() {
        let file = write_temp(".json", r#"[{"id": "a"}, {"id": "a"}]"#);
        assert!(matches!(
            load_partitions(file.path()),
            Err(Error::DuplicatePartition { .. })
        ));

        let file = write_temp(".json", r#"[{"id": "a", "args": {"filter": {"x": 1}}}]"#);
        assert!(matches!(
            load_partitions(file.path()),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_load_partitions_missing_file() {
        assert!(matches!(
            load_partitions(Path::new("/nonexistent/partitions.yaml")),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&["X-Api-Key: secret".to_string()]).unwrap();
        assert_eq!(headers.get("X-Api-Key").unwrap(), "secret");
        assert!(parse_headers(&["novalue".to_string()]).is_err());
        assert!(parse_headers(&[": x".to_string()]).is_err());
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(&["limit=10".to_string(), "status=active".to_string()]).unwrap();
        assert_eq!(args.get("limit"), Some(&json!(10)));
        assert!(parse_args(&["broken".to_string()]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = EngineConfig::default();
        apply_overrides(
            &mut config,
            Some(100),
            Some(2),
            Some(PaginationType::PageNumber),
            true,
            Some(8),
        );
        assert_eq!(config.pagination.page_size, 100);
        assert_eq!(config.pagination.max_retries, 2);
        assert_eq!(config.pagination.strategy, PaginationType::PageNumber);
        assert!(!config.pagination.supports_pagination);
        assert_eq!(config.max_concurrent_operations, 8);
    }

    #[test]
    fn test_build_invoker_needs_url() {
        let client = Client::new();
        let options = FetchOptions::default();
        let err = build_invoker(&client, &Partition::new("lonely"), &options).unwrap_err();
        assert!(err.to_string().contains("lonely"));

        let partition = PartitionEntry {
            id: "north".to_string(),
            base_url: Some("https://north.example.com/members".to_string()),
            headers: StringMap::from([("X-Branch".to_string(), "north".to_string())]),
            args: ValueMap::new(),
        }
        .into_partition();
        let invoker = build_invoker(&client, &partition, &options).unwrap();
        assert_eq!(invoker.url().host_str(), Some("north.example.com"));
    }
}
