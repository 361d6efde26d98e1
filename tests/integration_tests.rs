//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: partitions → coordinator → HTTP requests →
//! aggregated result, and the CLI binary on top of it.

use branch_fetch::{
    Coordinator, EngineConfig, FailureKind, HttpInvoker, PaginationConfig, Partition,
    RateLimitConfig, RequestArgs,
};
use branch_fetch::types::PaginationType;
use serde_json::{json, Value};
use std::io::Write;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn fast_config(page_size: u32) -> EngineConfig {
    EngineConfig::new()
        .with_pagination(
            PaginationConfig::new()
                .with_page_size(page_size)
                .with_max_retries(3)
                .with_backoff(Duration::from_millis(20), true)
                .with_post_request_delay(Duration::ZERO),
        )
        .with_rate_limit(RateLimitConfig::new(1000, Duration::from_secs(1)))
        .with_max_concurrent_operations(3)
        .with_request_timeout(Duration::from_secs(5))
}

fn branch_factory(
    server: &MockServer,
) -> impl FnMut(&Partition) -> branch_fetch::Result<HttpInvoker> + '_ {
    move |partition: &Partition| {
        HttpInvoker::new(
            &format!("{}/{}/members", server.uri(), partition.id),
            Duration::from_secs(5),
        )
        .map(|invoker| invoker.with_header("X-Branch", partition.id.as_str()))
    }
}

async fn mount_page(server: &MockServer, branch: &str, skip: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{branch}/members")))
        .and(query_param("skip", skip.to_string()))
        .and(header("X-Branch", branch))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// Coordinator over HTTP
// ============================================================================

#[tokio::test]
async fn test_multi_branch_fetch_isolates_failures() {
    let server = MockServer::start().await;

    // north: two pages, south: one short page
    mount_page(&server, "north", 0, json!([{"id": "n1"}, {"id": "n2"}])).await;
    mount_page(&server, "north", 2, json!([{"id": "n3"}])).await;
    mount_page(&server, "south", 0, json!([{"id": "s1"}])).await;

    // east: always failing
    Mock::given(method("GET"))
        .and(path("/east/members"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(3)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(fast_config(2)).unwrap();
    let partitions = vec![
        Partition::new("north"),
        Partition::new("east"),
        Partition::new("south"),
    ];

    let result = coordinator
        .fetch_all(&partitions, &RequestArgs::new(), branch_factory(&server))
        .await
        .unwrap();

    let ids: Vec<&str> = result
        .data
        .iter()
        .map(|record| record["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n1", "n2", "n3", "s1"]);

    let north = result.partition("north").unwrap();
    assert!(north.success);
    assert_eq!(north.requests_made, 2);

    let east = result.partition("east").unwrap();
    assert!(!east.success);
    assert_eq!(east.failure, Some(FailureKind::RetriesExhausted));
    assert!(east.error.as_deref().unwrap().contains("503"));
    assert_eq!(east.retries_made, 2);

    assert!(!result.is_complete());
    assert_eq!(result.total_requests(), 6);
}

#[tokio::test]
async fn test_not_found_branch_is_called_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/closed/members"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "open", 0, json!([{"id": 1}])).await;

    let coordinator = Coordinator::new(fast_config(50)).unwrap();
    let partitions = vec![Partition::new("closed"), Partition::new("open")];
    let result = coordinator
        .fetch_all(&partitions, &RequestArgs::new(), branch_factory(&server))
        .await
        .unwrap();

    assert_eq!(result.data.len(), 1);
    assert_eq!(
        result.partition("closed").unwrap().failure,
        Some(FailureKind::NotFound)
    );
}

#[tokio::test]
async fn test_retry_after_header_is_honoured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy/members"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "busy", 0, json!([{"id": "b1"}])).await;

    let coordinator = Coordinator::new(fast_config(50)).unwrap();
    let started = Instant::now();
    let result = coordinator
        .fetch_all(
            &[Partition::new("busy")],
            &RequestArgs::new(),
            branch_factory(&server),
        )
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.partition("busy").unwrap().retries_made, 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_page_number_strategy_and_args() {
    let server = MockServer::start().await;

    for (page, body) in [(0, json!([1, 2, 3])), (1, json!([4]))] {
        Mock::given(method("GET"))
            .and(path("/north/members"))
            .and(query_param("page", page.to_string()))
            .and(query_param("page_size", "3"))
            .and(query_param("status", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut config = fast_config(3);
    config.pagination = config.pagination.with_strategy(PaginationType::PageNumber);
    let coordinator = Coordinator::new(config).unwrap();
    let args = RequestArgs::new().with_arg("status", "active").unwrap();

    let invoker = HttpInvoker::new(
        &format!("{}/north/members", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    let items = coordinator.fetch_one(&invoker, &args).await.unwrap();

    assert_eq!(items, vec![json!(1), json!(2), json!(3), json!(4)]);
}

#[tokio::test]
async fn test_unpaginated_endpoint_with_records_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/north/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"members": [{"id": 1}, {"id": 2}, {"id": 3}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fast_config(2);
    config.pagination = config.pagination.without_pagination();
    let coordinator = Coordinator::new(config).unwrap();

    let invoker = HttpInvoker::new(
        &format!("{}/north/members", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_records_path("result.members");
    let items = coordinator
        .fetch_one(&invoker, &RequestArgs::new())
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
}

// ============================================================================
// CLI Binary
// ============================================================================

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

const FAST_YAML: &str = r"
pagination:
  page_size: 2
  max_retries: 2
  base_delay: 0.01
  post_request_delay: 0
rate_limit:
  max_requests_per_window: 100
  time_window: 1
";

#[tokio::test]
async fn test_cli_fetch_emits_records_and_summary() {
    let server = MockServer::start().await;
    mount_page(&server, "north", 0, json!([{"id": 1}, {"id": 2}])).await;
    mount_page(&server, "north", 2, json!([])).await;

    let config = write_config(FAST_YAML);
    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_branch-fetch"))
        .args(["--config"])
        .arg(config.path())
        .args([
            "fetch",
            "--url",
            &format!("{}/north/members", server.uri()),
            "--header",
            "X-Branch: north",
        ])
        .output()
        .await
        .unwrap();

    assert!(output.status.success());
    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let records = lines.iter().filter(|l| l["type"] == "RECORD").count();
    assert_eq!(records, 2);
    let partition = lines.iter().find(|l| l["type"] == "PARTITION").unwrap();
    assert_eq!(partition["partition"]["partition_id"], "default");
    let summary = lines.last().unwrap();
    assert_eq!(summary["type"], "FETCH_SUMMARY");
    assert_eq!(summary["summary"]["status"], "SUCCEEDED");
}

#[tokio::test]
async fn test_cli_strict_fails_on_partition_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone/members"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = write_config(FAST_YAML);
    let url = format!("{}/gone/members", server.uri());

    let lenient = tokio::process::Command::new(env!("CARGO_BIN_EXE_branch-fetch"))
        .arg("--config")
        .arg(config.path())
        .args(["fetch", "--url", &url])
        .output()
        .await
        .unwrap();
    assert!(lenient.status.success());

    let strict = tokio::process::Command::new(env!("CARGO_BIN_EXE_branch-fetch"))
        .arg("--config")
        .arg(config.path())
        .args(["fetch", "--url", &url, "--strict"])
        .output()
        .await
        .unwrap();
    assert!(!strict.status.success());
}

#[test]
fn test_cli_config_prints_effective_yaml() {
    let config = write_config("pagination:\n  page_size: 20\n");
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_branch-fetch"))
        .arg("--config")
        .arg(config.path())
        .arg("config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let yaml = String::from_utf8(output.stdout).unwrap();
    let printed = EngineConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(printed.pagination.page_size, 20);
    assert_eq!(printed.rate_limit.max_requests_per_window, 40);
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let config = write_config("pagination:\n  page_size: 0\n");
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_branch-fetch"))
        .arg("--config")
        .arg(config.path())
        .arg("validate")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("page_size"));
}
