//! Unit tests for notemap-ai module

use crate::prompt::{lineage_prompt, snippets_block, LINEAGE_PROMPT};
use crate::providers::create_provider;
use crate::providers::fixture::FixtureProvider;
use crate::*;
use notemap_core::DataResource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn snippet(id: &str, kind: &str, source: &str) -> Snippet {
    Snippet {
        id: id.to_string(),
        kind: kind.to_string(),
        source: source.to_string(),
    }
}

fn request(ids: &[&str]) -> AnalysisRequest {
    AnalysisRequest {
        notebook: PathBuf::from("nb.ipynb"),
        snippets: ids.iter().map(|id| snippet(id, "python", "pass")).collect(),
    }
}

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

#[test]
fn test_parse_response() {
    let facts = parse_response(
        r#"{"rw": [
            {"id": "c1",
             "read": [{"kind": "table", "location": "warehouse", "name": "orders"}],
             "write": [{"kind": "file", "location": "/out", "name": "report.csv"}]},
            {"id": "c2", "read": [{"kind": "view", "location": "db", "name": "v"}]}
        ]}"#,
    )
    .unwrap();

    assert_eq!(facts.len(), 2);
    assert_eq!(facts[0].id, "c1");
    assert!(facts[0].read.contains(&DataResource::table("warehouse", "orders")));
    assert!(facts[0].write.contains(&DataResource::file("/out", "report.csv")));
    assert!(facts[1].write.is_empty());
    assert!(facts[1].read.contains(&DataResource::view("db", "v")));
}

#[test]
fn test_parse_response_merges_repeated_ids() {
    let facts = parse_response(
        r#"{"rw": [
            {"id": "c1", "read": [{"kind": "table", "location": "db", "name": "a"}]},
            {"id": "c1", "read": [{"kind": "table", "location": "db", "name": "b"}]}
        ]}"#,
    )
    .unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].read.len(), 2);
}

#[test]
fn test_parse_response_dedups_resources() {
    let facts = parse_response(
        r#"{"rw": [{"id": "c1", "write": [
            {"kind": "file", "location": "/d", "name": "x"},
            {"kind": "file", "location": "/d", "name": "x"}
        ]}]}"#,
    )
    .unwrap();
    assert_eq!(facts[0].write.len(), 1);
}

#[test]
fn test_parse_response_schema_violations() {
    let cases = [
        r#"{"result": []}"#,
        r#"{"rw": [{"read": []}]}"#,
        r#"{"rw": [{"id": "c1", "read": [{"kind": "bucket", "location": "s3", "name": "x"}]}]}"#,
        r#"{"rw": [{"id": "c1", "read": [{"kind": "table", "name": "x"}]}]}"#,
        r#"{"rw": [{"id": 7}]}"#,
        "the snippet reads a table",
    ];
    for case in cases {
        let err = parse_response(case).unwrap_err();
        assert!(matches!(err, OracleError::SchemaViolation(_)), "{} -> {:?}", case, err);
        assert!(!err.is_retryable());
    }
}

#[test]
fn test_parse_response_empty() {
    assert!(matches!(parse_response("  \n"), Err(OracleError::EmptyResponse)));
}

#[test]
fn test_parse_response_accepts_fenced_json() {
    let facts = parse_response("```json\n{\"rw\": [{\"id\": \"c1\"}]}\n```").unwrap();
    assert_eq!(facts.len(), 1);
    assert!(facts[0].is_empty());
}

#[test]
fn test_snippets_block_framing() {
    let block = snippets_block(&[
        snippet("a1", "python", "df = spark.table('orders')"),
        snippet("b2", "sql", "SELECT 1"),
    ]);
    assert_eq!(
        block,
        "code snippet a1:\n\n```python\ndf = spark.table('orders')\n```\n\n\
         code snippet b2:\n\n```sql\nSELECT 1\n```\n\n"
    );
}

#[test]
fn test_lineage_prompt_contains_instructions_and_snippets() {
    let prompt = lineage_prompt(&[snippet("a1", "python", "x = 1")]);
    assert!(prompt.starts_with(LINEAGE_PROMPT));
    assert!(prompt.contains("\"rw\""));
    assert!(prompt.contains("code snippet a1:"));
}

#[test]
fn test_provider_creation() {
    let openai = create_provider(&OracleConfig::default());
    assert!(openai.is_ok());
    assert_eq!(openai.unwrap().name(), "OpenAI-compatible");

    let unknown = create_provider(&OracleConfig {
        provider: "unknown".to_string(),
        ..OracleConfig::default()
    });
    assert!(unknown.is_err());

    let fixture_without_file = create_provider(&OracleConfig {
        provider: "fixture".to_string(),
        ..OracleConfig::default()
    });
    assert!(fixture_without_file.is_err());
}

#[test]
fn test_fixture_provider_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("responses.json");
    std::fs::write(
        &path,
        r#"{"rw": [{"id": "c1", "read": [{"kind": "table", "location": "db", "name": "t"}]}]}"#,
    )
    .unwrap();

    let provider = create_provider(&OracleConfig {
        provider: "fixture".to_string(),
        fixture: Some(path),
        ..OracleConfig::default()
    })
    .unwrap();
    assert_eq!(provider.name(), "Fixture");
}

#[tokio::test]
async fn test_fixture_provider_answers_requested_ids_only() {
    let provider = FixtureProvider::new(vec![
        notemap_core::CellFacts::new("c1").reads(DataResource::table("db", "t")),
        notemap_core::CellFacts::new("c9").writes(DataResource::file("/d", "x")),
    ]);
    assert_eq!(provider.len(), 2);

    let result = provider.analyze(&request(&["c1", "c2"])).await.unwrap();
    assert_eq!(result.facts.len(), 1);
    assert_eq!(result.facts[0].id, "c1");
}

/// Fails with the given error a fixed number of times, then succeeds.
struct FlakyOracle {
    failures: u32,
    retryable: bool,
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl AnalysisOracle for FlakyOracle {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            if self.retryable {
                return Err(OracleError::Status { status: 503, body: "busy".to_string() });
            }
            return Err(OracleError::SchemaViolation("missing field `rw`".to_string()));
        }
        Ok(AnalysisResult::default())
    }

    fn name(&self) -> &str {
        "Flaky"
    }
}

struct SlowOracle;

#[async_trait::async_trait]
impl AnalysisOracle for SlowOracle {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult, OracleError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(AnalysisResult::default())
    }

    fn name(&self) -> &str {
        "Slow"
    }
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failures() {
    let oracle = FlakyOracle { failures: 2, retryable: true, calls: AtomicU32::new(0) };
    let result = analyze_with_retry(&oracle, &request(&["c1"]), Duration::from_secs(5), &quick_retry(3)).await;
    assert!(result.is_ok());
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    let oracle = FlakyOracle { failures: 10, retryable: true, calls: AtomicU32::new(0) };
    let result = analyze_with_retry(&oracle, &request(&["c1"]), Duration::from_secs(5), &quick_retry(3)).await;
    assert!(matches!(result, Err(OracleError::Status { status: 503, .. })));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_skips_schema_violations() {
    let oracle = FlakyOracle { failures: 1, retryable: false, calls: AtomicU32::new(0) };
    let result = analyze_with_retry(&oracle, &request(&["c1"]), Duration::from_secs(5), &quick_retry(3)).await;
    assert!(matches!(result, Err(OracleError::SchemaViolation(_))));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_per_attempt() {
    let oracle: Arc<dyn AnalysisOracle> = Arc::new(SlowOracle);
    let timeout = Duration::from_millis(20);
    let result = analyze_with_retry(oracle.as_ref(), &request(&["c1"]), timeout, &quick_retry(2)).await;
    match result {
        Err(OracleError::Timeout(d)) => assert_eq!(d, timeout),
        other => panic!("expected timeout, got {:?}", other.map(|r| r.facts.len())),
    }
}

#[test]
fn test_backoff_delays() {
    let policy = RetryPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(400),
        multiplier: 2.0,
    };
    assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(400));
    assert_eq!(RetryPolicy::none().max_attempts, 1);
}

#[test]
fn test_backoff_delay_stays_in_range_for_bad_multipliers() {
    let max_delay = Duration::from_millis(400);
    let policy = |multiplier| RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(100),
        max_delay,
        multiplier,
    };

    assert_eq!(policy(-2.0).delay_for_attempt(2), Duration::ZERO);
    assert_eq!(policy(f64::NAN).delay_for_attempt(2), max_delay);
    assert_eq!(policy(f64::INFINITY).delay_for_attempt(2), max_delay);
}
