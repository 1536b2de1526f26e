// Batch driver behaviour against a scripted provider.
//
// Covers resumption from the completion store, at-most-once writes and the
// key rotation bound.

use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drivel_core::llm::{CompletionRequest, LlmError, LlmProvider, ProviderFactory};
use drivel_core::{
    BatchDriver, Category, CompletionStore, Credentials, KeyPool, Record, RowSource, RunError,
    SourceError, StoreError, VecRowSource,
};
use serde_json::json;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Clone)]
struct ScriptedFactory {
    failing_keys: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
    category: &'static str,
}

impl ScriptedFactory {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing_keys: failing.iter().map(|k| k.to_string()).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
            category: "reverse punchline",
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProviderFactory for ScriptedFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
        Ok(Arc::new(ScriptedProvider {
            key: api_key.to_string(),
            fail: self.failing_keys.contains(api_key),
            calls: Arc::clone(&self.calls),
            category: self.category,
        }))
    }
}

struct ScriptedProvider {
    key: String,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
    category: &'static str,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn submit(&self, _request: CompletionRequest) -> Result<serde_json::Value, LlmError> {
        self.calls.lock().unwrap().push(self.key.clone());
        if self.fail {
            return Err(LlmError::RateLimited { retry_after_secs: 0 });
        }
        Ok(json!({
            "reason": "It answers literally instead of landing a joke.",
            "category": self.category,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

struct BrokenSource;

#[async_trait]
impl RowSource for BrokenSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        Err(SourceError::Auth("service account disabled".into()))
    }
}

fn watch_record() -> Record {
    Record::new(
        "1",
        "I bought a watch so I can check the time, now I check the watch to know how late I am.",
        "2025-02-01 09:00:00",
        "2025-02-01 09:05:00",
    )
}

fn record(id: &str) -> Record {
    Record::new(id, format!("text {id}"), "2025-02-01", "2025-02-02")
}

fn pool(keys: &[&str]) -> Credentials {
    Credentials::Pool(KeyPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn classifies_into_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("data").join("run.tsv")).unwrap();
    let factory = ScriptedFactory::new(&[]);
    let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("sk-a".into()));

    let summary = driver.run(&VecRowSource::new(vec![watch_record()])).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.attempts, 1);
    let raw = fs::read_to_string(driver.store().path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 1);
    let fields: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[0], "1");
    assert_eq!(fields[2], "2025-02-01 09:00:00");
    assert_eq!(fields[3], "2025-02-01 09:05:00");
    assert_eq!(fields[5], "reverse punchline");
}

#[tokio::test]
async fn existing_id_is_never_reclassified() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let factory = ScriptedFactory::new(&[]);

    let store = CompletionStore::open(&path).unwrap();
    let mut first = BatchDriver::new(store, factory.clone(), Credentials::Single("sk-a".into()));
    first.run(&VecRowSource::new(vec![watch_record()])).await.unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let store = CompletionStore::open(&path).unwrap();
    let mut second = BatchDriver::new(store, factory.clone(), Credentials::Single("sk-a".into()));
    let summary = second.run(&VecRowSource::new(vec![watch_record()])).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempts, 0);
    assert_eq!(factory.calls().len(), 1, "only the first run may call the provider");
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let source = VecRowSource::new(vec![record("1"), record("2"), record("3")]);
    let factory = ScriptedFactory::new(&[]);

    for _ in 0..2 {
        let store = CompletionStore::open(&path).unwrap();
        let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("k".into()));
        driver.run(&source).await.unwrap();
    }

    let store = CompletionStore::open(&path).unwrap();
    let ids: Vec<String> = store.entries().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(factory.calls().len(), 3);
}

#[tokio::test]
async fn exhausted_pool_skips_record_and_wraps_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let factory = ScriptedFactory::new(&["A", "B"]);
    let mut driver = BatchDriver::new(store, factory.clone(), pool(&["A", "B"]));

    let summary = driver.run(&VecRowSource::new(vec![record("2")])).await.unwrap();

    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.attempts, 2);
    assert_eq!(factory.calls(), vec!["A", "B"]);
    assert_eq!(driver.key_cursor(), Some(0));
    assert!(!driver.store().load_existing_ids().unwrap().contains("2"));
}

#[tokio::test]
async fn rotation_is_bounded_by_pool_size() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let keys = ["k0", "k1", "k2", "k3", "k4"];
    let factory = ScriptedFactory::new(&keys);
    let mut driver = BatchDriver::new(store, factory.clone(), pool(&keys));

    let summary = driver
        .run(&VecRowSource::new(vec![record("a"), record("b")]))
        .await
        .unwrap();

    assert_eq!(summary.exhausted, 2);
    assert_eq!(summary.attempts, 10);
    assert_eq!(factory.calls().len(), 10);
    assert_eq!(driver.key_cursor(), Some(0));
}

#[tokio::test]
async fn cursor_is_not_reset_between_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let factory = ScriptedFactory::new(&["A"]);
    let mut driver = BatchDriver::new(store, factory.clone(), pool(&["A", "B", "C"]));

    let summary = driver
        .run(&VecRowSource::new(vec![record("1"), record("2")]))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    // Record 1 burns A then succeeds on B; record 2 starts on B.
    assert_eq!(factory.calls(), vec!["A", "B", "B"]);
    assert_eq!(driver.key_cursor(), Some(1));
}

#[tokio::test]
async fn single_key_failure_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let store = CompletionStore::open(&path).unwrap();
    let factory = ScriptedFactory::new(&["dead"]);
    let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("dead".into()));

    let err = driver
        .run(&VecRowSource::new(vec![record("1"), record("2")]))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Classification { ref id, .. } if id == "1"));
    assert_eq!(factory.calls().len(), 1, "no retry and no further records");
    assert!(fs::read_to_string(&path).unwrap().is_empty());
}

#[tokio::test]
async fn newline_text_is_stored_on_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.tsv")).unwrap();
    let factory = ScriptedFactory::new(&[]);
    let mut driver = BatchDriver::new(store, factory, Credentials::Single("k".into()));
    let source = VecRowSource::new(vec![Record::new("7", "first\nsecond\r\nthird", "c", "m")]);

    driver.run(&source).await.unwrap();

    let raw = fs::read_to_string(driver.store().path()).unwrap();
    assert_eq!(raw.lines().count(), 1);
    let fields: Vec<&str> = raw.trim_end_matches('\n').split('\t').collect();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[1], "first second third");
}

#[tokio::test]
async fn repeated_source_id_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let factory = ScriptedFactory::new(&[]);
    let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("k".into()));

    let summary = driver
        .run(&VecRowSource::new(vec![record("1"), record("1")]))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(driver.store().entries().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_store_aborts_before_classifying() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.tsv");
    fs::write(&path, "1\tonly\tthree\n").unwrap();
    let store = CompletionStore::open(&path).unwrap();
    let factory = ScriptedFactory::new(&[]);
    let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("k".into()));

    let err = driver.run(&VecRowSource::new(vec![record("2")])).await.unwrap_err();

    assert!(matches!(err, RunError::Store(StoreError::Malformed { line: 1, .. })));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn source_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let factory = ScriptedFactory::new(&[]);
    let mut driver = BatchDriver::new(store, factory.clone(), Credentials::Single("k".into()));

    let err = driver.run(&BrokenSource).await.unwrap_err();

    assert!(matches!(err, RunError::Source(SourceError::Auth(_))));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn stored_category_is_validated_label() {
    let dir = tempfile::tempdir().unwrap();
    let store = CompletionStore::open(dir.path().join("run.jsonl")).unwrap();
    let mut factory = ScriptedFactory::new(&[]);
    factory.category = "Semantic Misdirection";
    let mut driver = BatchDriver::new(store, factory, Credentials::Single("k".into()));

    driver.run(&VecRowSource::new(vec![record("1")])).await.unwrap();

    let entries = driver.store().entries().unwrap();
    assert_eq!(entries[0].category, Category::SemanticMisdirection);
    let raw = fs::read_to_string(driver.store().path()).unwrap();
    assert!(raw.contains("\"category\":\"semantic misdirection\""));
}
