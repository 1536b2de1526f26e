// crates/core/src/driver.rs
//! Resumable batch driver.
//!
//! Walks the row source in order, skips ids already in the completion store,
//! classifies the rest one at a time and appends each success immediately.
//! With a key pool, a failed attempt rotates to the next credential until the
//! record succeeds or every key has been tried once for it.
//!
//! A driver owns the store and the rotation cursor and `run` takes `&mut self`:
//! records are never processed concurrently, and two drivers must never
//! share a store file.

use std::collections::HashSet;

use crate::classifier::{ClassifyError, Classifier};
use crate::error::RunError;
use crate::keys::{key_prefix, KeyPool};
use crate::llm::ProviderFactory;
use crate::source::RowSource;
use crate::store::CompletionStore;
use crate::types::{normalize_newlines, Classification, CompletionEntry, Record};

const SNAPSHOT_TEXT_WIDTH: usize = 60;

/// Credentials for a run.
#[derive(Clone)]
pub enum Credentials {
    /// One fixed key; the first failed classification ends the run.
    Single(String),
    /// Rotating pool; a record that fails on every key is skipped.
    Pool(KeyPool),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(key) => f.debug_tuple("Single").field(&key_prefix(key)).finish(),
            Self::Pool(pool) => f.debug_tuple("Pool").field(pool).finish(),
        }
    }
}

/// Terminal state of one record within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Skipped,
    Succeeded(Classification),
    Exhausted { attempts: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub exhausted: usize,
    /// Classification attempts made, successful or not.
    pub attempts: usize,
}

pub struct BatchDriver<F: ProviderFactory> {
    store: CompletionStore,
    factory: F,
    credentials: Credentials,
}

impl<F: ProviderFactory> BatchDriver<F> {
    pub fn new(store: CompletionStore, factory: F, credentials: Credentials) -> Self {
        Self {
            store,
            factory,
            credentials,
        }
    }

    pub fn store(&self) -> &CompletionStore {
        &self.store
    }

    /// Position of the rotating pointer, or `None` with a single key.
    pub fn key_cursor(&self) -> Option<usize> {
        match &self.credentials {
            Credentials::Single(_) => None,
            Credentials::Pool(pool) => Some(pool.cursor()),
        }
    }

    pub async fn run(&mut self, source: &dyn RowSource) -> Result<RunSummary, RunError> {
        let records = source.fetch_all().await?;
        let mut completed = self.store.load_existing_ids()?;

        tracing::info!(
            records = records.len(),
            already_done = completed.len(),
            store = %self.store.path().display(),
            "input snapshot\n{}",
            format_snapshot(&records)
        );

        let mut summary = RunSummary {
            total: records.len(),
            ..RunSummary::default()
        };

        for record in &records {
            let outcome = self.process(record, &mut completed, &mut summary).await?;
            match outcome {
                RecordOutcome::Skipped => summary.skipped += 1,
                RecordOutcome::Succeeded(_) => summary.succeeded += 1,
                RecordOutcome::Exhausted { .. } => summary.exhausted += 1,
            }
        }

        tracing::info!(
            total = summary.total,
            skipped = summary.skipped,
            succeeded = summary.succeeded,
            exhausted = summary.exhausted,
            attempts = summary.attempts,
            "batch run finished"
        );
        Ok(summary)
    }

    async fn process(
        &mut self,
        record: &Record,
        completed: &mut HashSet<String>,
        summary: &mut RunSummary,
    ) -> Result<RecordOutcome, RunError> {
        if completed.contains(&record.id) {
            tracing::info!(id = %record.id, "skip");
            return Ok(RecordOutcome::Skipped);
        }

        let text = normalize_newlines(&record.text);
        let classification = match &mut self.credentials {
            Credentials::Single(key) => {
                summary.attempts += 1;
                attempt(&self.factory, key, &text).await.map_err(|source| {
                    tracing::error!(
                        id = %record.id,
                        key = %key_prefix(key),
                        error = %source,
                        "classification failed"
                    );
                    RunError::Classification {
                        id: record.id.clone(),
                        source,
                    }
                })?
            }
            Credentials::Pool(pool) => {
                let (result, attempts) =
                    classify_with_failover(&self.factory, pool, &record.id, &text).await;
                summary.attempts += attempts;
                match result {
                    Some(classification) => classification,
                    None => {
                        tracing::warn!(
                            id = %record.id,
                            attempts,
                            "all keys failed, leaving record for the next run"
                        );
                        return Ok(RecordOutcome::Exhausted { attempts });
                    }
                }
            }
        };

        let entry = CompletionEntry::new(record, classification.clone());
        self.store.append(&entry)?;
        completed.insert(record.id.clone());

        tracing::info!(
            id = %record.id,
            text = %entry.text,
            category = %classification.category,
            reason = %classification.reason,
            "classified"
        );
        Ok(RecordOutcome::Succeeded(classification))
    }
}

/// One attempt with a fresh client bound to `key`.
async fn attempt<F: ProviderFactory>(
    factory: &F,
    key: &str,
    text: &str,
) -> Result<Classification, ClassifyError> {
    let provider = factory.create(key)?;
    Classifier::new(provider).classify(text).await
}

/// Try keys from the pool's cursor onward, at most once each.
///
/// The cursor moves past every key that fails and stays on the key that
/// succeeds. Returns the classification (if any) and the number of attempts.
pub async fn classify_with_failover<F: ProviderFactory>(
    factory: &F,
    pool: &mut KeyPool,
    id: &str,
    text: &str,
) -> (Option<Classification>, usize) {
    let mut attempts = 0;
    while attempts < pool.len() {
        attempts += 1;
        let key_index = pool.cursor();
        let key = pool.current().to_string();
        match attempt(factory, &key, text).await {
            Ok(classification) => return (Some(classification), attempts),
            Err(err) => {
                let next = pool.advance();
                tracing::warn!(
                    id = %id,
                    key = %key_prefix(&key),
                    key_index,
                    attempt = attempts,
                    next_key = next,
                    error = %err,
                    "classification failed, rotating key"
                );
            }
        }
    }
    (None, attempts)
}

/// Fixed-width table of the input rows for the operator.
pub fn format_snapshot(records: &[Record]) -> String {
    let id_width = records
        .iter()
        .map(|r| r.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);
    let created_width = records
        .iter()
        .map(|r| r.created_at.chars().count())
        .max()
        .unwrap_or(0)
        .max("created".len());
    let text_width = SNAPSHOT_TEXT_WIDTH;

    let mut out = format!(
        "{:<id_width$}  {:<text_width$}  {:<created_width$}  modified\n",
        "id", "text", "created"
    );
    for record in records {
        let text = clip(&normalize_newlines(&record.text), text_width);
        out.push_str(&format!(
            "{:<id_width$}  {:<text_width$}  {:<created_width$}  {}\n",
            record.id, text, record.created_at, record.modified_at
        ));
    }
    out.push_str(&format!("[{} rows]", records.len()));
    out
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
