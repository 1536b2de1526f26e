// crates/runner/src/lib.rs
//! Run variants for the drivelology classifier.
//!
//! Each binary picks one [`RunProfile`] and hands it to [`run_profile`].

use std::path::Path;

use anyhow::{Context, Result};
use drivel_core::llm::{LlmConfig, ProviderType, ResponseFormat};
use drivel_core::paths::resolve_store_path;
use drivel_core::source::{SheetsConfig, SheetsRowSource};
use drivel_core::{BatchDriver, CompletionStore, Credentials, KeyPool, RunSummary};
use tracing_subscriber::EnvFilter;

pub const SERVICE_ACCOUNT_FILE: &str = "service_account.json";
pub const SPREADSHEET: &str = "drivelology";
pub const WORKSHEET: &str = "Sheet1";

/// Where a run gets its API key(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// One key read from an environment variable.
    Env(&'static str),
    /// A rotating pool, one key per line.
    KeyFile(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct RunProfile {
    /// File stem of the completion store under `data/`.
    pub store_name: &'static str,
    pub provider: ProviderType,
    pub model: &'static str,
    pub response_format: ResponseFormat,
    pub credentials: CredentialSource,
    pub service_account_file: &'static str,
    pub spreadsheet: &'static str,
    pub worksheet: &'static str,
}

pub const GPT_4O_MINI: RunProfile = RunProfile {
    store_name: "gpt_4o_mini",
    provider: ProviderType::OpenAi,
    model: "gpt-4o-mini",
    response_format: ResponseFormat::JsonSchema,
    credentials: CredentialSource::Env("OPENAI_API_KEY"),
    service_account_file: SERVICE_ACCOUNT_FILE,
    spreadsheet: SPREADSHEET,
    worksheet: WORKSHEET,
};

pub const DEEPSEEK_V3: RunProfile = RunProfile {
    store_name: "deepseek_v3",
    provider: ProviderType::OpenRouter,
    model: "deepseek/deepseek-chat-v3-0324:free",
    response_format: ResponseFormat::JsonObject,
    credentials: CredentialSource::KeyFile("openrouter_keys.txt"),
    service_account_file: SERVICE_ACCOUNT_FILE,
    spreadsheet: SPREADSHEET,
    worksheet: WORKSHEET,
};

impl RunProfile {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.provider,
            model: self.model.to_string(),
            response_format: self.response_format,
            ..LlmConfig::default()
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,drivel_core=info,drivel_runner=info".into()),
        )
        .init();
}

pub fn resolve_credentials(source: CredentialSource) -> Result<Credentials> {
    match source {
        CredentialSource::Env(var) => {
            let key = std::env::var(var)
                .with_context(|| format!("environment variable {var} is not set"))?;
            if key.trim().is_empty() {
                anyhow::bail!("environment variable {var} is empty");
            }
            Ok(Credentials::Single(key.trim().to_string()))
        }
        CredentialSource::KeyFile(path) => {
            let pool = KeyPool::load(Path::new(path))
                .with_context(|| format!("loading key pool from {path}"))?;
            Ok(Credentials::Pool(pool))
        }
    }
}

/// Run one variant to completion.
///
/// The store is opened first so the output file exists even when a later
/// step fails.
pub async fn run_profile(profile: &RunProfile) -> Result<RunSummary> {
    let store = CompletionStore::open(resolve_store_path(profile.store_name))
        .context("opening completion store")?;
    let credentials = resolve_credentials(profile.credentials)?;
    let source = SheetsRowSource::from_service_account_file(
        profile.service_account_file,
        SheetsConfig::new(profile.spreadsheet, profile.worksheet),
    )
    .context("building spreadsheet source")?;

    tracing::info!(
        provider = profile.provider.name(),
        model = profile.model,
        store = %store.path().display(),
        format = ?store.format(),
        "starting run"
    );

    let mut driver = BatchDriver::new(store, profile.llm_config(), credentials);
    let summary = driver.run(&source).await?;
    Ok(summary)
}
