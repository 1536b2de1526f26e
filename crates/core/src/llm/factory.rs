// crates/core/src/llm/factory.rs
//! Provider factory: creates an LlmProvider from configuration and a credential.

use std::sync::Arc;

use super::config::LlmConfig;
use super::openai::OpenAiCompatProvider;
use super::provider::LlmProvider;
use super::types::LlmError;

/// Builds a fresh provider bound to one credential.
///
/// The batch driver asks for a new client every time it rotates to another
/// key, so nothing from a rejected credential is reused.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>, LlmError>;
}

/// Create an LLM provider based on the given configuration.
pub fn create_provider(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::NotAvailable(format!(
            "empty API key for provider {}",
            config.provider.name()
        )));
    }
    Ok(Arc::new(OpenAiCompatProvider::new(config, api_key)?))
}

impl ProviderFactory for LlmConfig {
    fn create(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
        create_provider(self, api_key)
    }
}
