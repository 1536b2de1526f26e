// crates/core/src/llm/provider.rs
//! LlmProvider trait defining the interface for completion providers.

use async_trait::async_trait;

use super::types::{CompletionRequest, LlmError};

/// A completion provider bound to one credential and one model.
///
/// Implementations:
/// - `OpenAiCompatProvider`: OpenAI chat completions, also used for OpenRouter
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Submit a prompt and get back the structured object the model produced.
    ///
    /// The returned value is only guaranteed to be a JSON object; checking it
    /// against `request.shape` is the caller's job.
    async fn submit(&self, request: CompletionRequest) -> Result<serde_json::Value, LlmError>;

    /// Provider name for logging/display (e.g. "openai", "openrouter").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gpt-4o-mini").
    fn model(&self) -> &str;
}
