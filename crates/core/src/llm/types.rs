// crates/core/src/llm/types.rs
//! Request/response/error types for LLM integration.

use thiserror::Error;

/// Expected JSON shape of a structured response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    /// Schema name sent to providers that support named JSON schemas.
    pub name: String,
    /// JSON schema of the object.
    pub schema: serde_json::Value,
}

/// Request for a structured completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub shape: ResponseShape,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, shape: ResponseShape) -> Self {
        Self {
            prompt: prompt.into(),
            shape,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Credential rejected ({status})")]
    Unauthorized { status: u16 },

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),

    #[error("Provider not available: {0}")]
    NotAvailable(String),
}
