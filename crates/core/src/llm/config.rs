// crates/core/src/llm/config.rs
//! LLM provider configuration types.

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// Configuration for an LLM provider. The credential is supplied separately
/// so one config can build a client per key.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    /// Overrides the provider's default base URL.
    pub endpoint: Option<String>,
    pub response_format: ResponseFormat,
    pub timeout_secs: u64,
}

/// Supported LLM provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAi,
    OpenRouter,
}

impl ProviderType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_ENDPOINT,
            Self::OpenRouter => OPENROUTER_ENDPOINT,
        }
    }
}

/// How the expected shape is communicated to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `{"type": "json_object"}`; the shape is described by the prompt only.
    JsonObject,
    /// `{"type": "json_schema"}` with the shape's schema in strict mode.
    JsonSchema,
}

impl LlmConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAi,
            model: "gpt-4o-mini".into(),
            endpoint: None,
            response_format: ResponseFormat::JsonSchema,
            timeout_secs: 120,
        }
    }
}
