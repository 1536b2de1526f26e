// crates/core/src/llm/mod.rs
//! LLM integration module for snippet classification.
//!
//! Provides the `LlmProvider` capability trait, an OpenAI-compatible HTTP
//! implementation (OpenAI and OpenRouter), and the factory used to build a
//! fresh client per credential.

pub mod config;
pub mod factory;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{LlmConfig, ProviderType, ResponseFormat};
pub use factory::{create_provider, ProviderFactory};
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{CompletionRequest, LlmError, ResponseShape};
