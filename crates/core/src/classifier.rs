// crates/core/src/classifier.rs
//! Classifier client: prompt in, validated `Classification` out.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::category::Category;
use crate::llm::{CompletionRequest, LlmError, LlmProvider};
use crate::prompt::{build_prompt, classification_shape};
use crate::types::Classification;

/// Any reason a single classification attempt did not produce a result.
///
/// Callers treat every variant the same way; the split only exists so logs
/// say what went wrong.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("invalid classification: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    reason: String,
    category: String,
}

/// Wraps one provider (and therefore one credential).
#[derive(Clone)]
pub struct Classifier {
    provider: Arc<dyn LlmProvider>,
}

impl Classifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let request = CompletionRequest::new(build_prompt(text), classification_shape());
        let value = self.provider.submit(request).await?;
        validate_classification(value)
    }
}

/// Check a provider payload against the `{reason, category}` shape.
pub fn validate_classification(value: serde_json::Value) -> Result<Classification, ClassifyError> {
    let raw: RawClassification = serde_json::from_value(value)
        .map_err(|e| ClassifyError::Invalid(format!("response does not match shape: {e}")))?;

    let reason = raw.reason.trim();
    if reason.is_empty() {
        return Err(ClassifyError::Invalid("empty reason".to_string()));
    }

    let category = Category::parse(&raw.category)
        .ok_or_else(|| ClassifyError::Invalid(format!("unknown category {:?}", raw.category)))?;

    Ok(Classification {
        reason: reason.to_string(),
        category,
    })
}
