// crates/core/src/llm/openai.rs
//! OpenAI-compatible chat completions provider (OpenAI, OpenRouter).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::json;

use super::config::{LlmConfig, ProviderType, ResponseFormat};
use super::provider::LlmProvider;
use super::types::{CompletionRequest, LlmError};

/// Provider speaking the `/chat/completions` protocol with a bearer key.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    provider: ProviderType,
    endpoint: String,
    model: String,
    api_key: String,
    response_format: ResponseFormat,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    // OpenRouter reports upstream failures as a 200 with an `error` body.
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl OpenAiCompatProvider {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::NotAvailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider: config.provider,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            response_format: config.response_format,
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let response_format = match self.response_format {
            ResponseFormat::JsonObject => json!({ "type": "json_object" }),
            ResponseFormat::JsonSchema => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.shape.name,
                    "strict": true,
                    "schema": request.shape.schema,
                },
            }),
        };

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": request.prompt },
            ],
            "response_format": response_format,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn submit(&self, request: CompletionRequest) -> Result<serde_json::Value, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = self.request_body(&request);
        let t0 = Instant::now();

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.model,
            prompt_len = request.prompt.len(),
            "completion: sending request"
        );

        let mut builder = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        if self.provider == ProviderType::OpenRouter {
            builder = builder.header("X-Title", "drivel-sort");
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = resp.text().await.unwrap_or_default();
            tracing::debug!(elapsed_ms, status = status.as_u16(), "completion: non-success status");
            return Err(error_for_status(status.as_u16(), retry_after, &text));
        }

        let payload: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::ParseFailed(format!("invalid completion payload: {e}")))?;

        if let Some(err) = payload.error {
            let status = err
                .code
                .as_ref()
                .and_then(|c| c.as_u64())
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(status.as_u16());
            return Err(error_for_status(status, None, &err.message));
        }

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseFailed("response has no message content".to_string()))?;

        tracing::debug!(elapsed_ms, content_len = content.len(), "completion: response received");
        parse_structured_content(&content)
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
fn error_for_status(status: u16, retry_after: Option<u64>, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::Unauthorized { status },
        402 => LlmError::QuotaExhausted(truncate_chars(body, 300).to_string()),
        429 => LlmError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(0),
        },
        _ => LlmError::Api {
            status,
            body: truncate_chars(body, 500).to_string(),
        },
    }
}

/// Turn the message content into a JSON object.
///
/// Handles a bare object, an object wrapped in a markdown code fence, and an
/// object surrounded by prose.
pub fn parse_structured_content(content: &str) -> Result<serde_json::Value, LlmError> {
    let cleaned = strip_markdown_json(content);
    let value = match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(v) => v,
        Err(_) => extract_json_from_text(&cleaned).ok_or_else(|| {
            LlmError::ParseFailed(format!(
                "no JSON object found in response: {}",
                truncate_chars(&cleaned, 200)
            ))
        })?,
    };

    if !value.is_object() {
        return Err(LlmError::ParseFailed(format!(
            "expected a JSON object, got: {}",
            truncate_chars(&value.to_string(), 200)
        )));
    }
    Ok(value)
}

/// Strip markdown code block fences from a string containing JSON.
fn strip_markdown_json(s: &str) -> String {
    let trimmed = s.trim();

    if trimmed.starts_with("```") {
        let Some(newline_pos) = trimmed.find('\n') else {
            return trimmed.to_string();
        };
        let start = newline_pos + 1;
        let end = trimmed.rfind("```").unwrap_or(trimmed.len());
        if end > start {
            return trimmed[start..end].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Extract the first balanced `{...}` block, ignoring braces inside strings.
fn extract_json_from_text(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    serde_json::from_str(&text[start..end?]).ok()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
