//! Language-model client — one request, one response.
//!
//! RULE: the analysis core never depends on this module succeeding.
//! Callers treat an error as "no supplementary narrative available".

use crate::{
    config::LlmConfig,
    error::{TriangleError, TriangleResult},
};
use serde::{Deserialize, Serialize};

/// A model reply: parsed JSON when the text is valid JSON, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "body", rename_all = "snake_case")]
pub enum LlmOutput {
    Json(serde_json::Value),
    Text(String),
}

impl LlmOutput {
    pub fn parse(text: &str) -> Self {
        let trimmed = strip_code_fence(text.trim());
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => LlmOutput::Json(value),
            Err(_)    => LlmOutput::Text(text.to_string()),
        }
    }

    /// True for replies carrying nothing usable (null, empty text or
    /// empty containers).
    pub fn is_empty(&self) -> bool {
        match self {
            LlmOutput::Text(t) => t.trim().is_empty(),
            LlmOutput::Json(v) => match v {
                serde_json::Value::Null      => true,
                serde_json::Value::Bool(b)   => !b,
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(a)  => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
                serde_json::Value::Number(_) => false,
            },
        }
    }
}

/// Models often wrap JSON in a ```json fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub trait LlmClient {
    fn model(&self) -> &str;

    fn complete(&self, prompt: &str) -> TriangleResult<LlmOutput>;
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model:             &'a str,
    input:             &'a str,
    temperature:       f64,
    max_output_tokens: u32,
}

/// Blocking client for a Responses-style HTTP endpoint.
pub struct ResponsesClient {
    http:              reqwest::blocking::Client,
    endpoint:          String,
    model:             String,
    api_key:           String,
    temperature:       f64,
    max_output_tokens: u32,
}

impl ResponsesClient {
    pub fn new(config: &LlmConfig, api_key: String) -> TriangleResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint:          config.endpoint.clone(),
            model:             config.model.clone(),
            api_key,
            temperature:       config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Build a client when the configured API-key variable is set and
    /// non-empty; `Ok(None)` otherwise.
    pub fn from_env(config: &LlmConfig) -> TriangleResult<Option<Self>> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::new(config, key).map(Some),
            _ => {
                log::info!("{} not set, language-model calls disabled", config.api_key_env);
                Ok(None)
            }
        }
    }
}

impl LlmClient for ResponsesClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> TriangleResult<LlmOutput> {
        let body = ResponsesRequest {
            model:             &self.model,
            input:             prompt,
            temperature:       self.temperature,
            max_output_tokens: self.max_output_tokens,
        };
        log::debug!("llm request: model={} prompt_chars={}", self.model, prompt.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(TriangleError::LlmResponse {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let payload: serde_json::Value = response.json()?;
        let text = extract_output_text(&payload).ok_or_else(|| TriangleError::LlmResponse {
            reason: "response carried no output text".into(),
        })?;
        Ok(LlmOutput::parse(&text))
    }
}

/// Pull the reply text out of a Responses payload: the `output_text`
/// convenience field when present, else every `output_text` content part
/// concatenated in order.
pub fn extract_output_text(payload: &serde_json::Value) -> Option<String> {
    if let Some(text) = payload.get("output_text").and_then(|v| v.as_str()) {
        return Some(text.to_string());
    }

    let text: String = payload
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(|c| c.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    (!text.is_empty()).then_some(text)
}
