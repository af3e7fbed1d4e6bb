use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::MaskError;
use crate::llm::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::models::ResolvedSettings;

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format.
pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: Option<String>,
    default_model: Option<String>,
    http: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        default_model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            default_model: default_model.filter(|m| !m.is_empty()),
            http,
        })
    }

    pub fn from_settings(settings: &ResolvedSettings) -> Result<Self> {
        Self::new(
            &settings.endpoint_url,
            settings.api_key.clone(),
            Some(settings.model_name.clone()),
            settings.timeout_ms.map(Duration::from_millis),
        )
    }

    fn build_payload(model: &str, req: &CompletionRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = req.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.prompt }));

        let mut payload = json!({ "model": model, "messages": messages });
        if let Some(temperature) = req.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = req.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        payload
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        let model = if req.model.trim().is_empty() {
            self.default_model.clone().ok_or_else(|| {
                MaskError::Usage(
                    "LLM model name is required. Provide it in the request or configure a default model."
                        .to_string(),
                )
            })?
        } else {
            req.model.clone()
        };

        let url = format!("{}/chat/completions", self.base_url);
        let payload = Self::build_payload(&model, &req);
        tracing::debug!("POST {} (model {})", url, model);

        let mut request = self.http.post(&url).json(&payload);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MaskError::Request(format!(
                "LLM request failed with status {}: {}",
                status.as_u16(),
                body
            ))
            .into());
        }

        let data: Value = response.json().await?;
        let text = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MaskError::Internal(
                    "LLM response did not include a message content string.".to_string(),
                )
            })?
            .to_string();

        Ok(CompletionResponse {
            text,
            raw: Some(data),
        })
    }
}
