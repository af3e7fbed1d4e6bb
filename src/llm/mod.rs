pub mod masking;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ResolvedSettings;

pub use masking::{Masker, MaskingResult, PromptMasker};
pub use openai::OpenAiCompatibleClient;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub raw: Option<serde_json::Value>,
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse>;
}

/// Builds a client bound to one job's resolved settings.
pub type ClientFactory =
    Arc<dyn Fn(&ResolvedSettings) -> Result<Arc<dyn CompletionClient>> + Send + Sync>;

pub fn default_client_factory() -> ClientFactory {
    Arc::new(|settings: &ResolvedSettings| -> Result<Arc<dyn CompletionClient>> {
        let client = OpenAiCompatibleClient::from_settings(settings)?;
        Ok(Arc::new(client) as Arc<dyn CompletionClient>)
    })
}
