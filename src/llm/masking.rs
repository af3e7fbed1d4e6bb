use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::MaskingOptions;

const MASKING_SYSTEM_PROMPT: &str = "You are a redaction assistant. You replace the names of people, \
companies and organizations in the user's text with the requested mask token. \
You never add explanations, headings or quotes, and you never alter any other part of the text.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskingResult {
    pub masked_text: String,
    pub original_text: Option<String>,
}

/// The delegated masking operation.
#[async_trait]
pub trait Masker: Send + Sync {
    async fn mask(
        &self,
        client: &dyn CompletionClient,
        text: &str,
        options: Option<&MaskingOptions>,
    ) -> Result<MaskingResult>;
}

/// Masks by prompting a completion model and returning its reply verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptMasker;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn build_user_prompt(text: &str, options: &MaskingOptions) -> String {
    let style = options.style.unwrap_or_default();
    let language = options.language.unwrap_or_default();
    format!(
        "Mask every part of the text below that names a person, company or organization.\n\
         \n\
         - Mask token: {}\n\
         - Preserve character count: {}\n\
         - Language: {}\n\
         - Also mask ambiguous proper nouns: {}\n\
         \n\
         Return the text in exactly its original form with only the masked parts replaced. \
         Do not write any explanation or commentary; return the text only.\n\
         \n\
         Text:\n{}",
        style.token(),
        yes_no(options.keep_length.unwrap_or(false)),
        language.as_str(),
        yes_no(options.mask_unknown_entities.unwrap_or(false)),
        text
    )
}

#[async_trait]
impl Masker for PromptMasker {
    async fn mask(
        &self,
        client: &dyn CompletionClient,
        text: &str,
        options: Option<&MaskingOptions>,
    ) -> Result<MaskingResult> {
        let defaults = MaskingOptions::default();
        let options = options.unwrap_or(&defaults);
        let model = options
            .model
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let response = client
            .complete(CompletionRequest {
                model,
                prompt: build_user_prompt(text, options),
                system_prompt: Some(MASKING_SYSTEM_PROMPT.to_string()),
                temperature: None,
                max_tokens: None,
            })
            .await?;

        Ok(MaskingResult {
            masked_text: response.text,
            original_text: Some(text.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::models::{MaskingLanguage, MaskingStyle};
    use std::sync::Mutex;

    struct RecordingClient {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingClient {
        async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
            self.seen.lock().unwrap().push(req);
            Ok(CompletionResponse {
                text: self.reply.clone(),
                raw: None,
            })
        }
    }

    #[test]
    fn test_prompt_defaults() {
        let prompt = build_user_prompt("Hello Ito", &MaskingOptions::default());
        assert!(prompt.contains("Mask token: ■■■"));
        assert!(prompt.contains("Preserve character count: no"));
        assert!(prompt.contains("Language: ja"));
        assert!(prompt.contains("Also mask ambiguous proper nouns: no"));
        assert!(prompt.ends_with("Text:\nHello Ito"));
    }

    #[test]
    fn test_prompt_reflects_options() {
        let options = MaskingOptions {
            style: Some(MaskingStyle::MaskTag),
            keep_length: Some(true),
            language: Some(MaskingLanguage::En),
            mask_unknown_entities: Some(true),
            model: None,
        };
        let prompt = build_user_prompt("x", &options);
        assert!(prompt.contains("Mask token: [MASK]"));
        assert!(prompt.contains("Preserve character count: yes"));
        assert!(prompt.contains("Language: en"));
        assert!(prompt.contains("Also mask ambiguous proper nouns: yes"));
    }

    #[tokio::test]
    async fn test_mask_returns_completion_text() {
        let client = RecordingClient {
            reply: "[MASK] met [MASK]".to_string(),
            seen: Mutex::new(Vec::new()),
        };
        let options = MaskingOptions {
            model: Some("  llama3  ".to_string()),
            ..Default::default()
        };
        let result = PromptMasker
            .mask(&client, "Abe met Ono", Some(&options))
            .await
            .expect("mask");
        assert_eq!(result.masked_text, "[MASK] met [MASK]");
        assert_eq!(result.original_text.as_deref(), Some("Abe met Ono"));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "llama3");
        assert!(seen[0].system_prompt.is_some());
    }

    #[tokio::test]
    async fn test_mask_without_options_leaves_model_blank() {
        let client = RecordingClient {
            reply: "ok".to_string(),
            seen: Mutex::new(Vec::new()),
        };
        PromptMasker.mask(&client, "t", None).await.expect("mask");
        assert_eq!(client.seen.lock().unwrap()[0].model, "");
    }
}
