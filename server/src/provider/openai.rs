//! OpenAI-compatible chat completions (Groq by default)

mod wire;

use rocket::async_trait;

use crate::provider::{LlmApiProvider, LlmApiProviderSharedOptions, LlmError, LlmMessage};

use wire::{Completion, CompletionRequest, ErrorBody};

pub const API_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// OpenAI-compatible chat provider
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(http_client: &reqwest::Client, api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            client: http_client.clone(),
            api_key: api_key.to_owned(),
            base_url: base_url
                .unwrap_or(API_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
        }
    }
}

#[async_trait]
impl LlmApiProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[LlmMessage],
        options: &LlmApiProviderSharedOptions,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &options.model,
            messages: messages.iter().map(Into::into).collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::OpenAIError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(LlmError::OpenAIError(format!("API error {}: {}", status, detail)));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| LlmError::OpenAIError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &completion.usage {
            rocket::debug!(
                "Chat usage: {:?} prompt tokens, {:?} completion tokens",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        completion.into_text().ok_or(LlmError::NoResponse)
    }
}
