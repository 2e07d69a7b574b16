//! Chat completion providers and the response generator

pub mod lorem;
pub mod openai;

use std::time::Duration;

use rocket::{async_trait, fairing::AdHoc};
use serde::Serialize;

use crate::{
    config::{get_app_config, AppConfig, LlmProviderKind},
    provider::{lorem::LoremProvider, openai::OpenAIProvider},
};

pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Answer returned when no provider credential is configured
pub const UNCONFIGURED_RESPONSE: &str = "I'm sorry, but the AI service is not configured. \
Please contact an administrator to set up the Groq API key.";
/// Answer returned when the provider call fails
pub const FAILED_RESPONSE: &str =
    "I'm sorry, I encountered an error while processing your question. Please try again later.";

/// LLM provider-related errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("OpenAI error: {0}")]
    OpenAIError(String),
    #[error("No chat response")]
    NoResponse,
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// A role-tagged message sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// Shared configuration for LLM provider requests
#[derive(Clone, Debug)]
pub struct LlmApiProviderSharedOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmApiProviderSharedOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }
}

/// Unified API for LLM providers
#[async_trait]
pub trait LlmApiProvider: Send + Sync {
    /// Submit a conversation to the provider (not streamed), returning the answer text
    async fn chat(
        &self,
        messages: &[LlmMessage],
        options: &LlmApiProviderSharedOptions,
    ) -> Result<String, LlmError>;
}

/// Produces answers to chat questions, managed in Rocket state.
pub enum ResponseGenerator {
    /// No credential configured: every answer is [UNCONFIGURED_RESPONSE]
    Unconfigured,
    Configured {
        provider: Box<dyn LlmApiProvider>,
        options: LlmApiProviderSharedOptions,
        /// Append the provider error to [FAILED_RESPONSE]
        error_details: bool,
    },
}

impl ResponseGenerator {
    pub fn from_config(app_config: &AppConfig) -> Result<Self, LlmError> {
        let options = LlmApiProviderSharedOptions {
            model: app_config
                .llm_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            ..Default::default()
        };
        let provider: Box<dyn LlmApiProvider> = match app_config.llm_provider {
            LlmProviderKind::Lorem => Box::new(LoremProvider::new()),
            LlmProviderKind::OpenAI => {
                let Some(api_key) = app_config.groq_api_key.as_deref().filter(|k| !k.is_empty())
                else {
                    return Ok(ResponseGenerator::Unconfigured);
                };
                let timeout = app_config.llm_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
                let http_client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(timeout))
                    .build()?;
                Box::new(OpenAIProvider::new(
                    &http_client,
                    api_key,
                    app_config.llm_base_url.as_deref(),
                ))
            }
        };

        Ok(ResponseGenerator::Configured {
            provider,
            options,
            error_details: app_config.llm_error_details,
        })
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, ResponseGenerator::Configured { .. })
    }

    /// Generate an answer. Never fails: provider errors are logged and replaced
    /// by a fallback answer.
    pub async fn generate(&self, messages: &[LlmMessage]) -> String {
        let ResponseGenerator::Configured {
            provider,
            options,
            error_details,
        } = self
        else {
            return UNCONFIGURED_RESPONSE.to_owned();
        };

        match provider.chat(messages, options).await {
            Ok(text) => text,
            Err(e) => {
                rocket::error!("Error generating AI response: {}", e);
                if *error_details {
                    format!("{FAILED_RESPONSE} Error: {e}")
                } else {
                    FAILED_RESPONSE.to_owned()
                }
            }
        }
    }
}

/// Fairing that builds the response generator from the app config
pub fn setup_llm() -> AdHoc {
    AdHoc::try_on_ignite("LLM provider", |rocket| async {
        match ResponseGenerator::from_config(get_app_config(&rocket)) {
            Ok(generator) => {
                if !generator.is_configured() {
                    rocket::warn!("GROQ_API_KEY is not set: chat answers are disabled");
                }
                Ok(rocket.manage(generator))
            }
            Err(e) => {
                rocket::error!("Failed to set up LLM provider: {}", e);
                Err(rocket)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn generator(server: &MockServer, error_details: bool) -> ResponseGenerator {
        let provider = OpenAIProvider::new(&reqwest::Client::new(), "test-key", Some(&server.uri()));
        ResponseGenerator::Configured {
            provider: Box::new(provider),
            options: LlmApiProviderSharedOptions::default(),
            error_details,
        }
    }

    #[tokio::test]
    async fn unconfigured_generator_returns_fixed_answer() {
        let answer = ResponseGenerator::Unconfigured
            .generate(&[LlmMessage::user("Hi")])
            .await;
        assert_eq!(answer, UNCONFIGURED_RESPONSE);
    }

    #[tokio::test]
    async fn configured_generator_calls_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": DEFAULT_MODEL,
                "max_tokens": 1000,
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": "Be helpful" },
                    { "role": "user", "content": "Where is HR?" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Second floor." } }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = [LlmMessage::system("Be helpful"), LlmMessage::user("Where is HR?")];
        let answer = generator(&server, false).generate(&messages).await;
        assert_eq!(answer, "Second floor.");
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_fallback_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "Rate limit reached" }
            })))
            .mount(&server)
            .await;

        let messages = [LlmMessage::user("Hello?")];
        let answer = generator(&server, false).generate(&messages).await;
        assert_eq!(answer, FAILED_RESPONSE);

        let answer = generator(&server, true).generate(&messages).await;
        assert!(answer.starts_with(FAILED_RESPONSE));
        assert!(answer.contains(" Error: "));
        assert!(answer.contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn empty_choices_count_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let answer = generator(&server, true)
            .generate(&[LlmMessage::user("Hello?")])
            .await;
        assert_eq!(answer, format!("{FAILED_RESPONSE} Error: No chat response"));
    }
}
