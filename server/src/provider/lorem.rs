use rocket::async_trait;

use crate::provider::{LlmApiProvider, LlmApiProviderSharedOptions, LlmError, LlmMessage, LlmRole};

/// An offline provider that answers with 'lorem ipsum...', for development
pub struct LoremProvider;

impl LoremProvider {
    pub fn new() -> Self {
        LoremProvider
    }
}

impl Default for LoremProvider {
    fn default() -> Self {
        Self::new()
    }
}

const LOREM_WORDS: [&str; 19] = [
    "Lorem", "ipsum", "dolor", "sit", "amet,", "consectetur", "adipiscing", "elit,", "sed",
    "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna",
    "aliqua.",
];

#[async_trait]
impl LlmApiProvider for LoremProvider {
    async fn chat(
        &self,
        messages: &[LlmMessage],
        options: &LlmApiProviderSharedOptions,
    ) -> Result<String, LlmError> {
        let question = messages
            .iter()
            .rev()
            .find(|message| message.role == LlmRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let max_words = options.max_tokens.unwrap_or(u32::MAX) as usize;
        let words = LOREM_WORDS
            .iter()
            .take(max_words)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(format!("You asked: \"{}\". {}", question, words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_latest_question() {
        let messages = [
            LlmMessage::system("Persona"),
            LlmMessage::user("First"),
            LlmMessage::assistant("Answer"),
            LlmMessage::user("Second"),
        ];
        let answer = LoremProvider::new()
            .chat(&messages, &LlmApiProviderSharedOptions::default())
            .await
            .unwrap();
        assert!(answer.starts_with("You asked: \"Second\"."));
        assert!(answer.ends_with("aliqua."));
    }
}
