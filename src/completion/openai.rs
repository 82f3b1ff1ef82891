//! OpenAI chat-completions backed completion service.

use super::CompletionService;
use crate::config::CompletionSettings;
use crate::error::{PeonError, Result};
use crate::openai::create_client_with;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Sends the whole grounded prompt as one user message.
pub struct OpenAICompletion {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAICompletion {
    /// Create a completion service from settings. The HTTP client uses the
    /// configured timeout as well.
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        let client = create_client_with(
            Duration::from_secs(settings.timeout_secs.max(1)),
            settings.api_base.as_deref(),
        )?;

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAICompletion {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PeonError::Completion(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| PeonError::Completion(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PeonError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(PeonError::EmptyCompletion)?;

        debug!("Received {} characters from {}", answer.len(), self.model);
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = CompletionSettings {
            model: "llama-3-70b".to_string(),
            api_base: Some("http://localhost:11434/v1".to_string()),
            ..CompletionSettings::default()
        };
        let service = OpenAICompletion::from_settings(&settings).unwrap();
        assert_eq!(service.model(), "llama-3-70b");
    }
}
