//! SiliconCloud translation backend (OpenAI-compatible chat API).

use super::{ensure_source_text, Translator, TranslatorKind};
use crate::config::TranslationSettings;
use crate::error::{PodsubError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are an expert translator. Please translate the following \
                             English text to Chinese accurately and fluently.";

/// Translator backed by a SiliconCloud-hosted chat model.
pub struct SiliconCloudTranslator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl SiliconCloudTranslator {
    pub fn with_config(api_key: &str, settings: &TranslationSettings) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PodsubError::Config(
                "SiliconCloud API key must be provided".to_string(),
            ));
        }

        Ok(Self {
            client: create_client(
                &settings.silicon_cloud_base_url,
                api_key.trim(),
                settings.request_timeout(),
            )?,
            model: settings.silicon_cloud_model.clone(),
        })
    }

    fn messages(text: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PodsubError::Translation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| PodsubError::Translation(e.to_string()))?
                .into(),
        ])
    }
}

#[async_trait]
impl Translator for SiliconCloudTranslator {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn translate(&self, text: &str) -> Result<String> {
        let text = ensure_source_text(text)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(text)?)
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| PodsubError::Translation(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodsubError::Translation(format!("SiliconCloud API error: {}", e)))?;

        let translated = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| PodsubError::Translation("Empty response from SiliconCloud".to_string()))?;

        debug!("SiliconCloud translation: {} chars", translated.chars().count());
        Ok(translated)
    }

    fn kind(&self) -> TranslatorKind {
        TranslatorKind::SiliconCloud
    }

    fn rate_limited(&self) -> bool {
        true
    }
}
