//! Gemini translation backend.

use super::{ensure_source_text, http_client, Translator, TranslatorKind};
use crate::config::TranslationSettings;
use crate::error::{PodsubError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MARKER: &str = "🔤";

/// Translator backed by Gemini `generateContent`.
pub struct GeminiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    lang_from: String,
    lang_to: String,
}

impl GeminiTranslator {
    pub fn with_config(api_key: &str, settings: &TranslationSettings) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PodsubError::Config("Gemini API key must be provided".to_string()));
        }

        Ok(Self {
            client: http_client(settings)?,
            api_key: api_key.trim().to_string(),
            model: settings.gemini_model.clone(),
            lang_from: "English".to_string(),
            lang_to: "Chinese".to_string(),
        })
    }

    fn prompt(&self, source_text: &str) -> String {
        format!(
            "As an academic expert with specialized knowledge in various fields, please provide a \
             proficient and precise translation from {from} to {to} of the academic text enclosed \
             in {m}. It is crucial to maintaining the original phrase or sentence and ensure \
             accuracy while utilizing the appropriate language. The text is as follows: \
             {m} {text} {m} Please provide the translated result without any additional \
             explanation and remove {m}.",
            from = self.lang_from,
            to = self.lang_to,
            m = MARKER,
            text = source_text,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }
}

/// Pull the answer text out of a `generateContent` reply.
fn parse_response(value: &serde_json::Value) -> Result<String> {
    let candidate = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| PodsubError::Translation("No translation candidates in response".to_string()))?;

    let text = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| PodsubError::Translation("No content in translation response".to_string()))?;

    let cleaned = text.replace(MARKER, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(PodsubError::Translation("Gemini returned an empty translation".to_string()));
    }
    Ok(cleaned.to_string())
}

#[async_trait]
impl Translator for GeminiTranslator {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn translate(&self, text: &str) -> Result<String> {
        let text = ensure_source_text(text)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": self.prompt(text) }] }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value: serde_json::Value = response.json().await?;
        let translated = parse_response(&value)?;
        debug!("Gemini translation: {} chars", translated.chars().count());
        Ok(translated)
    }

    fn kind(&self) -> TranslatorKind {
        TranslatorKind::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_strips_markers() {
        let value = json!({
            "candidates": [{ "content": { "parts": [{ "text": " 🔤 思考的人工智能 🔤\n" }] } }]
        });
        assert_eq!(parse_response(&value).unwrap(), "思考的人工智能");
    }

    #[test]
    fn test_parse_response_missing_candidates() {
        assert!(parse_response(&json!({ "candidates": [] })).is_err());
        assert!(parse_response(&json!({ "candidates": [{}] })).is_err());
    }

    #[test]
    fn test_prompt_wraps_source() {
        let translator =
            GeminiTranslator::with_config("key", &TranslationSettings::default()).unwrap();
        let prompt = translator.prompt("Hello there");
        assert!(prompt.contains("🔤 Hello there 🔤"));
        assert!(prompt.contains("from English to Chinese"));
        assert!(translator.endpoint().ends_with("gemini-1.5-flash-latest:generateContent"));
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(GeminiTranslator::with_config(" ", &TranslationSettings::default()).is_err());
    }
}
