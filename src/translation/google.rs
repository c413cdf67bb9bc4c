//! Google web translation backend.

use super::{ensure_source_text, http_client, Translator, TranslatorKind};
use crate::config::TranslationSettings;
use crate::error::{PodsubError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Translator backed by the public Google web endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    target_language: String,
    source_language: String,
    max_attempts: u32,
}

impl GoogleTranslator {
    pub fn with_config(settings: &TranslationSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings)?,
            target_language: settings.target_language.clone(),
            source_language: "auto".to_string(),
            max_attempts: settings.google_retries.max(1),
        })
    }

    fn request_url(&self, text: &str) -> Result<Url> {
        Url::parse_with_params(
            ENDPOINT,
            &[
                ("client", "gtx"),
                ("sl", self.source_language.as_str()),
                ("tl", self.target_language.as_str()),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| PodsubError::Translation(format!("Invalid request URL: {}", e)))
    }

    async fn request_once(&self, url: &Url) -> Result<String> {
        let value: serde_json::Value = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_response(&value)
    }
}

/// Concatenate the translated sentence parts of a `translate_a/single` reply.
fn parse_response(value: &serde_json::Value) -> Result<String> {
    let parts = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| PodsubError::Translation("Unexpected Google response shape".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get(0).and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(PodsubError::Translation("Google returned no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Translator for GoogleTranslator {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn translate(&self, text: &str) -> Result<String> {
        let text = ensure_source_text(text)?;
        let url = self.request_url(text)?;

        let mut attempt = 1;
        loop {
            match self.request_once(&url).await {
                Ok(translated) => {
                    debug!("Google translation succeeded on attempt {}", attempt);
                    return Ok(translated);
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!("Google translation attempt {} failed: {}", attempt, e);
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn kind(&self) -> TranslatorKind {
        TranslatorKind::Google
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_joins_parts() {
        let value = json!([
            [["你好，", "Hello, ", null, null], ["你好吗？", "how are you?", null, null], [null, null, "Nǐ hǎo"]],
            null,
            "en"
        ]);
        assert_eq!(parse_response(&value).unwrap(), "你好，你好吗？");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(parse_response(&json!({"error": 1})).is_err());
        assert!(parse_response(&json!([[]])).is_err());
    }

    #[test]
    fn test_request_url_encodes_text() {
        let translator = GoogleTranslator::with_config(&TranslationSettings::default()).unwrap();
        let url = translator.request_url("a b&c").unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("client=gtx"));
        assert!(query.contains("tl=zh-cn"));
        assert!(query.contains("q=a+b%26c"));
    }
}
