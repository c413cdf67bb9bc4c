//! Text translation backends.
//!
//! Three interchangeable backends sit behind the [`Translator`] trait:
//!
//! - **Google**: the public web endpoint, no credential needed.
//! - **Gemini**: Google's generative API with an academic-translation prompt.
//! - **SiliconCloud**: an OpenAI-compatible chat endpoint. Rate limited, so
//!   dispatchers space its requests with a [`RequestThrottle`].

mod gemini;
mod google;
mod silicon_cloud;
mod throttle;

pub use gemini::GeminiTranslator;
pub use google::GoogleTranslator;
pub use silicon_cloud::SiliconCloudTranslator;
pub use throttle::RequestThrottle;

use crate::config::{Credentials, TranslationSettings};
use crate::error::{PodsubError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of a translation backend, stored next to every translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranslatorKind {
    #[default]
    Google,
    Gemini,
    SiliconCloud,
}

impl TranslatorKind {
    /// Whether the backend needs an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, TranslatorKind::Google)
    }
}

impl std::str::FromStr for TranslatorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(TranslatorKind::Google),
            "gemini" => Ok(TranslatorKind::Gemini),
            "silicon_cloud" | "siliconcloud" | "silicon-cloud" => Ok(TranslatorKind::SiliconCloud),
            _ => Err(format!("Unknown translator: {}", s)),
        }
    }
}

impl std::fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorKind::Google => write!(f, "google"),
            TranslatorKind::Gemini => write!(f, "gemini"),
            TranslatorKind::SiliconCloud => write!(f, "silicon_cloud"),
        }
    }
}

/// Trait for text translation services.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a piece of text into the target language.
    async fn translate(&self, text: &str) -> Result<String>;

    /// Which backend this is.
    fn kind(&self) -> TranslatorKind;

    /// Whether concurrent callers must space their requests.
    fn rate_limited(&self) -> bool {
        false
    }
}

/// Create a translator for the given backend.
///
/// Credentials are passed in explicitly; a backend that needs a key fails
/// here rather than on the first request.
pub fn create_translator(
    kind: TranslatorKind,
    credentials: &Credentials,
    settings: &TranslationSettings,
) -> Result<Arc<dyn Translator>> {
    let api_key = || {
        credentials.for_translator(kind).ok_or_else(|| {
            PodsubError::Config(format!("Please set the {} API key first", kind))
        })
    };

    let translator: Arc<dyn Translator> = match kind {
        TranslatorKind::Google => Arc::new(GoogleTranslator::with_config(settings)?),
        TranslatorKind::Gemini => Arc::new(GeminiTranslator::with_config(&api_key()?, settings)?),
        TranslatorKind::SiliconCloud => {
            Arc::new(SiliconCloudTranslator::with_config(&api_key()?, settings)?)
        }
    };
    Ok(translator)
}

/// Reject empty source text before any request is made.
pub(crate) fn ensure_source_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PodsubError::Translation(
            "Input text for translation cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Shared HTTP client builder with the configured timeout.
pub(crate) fn http_client(settings: &TranslationSettings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            TranslatorKind::Google,
            TranslatorKind::Gemini,
            TranslatorKind::SiliconCloud,
        ] {
            assert_eq!(kind.to_string().parse::<TranslatorKind>().unwrap(), kind);
        }
        assert!("deepl".parse::<TranslatorKind>().is_err());
    }

    #[test]
    fn test_kind_serde_tag() {
        let json = serde_json::to_string(&TranslatorKind::SiliconCloud).unwrap();
        assert_eq!(json, "\"silicon_cloud\"");
    }

    #[test]
    fn test_factory_requires_key() {
        let settings = TranslationSettings::default();
        let credentials = Credentials {
            silicon_cloud_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };

        let google = create_translator(TranslatorKind::Google, &credentials, &settings).unwrap();
        assert_eq!(google.kind(), TranslatorKind::Google);
        assert!(!google.rate_limited());

        let silicon =
            create_translator(TranslatorKind::SiliconCloud, &credentials, &settings).unwrap();
        assert!(silicon.rate_limited());
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!(ensure_source_text("   ").is_err());
        assert_eq!(ensure_source_text(" hi ").unwrap(), "hi");
    }
}
