//! Configuration settings for Podsub.

use crate::translation::TranslatorKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub playback: PlaybackSettings,
    pub translation: TranslationSettings,
    pub credentials: Credentials,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding the audio index and subtitle cache.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.podsub".to_string(),
        }
    }
}

/// Timing of the playback/highlight loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often the position poller samples the player.
    pub poll_interval_ms: u64,
    /// Minimum forward movement before a tick is processed.
    pub update_interval_ms: i64,
    /// Jumps larger than this are treated as seeks and always processed.
    pub seek_threshold_ms: i64,
    /// Delay between two progressively revealed subtitles.
    pub reveal_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            update_interval_ms: 100,
            seek_threshold_ms: 1000,
            reveal_interval_ms: 100,
        }
    }
}

impl PlaybackSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }
}

/// Translation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationSettings {
    /// Backend used for new translation runs.
    pub provider: TranslatorKind,
    /// Maximum in-flight translation requests.
    pub max_concurrent: usize,
    /// Minimum spacing between request starts for rate-limited backends.
    pub min_request_interval_ms: u64,
    /// Target language code for the Google backend.
    pub target_language: String,
    /// Gemini model name.
    pub gemini_model: String,
    /// Model served by SiliconCloud.
    pub silicon_cloud_model: String,
    /// OpenAI-compatible base URL for SiliconCloud.
    pub silicon_cloud_base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Attempts per Google request.
    pub google_retries: u32,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            provider: TranslatorKind::Google,
            max_concurrent: 5,
            min_request_interval_ms: 100,
            target_language: "zh-cn".to_string(),
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            silicon_cloud_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            silicon_cloud_base_url: "https://api.siliconflow.cn/v1".to_string(),
            request_timeout_secs: 30,
            google_retries: 3,
        }
    }
}

impl TranslationSettings {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// API credentials for the transcription and translation backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub silicon_cloud_api_key: Option<String>,
    pub asr_api_key: Option<String>,
}

impl Credentials {
    /// Gemini key, falling back to `GEMINI_API_KEY`.
    pub fn gemini(&self) -> Option<String> {
        non_empty(self.gemini_api_key.as_deref()).or_else(|| env_key("GEMINI_API_KEY"))
    }

    /// SiliconCloud key, falling back to `SILICON_CLOUD_API_KEY`.
    pub fn silicon_cloud(&self) -> Option<String> {
        non_empty(self.silicon_cloud_api_key.as_deref())
            .or_else(|| env_key("SILICON_CLOUD_API_KEY"))
    }

    /// Transcription key, falling back to `ASSEMBLYAI_API_KEY`.
    pub fn asr(&self) -> Option<String> {
        non_empty(self.asr_api_key.as_deref()).or_else(|| env_key("ASSEMBLYAI_API_KEY"))
    }

    /// Key required by the given translator, if it needs one.
    pub fn for_translator(&self, kind: TranslatorKind) -> Option<String> {
        match kind {
            TranslatorKind::Google => None,
            TranslatorKind::Gemini => self.gemini(),
            TranslatorKind::SiliconCloud => self.silicon_cloud(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Write the settings only if they differ from what is on disk.
    ///
    /// Returns `true` when the file was written.
    pub fn save_if_changed(&self, path: &Path) -> crate::error::Result<bool> {
        if path.exists() {
            match Self::load_from(Some(path)) {
                Ok(current) if current == *self => return Ok(false),
                Ok(_) => {}
                Err(e) => tracing::warn!("Existing config unreadable, overwriting: {}", e),
            }
        }
        self.save_to(path)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(true)
    }

    fn to_toml(&self) -> crate::error::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::PodsubError::Config(e.to_string()))
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podsub")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Set a value by dotted key, e.g. `translation.provider`.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        use crate::error::PodsubError;

        let parse_err = |e: &dyn std::fmt::Display| {
            PodsubError::InvalidInput(format!("Invalid value for {}: {}", key, e))
        };
        let optional = |v: &str| non_empty(Some(v));

        match key {
            "general.data_dir" => self.general.data_dir = value.to_string(),
            "playback.poll_interval_ms" => {
                self.playback.poll_interval_ms = value.parse().map_err(|e| parse_err(&e))?
            }
            "playback.update_interval_ms" => {
                self.playback.update_interval_ms = value.parse().map_err(|e| parse_err(&e))?
            }
            "playback.seek_threshold_ms" => {
                self.playback.seek_threshold_ms = value.parse().map_err(|e| parse_err(&e))?
            }
            "playback.reveal_interval_ms" => {
                self.playback.reveal_interval_ms = value.parse().map_err(|e| parse_err(&e))?
            }
            "translation.provider" => {
                self.translation.provider = value.parse().map_err(|e: String| parse_err(&e))?
            }
            "translation.max_concurrent" => {
                self.translation.max_concurrent = value.parse().map_err(|e| parse_err(&e))?
            }
            "translation.min_request_interval_ms" => {
                self.translation.min_request_interval_ms =
                    value.parse().map_err(|e| parse_err(&e))?
            }
            "translation.target_language" => self.translation.target_language = value.to_string(),
            "translation.gemini_model" => self.translation.gemini_model = value.to_string(),
            "translation.silicon_cloud_model" => {
                self.translation.silicon_cloud_model = value.to_string()
            }
            "translation.silicon_cloud_base_url" => {
                self.translation.silicon_cloud_base_url = value.to_string()
            }
            "translation.request_timeout_secs" => {
                self.translation.request_timeout_secs = value.parse().map_err(|e| parse_err(&e))?
            }
            "translation.google_retries" => {
                self.translation.google_retries = value.parse().map_err(|e| parse_err(&e))?
            }
            "credentials.gemini_api_key" => self.credentials.gemini_api_key = optional(value),
            "credentials.silicon_cloud_api_key" => {
                self.credentials.silicon_cloud_api_key = optional(value)
            }
            "credentials.asr_api_key" => self.credentials.asr_api_key = optional(value),
            _ => {
                return Err(PodsubError::InvalidInput(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.playback.seek_threshold_ms, 1000);
        assert_eq!(settings.translation.max_concurrent, 5);
        assert_eq!(settings.translation.provider, TranslatorKind::Google);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            "[translation]\nprovider = \"silicon_cloud\"\n[credentials]\nasr_api_key = \"abc\"\n",
        )
        .unwrap();
        assert_eq!(settings.translation.provider, TranslatorKind::SiliconCloud);
        assert_eq!(settings.translation.max_concurrent, 5);
        assert_eq!(settings.credentials.asr_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.playback.poll_interval_ms, 100);
    }

    #[test]
    fn test_save_if_changed_skips_identical_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        assert!(settings.save_if_changed(&path).unwrap());
        assert!(!settings.save_if_changed(&path).unwrap());

        settings.credentials.gemini_api_key = Some("key".to_string());
        assert!(settings.save_if_changed(&path).unwrap());

        let reloaded = Settings::load_from(Some(path.as_path())).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        settings.set_value("translation.provider", "gemini").unwrap();
        settings.set_value("credentials.gemini_api_key", "  ").unwrap();
        settings.set_value("playback.seek_threshold_ms", "1500").unwrap();

        assert_eq!(settings.translation.provider, TranslatorKind::Gemini);
        assert_eq!(settings.credentials.gemini_api_key, None);
        assert_eq!(settings.playback.seek_threshold_ms, 1500);
        assert!(settings.set_value("nope.key", "1").is_err());
        assert!(settings.set_value("translation.max_concurrent", "many").is_err());
    }

    #[test]
    fn test_google_needs_no_credential() {
        let credentials = Credentials {
            gemini_api_key: Some("g".to_string()),
            ..Default::default()
        };
        assert_eq!(credentials.for_translator(TranslatorKind::Google), None);
        assert_eq!(
            credentials.for_translator(TranslatorKind::Gemini).as_deref(),
            Some("g")
        );
    }
}
