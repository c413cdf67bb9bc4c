//! Error types for Podsub.

use thiserror::Error;

/// Media playback failure reported by the playback collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    /// The media resource could not be accessed.
    Resource,
    /// The media format is not supported.
    Format,
    /// A network error interrupted playback.
    Network,
    /// Access to the media was denied.
    AccessDenied,
    /// A required playback service is not available.
    ServiceMissing,
    /// Anything the playback backend could not classify.
    Unknown,
}

impl MediaErrorKind {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            MediaErrorKind::Resource => "The media resource cannot be accessed",
            MediaErrorKind::Format => "Unsupported media format",
            MediaErrorKind::Network => "Network error",
            MediaErrorKind::AccessDenied => "Access denied",
            MediaErrorKind::ServiceMissing => "A required playback service was not found",
            MediaErrorKind::Unknown => "Unknown playback error",
        }
    }
}

impl std::fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Which part of the error taxonomy an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or corrupt cache files, unreadable audio, bad config.
    Io,
    /// The speech-to-text backend failed.
    Transcription,
    /// A single translation request failed.
    Translation,
    /// The playback collaborator reported an error.
    Media,
    /// Index or offset bookkeeping problems. Never shown to the user.
    Sync,
}

/// Library-level error type for Podsub operations.
#[derive(Error, Debug)]
pub enum PodsubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Playback error: {0}")]
    Playback(MediaErrorKind),

    #[error("Subtitle sync error: {0}")]
    Sync(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PodsubError {
    /// Classify this error for the session's reporting policy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PodsubError::Transcription(_) => ErrorCategory::Transcription,
            PodsubError::Translation(_) | PodsubError::Http(_) => ErrorCategory::Translation,
            PodsubError::Playback(_) => ErrorCategory::Media,
            PodsubError::Sync(_) => ErrorCategory::Sync,
            PodsubError::Config(_)
            | PodsubError::Cache(_)
            | PodsubError::FileNotFound(_)
            | PodsubError::InvalidInput(_)
            | PodsubError::Io(_)
            | PodsubError::Json(_)
            | PodsubError::TomlParse(_) => ErrorCategory::Io,
        }
    }
}

/// Result type alias for Podsub operations.
pub type Result<T> = std::result::Result<T, PodsubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            PodsubError::Cache("corrupt".into()).category(),
            ErrorCategory::Io
        );
        assert_eq!(
            PodsubError::Playback(MediaErrorKind::Format).category(),
            ErrorCategory::Media
        );
        assert_eq!(
            PodsubError::Translation("timeout".into()).category(),
            ErrorCategory::Translation
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(PodsubError::from(io).category(), ErrorCategory::Io);
    }

    #[test]
    fn test_media_error_message() {
        let err = PodsubError::Playback(MediaErrorKind::AccessDenied);
        assert_eq!(err.to_string(), "Playback error: Access denied");
    }
}
