//! Data models for transcribed subtitles and their translations.
//!
//! Field names follow the on-disk cache format so records written by
//! earlier versions of the player load unchanged.

use crate::translation::TranslatorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single spoken word with millisecond timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// The word text.
    pub text: String,
    /// Start time in milliseconds.
    pub start: i64,
    /// End time in milliseconds.
    pub end: i64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// One speaker turn: the unit a subtitle block is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Speaker label assigned by diarization ("A", "B", ...).
    pub speaker: String,
    /// Start time in milliseconds.
    pub start_time: i64,
    /// End time in milliseconds.
    pub end_time: i64,
    /// Full utterance text.
    pub text: String,
    /// Words in spoken order.
    pub words: Vec<Word>,
}

impl Utterance {
    /// Create an utterance, deriving its text from the words.
    pub fn from_words(speaker: impl Into<String>, start_time: i64, end_time: i64, words: Vec<Word>) -> Self {
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            speaker: speaker.into(),
            start_time,
            end_time,
            text,
            words,
        }
    }

    /// Duration of this utterance in milliseconds.
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Whether there is anything worth translating.
    pub fn is_translatable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A translated utterance and the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Translated text.
    pub text: String,
    /// Backend identity, kept so a cache reload knows who translated it.
    pub translator: TranslatorKind,
}

impl Translation {
    pub fn new(text: impl Into<String>, translator: TranslatorKind) -> Self {
        Self {
            text: text.into(),
            translator,
        }
    }
}

/// Translations keyed by utterance index, at most one per index.
///
/// Integer keys serialize as JSON strings ("0", "1", ...) and iterate in
/// numeric order.
pub type TranslationMap = BTreeMap<usize, Translation>;

/// Format milliseconds as MM:SS or HH:MM:SS.
pub fn format_time(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
