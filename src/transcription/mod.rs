//! Speech-to-text transcription.
//!
//! A transcriber turns an audio file into speaker-labeled utterances with
//! word-level millisecond timings. The default backend is AssemblyAI with
//! speaker diarization enabled.

mod assemblyai;

pub use assemblyai::AssemblyAiTranscriber;

use crate::error::Result;
use crate::transcript::Utterance;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into time-ordered utterances.
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Utterance>>;
}
