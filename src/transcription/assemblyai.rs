//! AssemblyAI transcription with speaker labels.

use super::Transcriber;
use crate::error::{PodsubError, Result};
use crate::transcript::{Utterance, Word};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const API_BASE: &str = "https://api.assemblyai.com/v2";

/// Default delay between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// AssemblyAI-based transcriber.
pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    utterances: Option<Vec<ApiUtterance>>,
}

#[derive(Debug, Deserialize)]
struct ApiUtterance {
    speaker: String,
    start: i64,
    end: i64,
    text: String,
    #[serde(default)]
    words: Vec<ApiWord>,
}

#[derive(Debug, Deserialize)]
struct ApiWord {
    text: String,
    start: i64,
    end: i64,
}

impl From<ApiUtterance> for Utterance {
    fn from(u: ApiUtterance) -> Self {
        Utterance {
            speaker: u.speaker,
            start_time: u.start,
            end_time: u.end,
            text: u.text,
            words: u
                .words
                .into_iter()
                .map(|w| Word::new(w.text, w.start, w.end))
                .collect(),
        }
    }
}

impl AssemblyAiTranscriber {
    /// Create a transcriber with the given API key.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_config(api_key, API_BASE, POLL_INTERVAL)
    }

    /// Create a transcriber against a custom endpoint and poll cadence.
    pub fn with_config(api_key: &str, api_base: &str, poll_interval: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PodsubError::Config(
                "Transcription API key is not configured".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()?,
            api_key: api_key.trim().to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes", bytes.len());

        let response: UploadResponse = self
            .client
            .post(format!("{}/upload", self.api_base))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .body(bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<TranscriptResponse> {
        Ok(self
            .client
            .post(format!("{}/transcript", self.api_base))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&json!({ "audio_url": audio_url, "speaker_labels": true }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn poll(&self, id: &str) -> Result<TranscriptResponse> {
        Ok(self
            .client
            .get(format!("{}/transcript/{}", self.api_base, id))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

/// Turn a finished transcript into utterances, or the backend's error.
fn into_utterances(response: TranscriptResponse) -> Result<Vec<Utterance>> {
    if response.status == "error" {
        return Err(PodsubError::Transcription(
            response
                .error
                .unwrap_or_else(|| "Transcription failed without a message".to_string()),
        ));
    }

    Ok(response
        .utterances
        .unwrap_or_default()
        .into_iter()
        .map(Utterance::from)
        .collect())
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Utterance>> {
        let upload_url = self.upload(audio_path).await?;
        let mut transcript = self.submit(&upload_url).await?;
        info!("Transcript {} submitted", transcript.id);

        while transcript.status != "completed" && transcript.status != "error" {
            tokio::time::sleep(self.poll_interval).await;
            transcript = self.poll(&transcript.id).await?;
            debug!("Transcript {} status: {}", transcript.id, transcript.status);
        }

        let utterances = into_utterances(transcript)?;
        info!("Transcribed {} utterances", utterances.len());
        Ok(utterances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_response_maps_utterances() {
        let response: TranscriptResponse = serde_json::from_str(
            r#"{
                "id": "t1",
                "status": "completed",
                "utterances": [
                    {"speaker": "A", "start": 0, "end": 2000, "text": "Hi",
                     "confidence": 0.9,
                     "words": [{"text": "Hi", "start": 0, "end": 500, "confidence": 0.9}]},
                    {"speaker": "B", "start": 2000, "end": 4000, "text": "Bye",
                     "words": [{"text": "Bye", "start": 2000, "end": 2500}]}
                ]
            }"#,
        )
        .unwrap();

        let utterances = into_utterances(response).unwrap();
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[1].speaker, "B");
        assert_eq!(utterances[1].words[0], Word::new("Bye", 2000, 2500));
    }

    #[test]
    fn test_error_response() {
        let response: TranscriptResponse = serde_json::from_str(
            r#"{"id": "t2", "status": "error", "error": "File does not appear to contain audio"}"#,
        )
        .unwrap();

        let err = into_utterances(response).unwrap_err();
        assert!(err.to_string().contains("does not appear to contain audio"));
    }

    #[test]
    fn test_missing_utterances_is_empty() {
        let response: TranscriptResponse =
            serde_json::from_str(r#"{"id": "t3", "status": "completed", "utterances": null}"#)
                .unwrap();
        assert!(into_utterances(response).unwrap().is_empty());
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(AssemblyAiTranscriber::new("").is_err());
    }
}
