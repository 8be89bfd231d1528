use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CheckError, Result};
use crate::models::{DiarizedTranscript, FileMetadata, Utterance};

/// Configuration for the transcription provider
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// API key (from ASSEMBLYAI_API_KEY env var)
    pub api_key: String,
    /// Base URL, overridable for tests
    pub base_url: String,
    /// Expected number of speakers in the call
    pub speakers_expected: u32,
    /// Language code passed to the provider
    pub language: String,
    /// Interval between poll requests
    pub poll_interval: Duration,
    /// Overall deadline for one transcription job
    pub poll_timeout: Duration,
}

impl TranscriptionConfig {
    /// Create config from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        let api_key = std::env::var("ASSEMBLYAI_API_KEY")
            .context("ASSEMBLYAI_API_KEY environment variable not set")?;

        Ok(Self {
            api_key,
            base_url: "https://api.assemblyai.com/v2".to_string(),
            speakers_expected: 2,
            language: "ja".to_string(),
            poll_interval: Duration::from_secs(3),
            poll_timeout: Duration::from_secs(1800),
        })
    }
}

/// Handle for a submitted transcription job
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: String,
}

/// Provider-side state of a transcription job
#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed(Vec<Utterance>),
    Failed(String),
}

/// Transcription client with speaker diarization
pub struct TranscriptionClient {
    client: Client,
    config: TranscriptionConfig,
}

impl TranscriptionClient {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Upload raw audio bytes, returning the provider-side URL
    pub async fn upload(&self, audio: Vec<u8>) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/upload", self.config.base_url))
            .header("authorization", &self.config.api_key)
            .body(audio)
            .send()
            .await
            .map_err(|e| CheckError::api(format!("audio upload failed: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::api(
                format!("upload error: {} - {}", status, body),
                status.is_server_error(),
            ));
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|e| CheckError::api(format!("malformed upload response: {}", e), false))?;
        Ok(payload.upload_url)
    }

    /// Submit a diarized transcription job for an uploaded audio URL
    pub async fn submit(&self, audio_url: &str) -> Result<JobHandle> {
        let request = SubmitRequest {
            audio_url: audio_url.to_string(),
            speaker_labels: true,
            speakers_expected: self.config.speakers_expected,
            language_code: self.config.language.clone(),
        };

        let response = self
            .client
            .post(format!("{}/transcript", self.config.base_url))
            .header("authorization", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CheckError::api(format!("job submit failed: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::api(
                format!("submit error: {} - {}", status, body),
                status.is_server_error(),
            ));
        }

        let payload: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| CheckError::api(format!("malformed submit response: {}", e), false))?;
        Ok(JobHandle { id: payload.id })
    }

    /// Fetch the current status of a job
    pub async fn poll(&self, job: &JobHandle) -> Result<JobStatus> {
        let response = self
            .client
            .get(format!("{}/transcript/{}", self.config.base_url, job.id))
            .header("authorization", &self.config.api_key)
            .send()
            .await
            .map_err(|e| CheckError::api(format!("poll failed: {}", e), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::api(
                format!("poll error: {} - {}", status, body),
                status.is_server_error(),
            ));
        }

        let payload: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| CheckError::api(format!("malformed poll response: {}", e), false))?;
        Ok(payload.into_status())
    }

    /// Run one file end to end: upload, submit, poll until done.
    ///
    /// Returns `None` on provider error or timeout so the caller can skip the
    /// file and move on to the next one; only unexpected submit-path failures
    /// abort with an error.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        mut on_progress: impl FnMut(&str),
    ) -> Result<Option<DiarizedTranscript>> {
        let metadata = FileMetadata::from_size(audio.len() as u64);

        on_progress("uploading audio");
        let audio_url = self.upload(audio).await?;

        on_progress("submitting transcription job");
        let job = self.submit(&audio_url).await?;
        on_progress(&format!("job {} submitted, polling", job.id));

        let deadline = Instant::now() + self.config.poll_timeout;
        loop {
            if Instant::now() >= deadline {
                warn!("transcription job {} timed out", job.id);
                return Ok(None);
            }
            tokio::time::sleep(self.config.poll_interval).await;

            match self.poll(&job).await? {
                JobStatus::Queued => on_progress("waiting in queue"),
                JobStatus::Processing => on_progress("transcribing"),
                JobStatus::Completed(utterances) => {
                    on_progress("transcription complete");
                    return Ok(Some(DiarizedTranscript::new(utterances, metadata)));
                }
                JobStatus::Failed(message) => {
                    warn!("transcription job {} failed: {}", job.id, message);
                    return Ok(None);
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct SubmitRequest {
    audio_url: String,
    speaker_labels: bool,
    speakers_expected: u32,
    language_code: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    utterances: Option<Vec<WireUtterance>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUtterance {
    speaker: String,
    text: String,
}

impl TranscriptResponse {
    fn into_status(self) -> JobStatus {
        match self.status.as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed(
                self.utterances
                    .unwrap_or_default()
                    .into_iter()
                    .map(|u| Utterance::new(u.speaker, u.text))
                    .collect(),
            ),
            "error" => JobStatus::Failed(self.error.unwrap_or_else(|| "unknown error".to_string())),
            other => JobStatus::Failed(format!("unexpected status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TranscriptResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_completed_response_maps_utterances() {
        let response = parse(
            r#"{
                "id": "j1",
                "status": "completed",
                "utterances": [
                    {"speaker": "A", "text": "お世話になっております"},
                    {"speaker": "B", "text": "はい"}
                ]
            }"#,
        );
        match response.into_status() {
            JobStatus::Completed(utterances) => {
                assert_eq!(utterances.len(), 2);
                assert_eq!(utterances[0].speaker_tag, "A");
            }
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[test]
    fn test_error_response_carries_message() {
        let response = parse(r#"{"id": "j1", "status": "error", "error": "bad audio"}"#);
        match response.into_status() {
            JobStatus::Failed(message) => assert_eq!(message, "bad audio"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_in_flight_statuses() {
        assert!(matches!(
            parse(r#"{"id": "j1", "status": "queued"}"#).into_status(),
            JobStatus::Queued
        ));
        assert!(matches!(
            parse(r#"{"id": "j1", "status": "processing"}"#).into_status(),
            JobStatus::Processing
        ));
    }

    #[test]
    fn test_unknown_status_is_failure() {
        assert!(matches!(
            parse(r#"{"id": "j1", "status": "weird"}"#).into_status(),
            JobStatus::Failed(_)
        ));
    }
}
