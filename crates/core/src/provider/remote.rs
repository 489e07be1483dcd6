//! Cloud transcription via a submit/poll/fetch job API.
//!
//! Both cloud services share the same lifecycle: POST the media to
//! create a job, poll its status until it completes or fails, then fetch
//! the transcript document from the URI the job reports.

use crate::audio;
use crate::manifest::FileMetadata;
use crate::provider::{poll_until, PollConfig, ProviderError, TranscriptionProvider};
use crate::transcript::{ProviderKind, ProviderTranscript};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub struct RemoteJobProvider {
    kind: ProviderKind,
    client: Client,
    endpoint: String,
    poll: PollConfig,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    media_uri: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    transcript_uri: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl RemoteJobProvider {
    pub fn new(kind: ProviderKind, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        Self {
            kind,
            client: Client::new(),
            endpoint,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    async fn submit(&self, file: &FileMetadata, wav: &Path) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/jobs", self.endpoint))
            .json(&SubmitRequest {
                media_uri: &wav.display().to_string(),
                language: &file.media_language,
            })
            .send()
            .await?;
        let response = successful(response).await?;
        let submitted: SubmitResponse = response.json().await?;
        info!(job_id = %submitted.job_id, druid = %file.druid, "transcription job submitted");
        Ok(submitted.job_id)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<String, ProviderError> {
        let url = format!("{}/jobs/{}", self.endpoint, job_id);
        poll_until(&self.poll, || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let response = successful(client.get(&url).send().await?).await?;
                let job: JobStatusResponse = response.json().await?;
                match job.status.as_str() {
                    "COMPLETED" => {
                        let uri = job.transcript_uri.ok_or_else(|| {
                            ProviderError::JobFailed(
                                "job completed without a transcript_uri".to_owned(),
                            )
                        })?;
                        Ok(Some(uri))
                    }
                    "FAILED" => Err(ProviderError::JobFailed(
                        job.failure_reason.unwrap_or_else(|| "unknown".to_owned()),
                    )),
                    _ => Ok(None),
                }
            }
        })
        .await
    }

    async fn run_job(
        &self,
        file: &FileMetadata,
        wav: &Path,
    ) -> Result<ProviderTranscript, ProviderError> {
        let job_id = self.submit(file, wav).await?;
        let transcript_uri = self.wait_for_job(&job_id).await?;
        self.fetch_transcript(&transcript_uri).await
    }

    async fn fetch_transcript(&self, uri: &str) -> Result<ProviderTranscript, ProviderError> {
        let response = successful(self.client.get(uri).send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidPayload(format!("transcript document: {e}")))
    }
}

async fn successful(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

/// Server errors and throttling may clear on a later attempt; everything
/// else is terminal for the job.
fn classify_status(status: u16, body: &str) -> ProviderError {
    if status == 408 || status == 429 || status >= 500 {
        ProviderError::Transient(format!("HTTP {status}: {body}"))
    } else {
        ProviderError::JobFailed(format!("HTTP {status}: {body}"))
    }
}

impl TranscriptionProvider for RemoteJobProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn combinations(&self) -> Vec<Option<String>> {
        vec![None]
    }

    /// The Google-style service transcribes in the language it is told
    /// the media is in, so rows whose reference transcript is in another
    /// language would produce a meaningless comparison.
    fn supports(&self, file: &FileMetadata) -> bool {
        match self.kind {
            ProviderKind::Google => file.media_language == file.transcript_language,
            _ => true,
        }
    }

    fn transcribe<'a>(
        &'a self,
        file: &'a FileMetadata,
        _combination: usize,
    ) -> BoxFuture<'a, Result<ProviderTranscript, ProviderError>> {
        async move {
            // The job API takes single-channel wav input.
            let wav = std::env::temp_dir().join(format!("asr-pilot-{}.wav", file.druid));
            audio::convert_to_wav(Path::new(&file.media_filename), &wav).await?;
            let result = self.run_job(file, &wav).await;
            let _ = std::fs::remove_file(&wav);
            result
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(media_language: &str, transcript_language: &str) -> FileMetadata {
        FileMetadata {
            druid: "bb158br2509".to_owned(),
            media_filename: "media/bb158br2509_sl.m4a".to_owned(),
            media_language: media_language.to_owned(),
            transcript_filename: "transcripts/bb158br2509.txt".to_owned(),
            transcript_language: transcript_language.to_owned(),
            run_count: 0,
        }
    }

    #[test]
    fn google_skips_language_mismatches() {
        let provider = RemoteJobProvider::new(ProviderKind::Google, "https://speech.test");
        assert!(provider.supports(&row("en", "en")));
        assert!(!provider.supports(&row("fr", "en")));
    }

    #[test]
    fn aws_takes_every_row() {
        let provider = RemoteJobProvider::new(ProviderKind::Aws, "https://transcribe.test");
        assert!(provider.supports(&row("fr", "en")));
    }

    #[test]
    fn remote_provider_runs_once_per_file() {
        let provider = RemoteJobProvider::new(ProviderKind::Aws, "https://transcribe.test");
        assert_eq!(provider.combinations(), vec![None]);
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(matches!(
            classify_status(503, "unavailable"),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_status(429, "slow down"),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_status(400, "bad media"),
            ProviderError::JobFailed(_)
        ));
    }

    #[test]
    fn endpoint_trailing_slash_is_normalized() {
        let provider = RemoteJobProvider::new(ProviderKind::Google, "https://speech.test/");
        assert_eq!(provider.endpoint, "https://speech.test");
    }
}
