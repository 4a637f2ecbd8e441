use async_trait::async_trait;
use miette::{Diagnostic, IntoDiagnostic};
use serde::Deserialize;
use thiserror::Error;

use crate::audio::AudioClip;

const DEFAULT_STT_URL: &str = "http://localhost:8085/transcribe";

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum RecognizeError {
    #[error("Speech recognition service is unavailable. Check internet connection.")]
    ServiceUnavailable,
    #[error("Could not understand audio.")]
    Unintelligible,
}

/// Speech-to-text seam. Implementations turn a captured clip into text.
#[async_trait]
pub trait Recognizer {
    async fn recognize(&self, clip: &AudioClip) -> Result<String, RecognizeError>;
}

#[derive(Deserialize, Debug)]
struct TranscriptResponse {
    text: String,
}

/// Client for an HTTP speech-to-text service accepting WAV uploads.
pub struct HttpRecognizer {
    http: reqwest::Client,
    url: String,
}

impl HttpRecognizer {
    pub fn from_env() -> miette::Result<Self> {
        let url =
            std::env::var("RAINDUX_STT_URL").unwrap_or_else(|_| DEFAULT_STT_URL.to_string());
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .into_diagnostic()?;

        Ok(Self { http, url })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, clip: &AudioClip) -> Result<String, RecognizeError> {
        let wav = clip.to_wav_bytes().map_err(|err| {
            tracing::error!("could not encode wav payload: {err}");
            RecognizeError::Unintelligible
        })?;

        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav)
            .send()
            .await
            .map_err(|err| {
                tracing::error!("speech service request failed: {err}");
                RecognizeError::ServiceUnavailable
            })?;

        let status = response.status();
        if status.is_client_error() {
            // The service saw the audio but could not transcribe it.
            return Err(RecognizeError::Unintelligible);
        }
        if !status.is_success() {
            return Err(RecognizeError::ServiceUnavailable);
        }

        let transcript: TranscriptResponse = response
            .json()
            .await
            .map_err(|_| RecognizeError::Unintelligible)?;

        if transcript.text.trim().is_empty() {
            return Err(RecognizeError::Unintelligible);
        }

        Ok(transcript.text)
    }
}
