use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChatRequest {
    // An absent field reads as empty, matching the empty-message rejection.
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ErrorResponse {
    pub status: String,
    pub response: String,
}

impl ErrorResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            response: response.into(),
        }
    }
}

/// Outcome of one voice-capture attempt. Exactly one arm carries meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionResult {
    Recognized { text: String },
    Failed { error: String },
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid data format.")]
    InvalidFormat,
    #[error("Message cannot be empty.")]
    EmptyMessage,
    #[error("{0}")]
    Transcription(String),
}

/// Extracts the user message from a raw request body.
pub fn normalize(raw: &[u8]) -> Result<String, ValidationError> {
    let payload: ChatRequest =
        serde_json::from_slice(raw).map_err(|_| ValidationError::InvalidFormat)?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }

    Ok(message.to_owned())
}

/// Extracts the user message from a voice transcription outcome.
pub fn normalize_transcription(
    result: &TranscriptionResult,
) -> Result<String, ValidationError> {
    match result {
        TranscriptionResult::Recognized { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ValidationError::EmptyMessage);
            }
            Ok(text.to_owned())
        }
        TranscriptionResult::Failed { error } => {
            Err(ValidationError::Transcription(error.clone()))
        }
    }
}
