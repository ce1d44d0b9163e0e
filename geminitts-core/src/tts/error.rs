use thiserror::Error;

use crate::voice::VoiceError;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Network error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Received invalid response from the service: {0}")]
    MalformedResponse(String),

    #[error("The service declined to generate audio (finish reason: {reason})")]
    Declined { reason: String },

    #[error("Received empty audio data from the service")]
    EmptyAudio,

    #[error("Received undecodable audio data: {0}")]
    InvalidAudio(String),

    #[error("Invalid voice: {0}")]
    Voice(#[from] VoiceError),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("Failed to generate audio after {attempts} attempts: {last_error}")]
    GenerationFailed { attempts: u32, last_error: String },
}

impl TtsError {
    /// Every failure of a single attempt is retried. Only the exhausted
    /// outcome and local problems with the request itself are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::GenerationFailed { .. } | Self::Voice(_) | Self::Encode(_)
        )
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(source: serde_json::Error) -> Self {
        Self::MalformedResponse(source.to_string())
    }
}

impl From<reqwest::Error> for TtsError {
    fn from(source: reqwest::Error) -> Self {
        Self::Transport(anyhow::Error::new(source))
    }
}
