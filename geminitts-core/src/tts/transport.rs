use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::TtsError;
use super::types::GenerateContentRequest;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-preview-tts";
pub const API_METHOD: &str = "streamGenerateContent";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends one generation request and returns the raw response body. A new
/// HTTP request is built on every call.
#[async_trait]
pub trait SpeechTransport: Send + Sync {
    async fn send(&self, body: &GenerateContentRequest) -> Result<String, TtsError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct GeminiTransport {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTransport {
    pub fn new(config: GeminiConfig) -> Result<Self, TtsError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_id,
            API_METHOD
        )
    }
}

#[async_trait]
impl SpeechTransport for GeminiTransport {
    async fn send(&self, body: &GenerateContentRequest) -> Result<String, TtsError> {
        let url = self.endpoint();
        debug!(%url, model = %self.config.model_id, "Sending Gemini TTS request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}
