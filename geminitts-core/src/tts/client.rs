use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info};

use super::error::TtsError;
use super::retry::RetryPolicy;
use super::transport::SpeechTransport;
use super::types::{
    GenerateContentChunk, GenerateContentRequest, LineContext, TtsRequest, FINISH_REASON_STOP,
};
use crate::audio::{wrap_pcm, PcmFormat, GEMINI_PCM_FORMAT};
use crate::cache::CacheStore;
use crate::events::{EventSender, TtsEvent};
use crate::voice::capitalize_voice;

/// Raw PCM returned by the API, in [`GEMINI_PCM_FORMAT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    pub pcm: Vec<u8>,
    pub format: PcmFormat,
}

/// WAV-encoded audio for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub wav: Vec<u8>,
    pub from_cache: bool,
}

/// Turns a [`TtsRequest`] into audio. Cheap to share behind an `Arc`.
pub struct TtsClient {
    transport: Arc<dyn SpeechTransport>,
    cache: CacheStore,
    retry: RetryPolicy,
    events: EventSender,
}

impl TtsClient {
    pub fn new(transport: Arc<dyn SpeechTransport>, cache: CacheStore) -> Self {
        Self {
            transport,
            cache,
            retry: RetryPolicy::default(),
            events: EventSender::silent(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Returns WAV audio for `request`, from the cache when possible. On a
    /// miss the audio is generated, wrapped and saved to the cache.
    pub async fn synthesize(
        &self,
        request: &TtsRequest,
        line: Option<&LineContext>,
    ) -> Result<Synthesis, TtsError> {
        let line_number = line.map(|l| l.line);
        let key = self.cache.key(request);

        if self.cache.try_get(&key).await.is_some() {
            match self.cache.read(&key).await {
                Some(wav) => {
                    self.events.send(TtsEvent::CacheHit { line: line_number });
                    return Ok(Synthesis {
                        wav,
                        from_cache: true,
                    });
                }
                None => self.events.send(TtsEvent::CacheReadFailed { line: line_number }),
            }
        }

        let audio = self.generate(request, line).await?;
        let wav = wrap_pcm(&audio.pcm, audio.format).map_err(|e| TtsError::Encode(e.to_string()))?;

        self.cache.put(&key, &wav).await;

        Ok(Synthesis {
            wav,
            from_cache: false,
        })
    }

    /// Calls the API under the retry policy and returns the decoded PCM.
    pub async fn generate(
        &self,
        request: &TtsRequest,
        line: Option<&LineContext>,
    ) -> Result<AudioBuffer, TtsError> {
        let voice_name = capitalize_voice(request.voice())?;
        let prompt = request.prompt();

        debug!(voice = %voice_name, chars = request.text().len(), "Generating speech");

        let result = self
            .retry
            .run(
                |attempt| {
                    // Fresh body for every attempt.
                    let body = GenerateContentRequest::speech(prompt.clone(), voice_name.clone());
                    async move {
                        debug!(attempt, "Sending generation attempt");
                        let response = self.transport.send(&body).await?;
                        extract_pcm(&response)
                    }
                },
                TtsError::is_retryable,
                |failed, error| {
                    self.events.send(TtsEvent::RetryAttempt {
                        line: line.map(|l| l.line),
                        preview: line.map(|l| l.preview.clone()),
                        attempt: failed.attempt,
                        max_attempts: failed.max_attempts,
                        error: error.to_string(),
                        delay: failed.next_delay,
                    });
                },
            )
            .await;

        match result {
            Ok(pcm) => {
                info!(bytes = pcm.len(), "Generated speech audio");
                Ok(AudioBuffer {
                    pcm,
                    format: GEMINI_PCM_FORMAT,
                })
            }
            Err(exhausted) if exhausted.last_error.is_retryable() => {
                Err(TtsError::GenerationFailed {
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error.to_string(),
                })
            }
            Err(exhausted) => Err(exhausted.last_error),
        }
    }
}

/// Pulls the base64 PCM payload out of a response body and decodes it.
pub fn extract_pcm(body: &str) -> Result<Vec<u8>, TtsError> {
    let chunks: Vec<GenerateContentChunk> = serde_json::from_str(body)?;

    let candidate = chunks
        .first()
        .and_then(|chunk| chunk.candidates.first())
        .ok_or_else(|| TtsError::MalformedResponse("response has no candidates".to_string()))?;

    let reason = candidate
        .finish_reason
        .as_deref()
        .ok_or_else(|| TtsError::MalformedResponse("candidate has no finishReason".to_string()))?;
    if reason != FINISH_REASON_STOP {
        return Err(TtsError::Declined {
            reason: reason.to_string(),
        });
    }

    let data = candidate
        .content
        .as_ref()
        .and_then(|content| content.parts.first())
        .and_then(|part| part.inline_data.as_ref())
        .and_then(|inline| inline.data.as_deref())
        .ok_or_else(|| {
            TtsError::MalformedResponse("candidate has no inline audio data".to_string())
        })?;

    if data.trim().is_empty() {
        return Err(TtsError::EmptyAudio);
    }

    let pcm = BASE64
        .decode(data.trim())
        .map_err(|e| TtsError::InvalidAudio(e.to_string()))?;
    if pcm.is_empty() {
        return Err(TtsError::EmptyAudio);
    }

    Ok(pcm)
}
