use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::error::ConfigError;
use crate::tts::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::tts::transport::{DEFAULT_API_BASE_URL, DEFAULT_MODEL_ID, DEFAULT_REQUEST_TIMEOUT};
use crate::tts::{GeminiConfig, RetryPolicy};

/// Environment variable holding the Gemini API key. The key is never read
/// from the settings file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_INSTRUCTIONS: &str = "Read aloud in a warm, professional and friendly tone";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheSettings {
    /// Where cached WAV files live. Defaults to the platform temp directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Used when `--instructions` is not given.
    #[serde(default = "default_instructions")]
    pub default_instructions: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            model_id: default_model_id(),
            default_instructions: default_instructions(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Settings {
    /// Rejects values that parse but cannot drive a request.
    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidSettings {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url must not be empty"));
        }
        if self.model_id.trim().is_empty() {
            return Err(invalid("model_id must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn gemini_config(&self, api_key: String) -> GeminiConfig {
        GeminiConfig {
            api_key,
            base_url: self.api_base_url.clone(),
            model_id: self.model_id.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    pub fn cache_store(&self, enabled: bool) -> CacheStore {
        if !enabled {
            return CacheStore::disabled();
        }
        match &self.cache.directory {
            Some(dir) => CacheStore::new(dir.clone()),
            None => CacheStore::in_temp_dir(),
        }
    }
}

/// Reads the API key through `lookup` (normally [`std::env::var`]). Blank
/// values count as missing.
pub fn api_key_from<F>(lookup: F) -> Result<String, ConfigError>
where
    F: FnOnce(&str) -> Option<String>,
{
    lookup(API_KEY_ENV)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))
}

pub fn api_key_from_env() -> Result<String, ConfigError> {
    api_key_from(|name| std::env::var(name).ok())
}
