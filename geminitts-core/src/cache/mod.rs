//! Content-addressed cache of generated audio.
//!
//! Entries live in a single directory shared by every invocation (the
//! platform temp directory unless configured otherwise) and are named after
//! the SHA-256 digest of the request that produced them. The cache is an
//! optimisation only: every failure here degrades to a cache miss or a
//! skipped save, and is never reported to the caller.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::tts::types::TtsRequest;

pub const CACHE_NAMESPACE: &str = "GeminiTtsCli_";
const CACHE_EXTENSION: &str = "wav";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &TtsRequest) -> Self {
        let combined = format!(
            "{}|{}|{}",
            request.instructions(),
            request.voice(),
            request.text()
        );
        let digest = Sha256::digest(combined.as_bytes());
        Self(format!("{CACHE_NAMESPACE}{digest:X}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    directory: PathBuf,
    enabled: bool,
}

impl CacheStore {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            enabled: true,
        }
    }

    /// Cache rooted in the platform temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// A store that never hits and never saves.
    pub fn disabled() -> Self {
        Self {
            directory: std::env::temp_dir(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn key(&self, request: &TtsRequest) -> CacheKey {
        CacheKey::for_request(request)
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.directory
            .join(format!("{}.{CACHE_EXTENSION}", key.as_str()))
    }

    /// Returns the entry path when a file exists for `key`. The file's
    /// contents are not validated.
    pub async fn try_get(&self, key: &CacheKey) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(?path, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Reads a cached entry. Any failure is logged and reported as a miss.
    pub async fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.try_get(key).await?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(?path, bytes = bytes.len(), "Cache hit");
                Some(bytes)
            }
            Err(e) => {
                warn!(?path, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores `bytes` under `key`. The entry is written to a unique
    /// temporary file in the cache directory and renamed into place so that
    /// concurrent readers never see a truncated entry.
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) {
        if !self.enabled {
            return;
        }

        if let Err(e) = self.write_entry(key, bytes).await {
            warn!(key = %key, error = %e, "Failed to save audio to cache");
        }
    }

    async fn write_entry(&self, key: &CacheKey, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let final_path = self.entry_path(key);
        let temp_path = self
            .directory
            .join(format!("{}.{}.tmp", key.as_str(), Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(path = ?final_path, bytes = bytes.len(), "Saved audio to cache");
        Ok(())
    }
}
