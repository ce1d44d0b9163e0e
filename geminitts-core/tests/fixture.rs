use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geminitts_core::{
    batch::BatchScheduler,
    cache::CacheStore,
    events::{EventSender, TtsEvent},
    tts::{
        types::GenerateContentRequest, RetryPolicy, SpeechTransport, TtsClient, TtsError,
    },
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// PCM the fake transport returns for `text`: one 16-bit sample per byte of
/// text, so merged output can be checked for ordering.
#[allow(dead_code)]
pub fn samples_for(text: &str) -> Vec<i16> {
    text.bytes().map(i16::from).collect()
}

#[allow(dead_code)]
pub fn pcm_for(text: &str) -> Vec<u8> {
    samples_for(text)
        .into_iter()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

#[allow(dead_code)]
pub fn speech_response(pcm: &[u8]) -> String {
    json!([{
        "candidates": [{
            "finishReason": "STOP",
            "content": {"parts": [{"inlineData": {
                "mimeType": "audio/L16;codec=pcm;rate=24000",
                "data": BASE64.encode(pcm),
            }}]}
        }]
    }])
    .to_string()
}

#[allow(dead_code)]
pub fn declined_response(reason: &str) -> String {
    json!([{"candidates": [{"finishReason": reason}]}]).to_string()
}

#[allow(dead_code)]
pub fn wav_samples(bytes: &[u8]) -> Vec<i16> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    reader.into_samples::<i16>().map(Result::unwrap).collect()
}

/// Stand-in for the Gemini API. Answers with [`pcm_for`] the line text,
/// optionally after a per-text delay, and declines texts marked as failing.
#[derive(Default)]
pub struct FakeTransport {
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    /// Every attempt for `text` is declined.
    pub fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// The first `failures` attempts for `text` are declined.
    pub fn flaky(self, text: &str, failures: u32) -> Self {
        self.flaky
            .lock()
            .unwrap()
            .insert(text.to_string(), failures);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechTransport for FakeTransport {
    async fn send(&self, body: &GenerateContentRequest) -> Result<String, TtsError> {
        let prompt = body.contents[0].parts[0].text.clone();
        let text = prompt
            .split_once(": ")
            .map(|(_, text)| text.to_string())
            .unwrap_or_else(|| prompt.clone());
        self.prompts.lock().unwrap().push(prompt);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delays.get(&text) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing.contains(&text) {
            return Ok(declined_response("OTHER"));
        }

        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&text) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(declined_response("SAFETY"));
                }
            }
        }

        Ok(speech_response(&pcm_for(&text)))
    }
}

#[allow(dead_code)]
pub struct Fixture {
    pub transport: Arc<FakeTransport>,
    pub client: Arc<TtsClient>,
    pub event_rx: mpsc::UnboundedReceiver<TtsEvent>,
    pub workspace_dir: TempDir,
    pub cache_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self::with_transport(FakeTransport::new())
    }

    pub fn with_transport(transport: FakeTransport) -> Self {
        Self::build(transport, RetryPolicy::new(3, Duration::from_millis(10)), true)
    }

    pub fn build(transport: FakeTransport, retry: RetryPolicy, cache_enabled: bool) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let workspace_dir = TempDir::new().unwrap();
        let cache_dir = workspace_dir.path().join("cache");
        let scratch_dir = workspace_dir.path().join("scratch");
        std::fs::create_dir_all(&cache_dir).unwrap();

        let cache = if cache_enabled {
            CacheStore::new(cache_dir.clone())
        } else {
            CacheStore::disabled()
        };

        let transport = Arc::new(transport);
        let (events, event_rx) = EventSender::new();
        let client = TtsClient::new(transport.clone(), cache)
            .with_retry_policy(retry)
            .with_events(events);

        Self {
            transport,
            client: Arc::new(client),
            event_rx,
            workspace_dir,
            cache_dir,
            scratch_dir,
        }
    }

    pub fn scheduler(&self) -> BatchScheduler {
        BatchScheduler::new(self.client.clone()).with_temp_dir(self.scratch_dir.clone())
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.workspace_dir.path().join(name)
    }

    pub fn drain_events(&mut self) -> Vec<TtsEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn cache_entries(&self) -> usize {
        std::fs::read_dir(&self.cache_dir).unwrap().count()
    }
}
