pub mod audio;
pub mod batch;
pub mod cache;
pub mod error;
pub mod events;
pub mod input;
pub mod merge;
pub mod settings;
pub mod tts;
pub mod voice;

pub use batch::{BatchJob, BatchReport, BatchScheduler, JobState, LineOutcome};
pub use cache::{CacheKey, CacheStore};
pub use error::ConfigError;
pub use events::{EventSender, TtsEvent};
pub use settings::{Settings, SettingsManager};
pub use tts::{GeminiTransport, RetryPolicy, SpeechTransport, TtsClient, TtsError, TtsRequest};
pub use voice::{VoiceCatalog, VoiceCategory};
